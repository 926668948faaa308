use crate::errors::Diagnostic;

pub fn node_count_exceeded(count: usize, limit: usize) -> Diagnostic {
    Diagnostic::new(
        "E0009",
        format!("node count ({}) exceeds the limit ({})", count, limit),
    )
    .with_free_note("the limit can be raised with `--max-ast-nodes`")
}
