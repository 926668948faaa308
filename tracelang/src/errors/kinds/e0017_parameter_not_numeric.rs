use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn parameter_not_numeric(index: usize, value: &str, location: InputSpan) -> Diagnostic {
    Diagnostic::new(
        "E0017",
        format!("${} used numerically but given \"{}\"", index, value),
    )
    .with_location(location)
    .with_free_note("try wrapping the parameter in str()")
}
