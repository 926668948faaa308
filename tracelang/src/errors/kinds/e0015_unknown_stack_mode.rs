use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn unknown_stack_mode(mode: &str, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0015", format!("Unknown stack mode: '{}'", mode))
        .with_location(location)
        .with_free_note("valid stack modes are: bpftrace, perf, raw")
}
