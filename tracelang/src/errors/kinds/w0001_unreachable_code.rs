use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn unreachable_code(location: InputSpan, return_location: InputSpan) -> Diagnostic {
    Diagnostic::new("W0001", "unreachable code after return")
        .with_location(location)
        .with_bound_note(return_location, "every path returns here")
}
