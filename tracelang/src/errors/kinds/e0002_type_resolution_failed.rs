use crate::errors::Diagnostic;
use crate::source::InputSpan;
use crate::typing::TypeError;

pub fn type_resolution_failed(error: &TypeError, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0002", error.message.clone())
        .with_location(location)
        .with_subtitle("type of this expression cannot be determined")
}
