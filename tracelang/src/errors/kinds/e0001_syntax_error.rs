use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn syntax_error(message: impl Into<String>, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0001", message).with_location(location)
}
