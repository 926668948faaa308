use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn function_redefined(name: &str, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0018", format!("Function '{}' is already defined", name))
        .with_location(location)
}
