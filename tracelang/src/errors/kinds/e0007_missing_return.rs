use crate::errors::Diagnostic;
use crate::source::InputSpan;
use crate::typing::Type;

pub fn missing_return(function: &str, return_type: &Type, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0007", "Not all code paths returned a value")
        .with_location(location)
        .with_subtitle(format!(
            "function `{}` must return `{}` on every path",
            function, return_type
        ))
}
