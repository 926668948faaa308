use crate::errors::Diagnostic;
use crate::source::InputSpan;
use crate::typing::TypeError;

pub fn map_type_unresolved(name: &str, error: &TypeError, location: InputSpan) -> Diagnostic {
    Diagnostic::new(
        "W0003",
        format!("type of `{}` is not resolved yet: {}", name, error.message),
    )
    .with_location(location)
}
