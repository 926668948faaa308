use crate::errors::Diagnostic;
use crate::source::InputSpan;
use crate::typing::TypeError;

pub fn type_deferred(error: &TypeError, location: InputSpan) -> Diagnostic {
    Diagnostic::new("W0004", error.message.clone())
        .with_location(location)
        .with_subtitle("resolution is deferred to the type database")
}
