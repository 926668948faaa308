use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn aot_unsupported(what: impl std::fmt::Display, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0008", format!("AOT does not yet support {}", what))
        .with_location(location)
}
