use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn invalid_attach_point(
    raw: &str,
    reason: impl Into<String>,
    location: InputSpan,
) -> Diagnostic {
    Diagnostic::new("E0016", format!("invalid attach point `{}`", raw))
        .with_location(location)
        .with_subtitle(reason)
}
