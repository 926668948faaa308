use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn probe_arguments_unresolved(
    attach_point: &str,
    reason: impl std::fmt::Display,
    location: InputSpan,
) -> Diagnostic {
    Diagnostic::new(
        "W0002",
        format!("could not resolve arguments of `{}`: {}", attach_point, reason),
    )
    .with_location(location)
}
