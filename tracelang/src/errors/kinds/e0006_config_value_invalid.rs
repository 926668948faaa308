use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn config_bool_value_invalid(name: &str, value: u64, location: InputSpan) -> Diagnostic {
    Diagnostic::new(
        "E0006",
        format!(
            "Invalid value for {}. Needs to be 0 or 1. Value: {}",
            name, value
        ),
    )
    .with_location(location)
}

pub fn config_value_invalid(
    name: &str,
    reason: impl Into<String>,
    location: InputSpan,
) -> Diagnostic {
    Diagnostic::new("E0006", format!("Invalid value for {}", name))
        .with_location(location)
        .with_subtitle(reason)
}
