use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn config_value_type_mismatch(
    name: &str,
    actual: &str,
    expected: &str,
    location: InputSpan,
) -> Diagnostic {
    Diagnostic::new(
        "E0005",
        format!(
            "Invalid type for {}. Type: {}. Expected Type: {}",
            name, actual, expected
        ),
    )
    .with_location(location)
}
