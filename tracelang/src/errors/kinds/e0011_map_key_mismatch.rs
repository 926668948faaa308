use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn map_key_mismatch(
    map: &str,
    expected: &str,
    actual: &str,
    location: InputSpan,
    first_use: InputSpan,
) -> Diagnostic {
    Diagnostic::new(
        "E0011",
        format!(
            "Argument mismatch for {}: trying to access with arguments: {} when map expects arguments: {}",
            map, actual, expected
        ),
    )
    .with_location(location)
    .with_bound_note(first_use, "key shape established here")
}
