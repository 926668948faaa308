use crate::errors::Diagnostic;
use crate::source::InputSpan;
use crate::typing::Type;

pub fn map_value_mismatch(
    map: &str,
    expected: &Type,
    actual: &Type,
    location: InputSpan,
    first_use: InputSpan,
) -> Diagnostic {
    Diagnostic::new(
        "E0012",
        format!(
            "Type mismatch for {}: trying to assign value of type '{}' when map already contains a value of type '{}'",
            map, actual, expected
        ),
    )
    .with_location(location)
    .with_bound_note(first_use, "value type established here")
}
