use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn division_by_zero(location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0010", "division by zero in constant expression")
        .with_location(location)
        .with_subtitle("right operand evaluates to 0")
}
