use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn config_value_not_literal(name: &str, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0004", format!("Assignment for {} must be literal.", name))
        .with_location(location)
        .with_subtitle("only integer, string and stack mode literals are accepted here")
}
