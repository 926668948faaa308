use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn unknown_config_key(name: &str, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0003", format!("Unrecognized config variable: {}", name))
        .with_location(location)
}
