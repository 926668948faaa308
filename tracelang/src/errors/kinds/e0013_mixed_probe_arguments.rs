use crate::errors::Diagnostic;
use crate::source::InputSpan;

pub fn mixed_probe_arguments(probe: &str, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0013", "Probe has attach points with mixed arguments")
        .with_location(location)
        .with_subtitle(format!("`args` of `{}` cannot have a single type", probe))
}
