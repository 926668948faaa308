use crate::errors::Diagnostic;
use crate::source::InputSpan;
use crate::typing::Type;

pub fn illegal_array_type(type_: &Type, location: InputSpan) -> Diagnostic {
    Diagnostic::new("E0014", "only integer array types are permitted")
        .with_location(location)
        .with_subtitle(format!("`{}` has a non-integer element type", type_))
}
