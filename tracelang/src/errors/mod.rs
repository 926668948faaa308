//! Compilation diagnostics.

use codespan_reporting::diagnostic::{Diagnostic as CodespanDiagnostic, Label, Severity};

use crate::source::InputSpan;

mod kinds;
mod outcome;

pub use kinds::constructors::*;
pub use outcome::Outcome;

pub type Diagnostics = Vec<Diagnostic>;

/// A problem found in a script. Errors stop compilation, warnings are reported alongside
/// the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// `E` or `W` followed by four digits.
    pub code: &'static str,

    /// One-line summary.
    pub message: String,

    /// Primary location, if the problem can be pinned to source.
    pub location: Option<InputSpan>,

    /// Label shown under the primary location.
    pub subtitle: Option<String>,

    /// Secondary locations with their labels.
    pub bound_notes: Vec<(InputSpan, String)>,

    /// Trailing notes, such as the accepted values of an option.
    pub free_notes: Vec<String>,
}

impl Diagnostic {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            code,
            message: message.into(),
            location: None,
            subtitle: None,
            bound_notes: Vec::new(),
            free_notes: Vec::new(),
        }
    }

    pub(crate) fn with_location(self, location: InputSpan) -> Diagnostic {
        Diagnostic {
            location: Some(location),
            ..self
        }
    }

    pub(crate) fn with_subtitle(self, subtitle: impl Into<String>) -> Diagnostic {
        Diagnostic {
            subtitle: Some(subtitle.into()),
            ..self
        }
    }

    pub(crate) fn with_bound_note(
        mut self,
        location: InputSpan,
        note: impl Into<String>,
    ) -> Diagnostic {
        self.bound_notes.push((location, note.into()));
        self
    }

    pub(crate) fn with_free_note(mut self, note: impl Into<String>) -> Diagnostic {
        self.free_notes.push(note.into());
        self
    }

    /// Warnings are told apart from errors by their code prefix.
    pub fn is_warning(&self) -> bool {
        self.code.starts_with('W')
    }

    /// Builds a `codespan_reporting` diagnostic.
    pub fn to_codespan<I: Copy>(&self, file_id: I) -> CodespanDiagnostic<I> {
        let mut labels = Vec::new();

        if let Some(ref location) = self.location {
            let label = Label::primary(file_id, location.start..location.end);
            labels.push(match self.subtitle {
                Some(ref subtitle) => label.with_message(subtitle),
                None => label,
            });
        }

        for (location, note) in &self.bound_notes {
            labels
                .push(Label::secondary(file_id, location.start..location.end).with_message(note));
        }

        let severity = if self.is_warning() {
            Severity::Warning
        } else {
            Severity::Error
        };

        CodespanDiagnostic::new(severity)
            .with_code(self.code)
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.free_notes.clone())
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{}: {} at {}..{}",
                self.code, self.message, location.start, location.end
            ),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}
