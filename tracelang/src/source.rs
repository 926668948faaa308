/// A region of the user program, in byte offsets.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Default)]
pub struct InputSpan {
    pub start: usize,
    pub end: usize,
}

impl InputSpan {
    pub fn new(start: usize, end: usize) -> InputSpan {
        InputSpan { start, end }
    }

    /// Returns a span for the first character of the file.
    /// Can be useful as a placeholder, when the caller is sure that the span is not going
    /// to be displayed to the end user.
    pub fn top_of_file() -> InputSpan {
        InputSpan { start: 0, end: 1 }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: InputSpan) -> InputSpan {
        InputSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}
