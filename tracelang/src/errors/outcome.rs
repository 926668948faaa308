use super::{Diagnostic, Diagnostics};

/// Either a value or a non-empty list of errors, always paired with the warnings
/// that were collected while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    result: Result<T, Diagnostics>,
    warnings: Diagnostics,
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Outcome<T> {
        Outcome {
            result: Ok(value),
            warnings: Vec::new(),
        }
    }

    /// Builds a failed outcome. Panics if `errors` is empty, since a failure
    /// without any diagnostics cannot be reported to the user.
    pub fn failure(errors: Diagnostics) -> Outcome<T> {
        if errors.is_empty() {
            panic!("failed outcome must carry at least one error");
        }
        Outcome {
            result: Err(errors),
            warnings: Vec::new(),
        }
    }

    /// Succeeds with `value` if `errors` is empty, fails otherwise. Warnings are kept
    /// either way.
    pub fn from_parts(value: T, errors: Diagnostics, warnings: Diagnostics) -> Outcome<T> {
        let result = if errors.is_empty() {
            Ok(value)
        } else {
            Err(errors)
        };
        Outcome { result, warnings }
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = Diagnostic>) -> Outcome<T> {
        self.warnings.extend(warnings);
        self
    }

    pub fn push_warning(&mut self, warning: Diagnostic) {
        self.warnings.push(warning);
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Errors of a failed outcome, or an empty slice.
    pub fn errors(&self) -> &[Diagnostic] {
        match self.result {
            Ok(_) => &[],
            Err(ref errors) => errors,
        }
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn into_parts(self) -> (Result<T, Diagnostics>, Diagnostics) {
        (self.result, self.warnings)
    }

    /// Extracts the value, moving warnings into `sink`.
    ///
    /// Unwrapping a failed outcome is a compiler defect and aborts.
    pub fn unwrap(self, sink: &mut Diagnostics) -> T {
        sink.extend(self.warnings);
        match self.result {
            Ok(value) => value,
            Err(errors) => panic!(
                "attempted to use the value of a failed result: {}",
                errors
                    .iter()
                    .map(|error| error.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            result: self.result.map(f),
            warnings: self.warnings,
        }
    }

    /// Chains a computation on the value. Warnings from both steps are kept in order.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self.result {
            Ok(value) => {
                let next = f(value);
                let mut warnings = self.warnings;
                warnings.extend(next.warnings);
                Outcome {
                    result: next.result,
                    warnings,
                }
            }
            Err(errors) => Outcome {
                result: Err(errors),
                warnings: self.warnings,
            },
        }
    }

    /// Combines two sibling results. Values are combined with `combine` when both
    /// succeed; a single failure propagates; two failures concatenate their errors.
    /// Warnings from both sides are always kept, `self`'s first.
    pub fn merge_with(self, other: Outcome<T>, combine: impl FnOnce(T, T) -> T) -> Outcome<T> {
        let mut warnings = self.warnings;
        warnings.extend(other.warnings);

        let result = match (self.result, other.result) {
            (Ok(left), Ok(right)) => Ok(combine(left, right)),
            (Ok(_), Err(errors)) | (Err(errors), Ok(_)) => Err(errors),
            (Err(mut left), Err(right)) => {
                left.extend(right);
                Err(left)
            }
        };

        Outcome { result, warnings }
    }

    /// `merge_with` where the first value wins.
    pub fn merge(self, other: Outcome<T>) -> Outcome<T> {
        self.merge_with(other, |left, _| left)
    }
}

impl<T: Default> Default for Outcome<T> {
    fn default() -> Self {
        Outcome::success(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InputSpan;

    fn error(message: &str) -> Diagnostic {
        Diagnostic::new("E9999", message).with_location(InputSpan::new(0, 1))
    }

    fn warning(message: &str) -> Diagnostic {
        Diagnostic::new("W9999", message)
    }

    #[test]
    fn success_merges_with_first_value() {
        let merged = Outcome::success(1).merge(Outcome::success(2));
        assert_eq!(merged.value(), Some(&1));
    }

    #[test]
    fn combining_merge_uses_both_values() {
        let merged = Outcome::success(1).merge_with(Outcome::success(2), |a, b| a + b);
        assert_eq!(merged.value(), Some(&3));
    }

    #[test]
    fn single_failure_propagates_with_all_warnings() {
        let left = Outcome::success(1).with_warnings(vec![warning("a")]);
        let right: Outcome<i32> = Outcome::failure(vec![error("broken")]).with_warnings(vec![warning("b")]);

        let merged = left.merge(right);
        assert!(!merged.is_ok());
        assert_eq!(merged.errors().len(), 1);
        let messages: Vec<_> = merged.warnings().iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn double_failure_concatenates_errors() {
        let left: Outcome<()> = Outcome::failure(vec![error("first")]);
        let right: Outcome<()> = Outcome::failure(vec![error("second"), error("third")]);

        let merged = left.merge(right);
        let messages: Vec<_> = merged.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn merge_is_associative() {
        let make = || {
            vec![
                Outcome::<()>::failure(vec![error("1")]).with_warnings(vec![warning("w1")]),
                Outcome::success(()).with_warnings(vec![warning("w2")]),
                Outcome::<()>::failure(vec![error("3")]),
            ]
        };

        let mut outcomes = make().into_iter();
        let (a, b, c) = (
            outcomes.next().unwrap(),
            outcomes.next().unwrap(),
            outcomes.next().unwrap(),
        );
        let left_first = a.merge(b).merge(c);

        let mut outcomes = make().into_iter();
        let (a, b, c) = (
            outcomes.next().unwrap(),
            outcomes.next().unwrap(),
            outcomes.next().unwrap(),
        );
        let right_first = a.merge(b.merge(c));

        assert_eq!(left_first, right_first);
    }

    #[test]
    fn from_parts_fails_only_with_errors() {
        assert!(Outcome::from_parts((), vec![], vec![warning("w")]).is_ok());
        assert!(!Outcome::from_parts((), vec![error("e")], vec![]).is_ok());
    }

    #[test]
    #[should_panic(expected = "failed result")]
    fn unwrapping_failure_aborts() {
        let outcome: Outcome<()> = Outcome::failure(vec![error("e")]);
        outcome.unwrap(&mut Vec::new());
    }
}
