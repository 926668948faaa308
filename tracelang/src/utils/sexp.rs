//! S-expressions used to dump syntax trees in a compact, diffable form.

/// An atom or a parenthesized list of s-expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    /// Printed as is.
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn int(value: i64) -> Sexp {
        Sexp::Atom(value.to_string())
    }

    pub fn str(value: impl Into<String>) -> Sexp {
        Sexp::Atom(value.into())
    }

    /// A string literal, printed with quotes and escapes.
    pub fn quoted(value: &str) -> Sexp {
        Sexp::Atom(format!("{:?}", value))
    }

    /// Length of the single-line rendering.
    fn flat_len(&self) -> usize {
        match self {
            Sexp::Atom(text) => text.len(),
            Sexp::List(items) => {
                items.iter().map(Sexp::flat_len).sum::<usize>() + items.len().max(1) + 1
            }
        }
    }

    /// Renders the expression on one line if it fits in `width` columns. Otherwise every
    /// element of a list goes on its own line, indented by one column.
    pub fn pretty_print(&self, width: usize) -> String {
        let mut out = String::new();
        self.write(width, 0, &mut out);
        out
    }

    fn write(&self, width: usize, depth: usize, out: &mut String) {
        let items = match self {
            Sexp::Atom(text) => return out.push_str(text),
            Sexp::List(items) => items,
        };
        let flat = depth + self.flat_len() <= width;
        out.push('(');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                if flat {
                    out.push(' ');
                } else {
                    out.push('\n');
                    out.extend(std::iter::repeat(' ').take(depth + 1));
                }
            }
            item.write(width, depth + 1, out);
        }
        out.push(')');
    }
}

/// Builds a [`Sexp::List`] from its elements.
#[macro_export]
macro_rules! sexp_list {
    ( $( $elem:expr ),* $(,)? ) => {
        $crate::utils::sexp::Sexp::List(vec![ $( $elem ),* ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lists_stay_on_one_line() {
        let sexp = sexp_list!(Sexp::str("probe"), sexp_list!(Sexp::int(-3)), sexp_list!());
        assert_eq!(sexp.pretty_print(80), "(probe (-3) ())");
    }

    #[test]
    fn long_lists_are_wrapped_and_indented() {
        let sexp = sexp_list!(
            Sexp::str("block"),
            sexp_list!(Sexp::str("="), Sexp::str("@x"), Sexp::int(1)),
        );
        assert_eq!(sexp.pretty_print(12), "(block\n (= @x 1))");
        assert_eq!(sexp.pretty_print(8), "(block\n (=\n  @x\n  1))");
    }

    #[test]
    fn quoted_strings_are_escaped() {
        assert_eq!(Sexp::quoted("a\"b").pretty_print(80), "\"a\\\"b\"");
    }
}
