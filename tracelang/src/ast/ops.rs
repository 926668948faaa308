use std::fmt::{self, Display, Formatter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Le,
    Ge,
    Left,
    Right,
    Lt,
    Gt,
    LAnd,
    LOr,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    BAnd,
    BOr,
    BXor,
    LNot,
    BNot,
    Increment,
    Decrement,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Left => "<<",
            Operator::Right => ">>",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LAnd => "&&",
            Operator::LOr => "||",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::BAnd => "&",
            Operator::BOr => "|",
            Operator::BXor => "^",
            Operator::LNot => "!",
            Operator::BNot => "~",
            Operator::Increment => "++",
            Operator::Decrement => "--",
        }
    }

    /// Operators whose result is a truth value.
    pub fn is_comparison(self) -> bool {
        match self {
            Operator::Eq
            | Operator::Ne
            | Operator::Le
            | Operator::Ge
            | Operator::Lt
            | Operator::Gt => true,
            _ => false,
        }
    }

    pub fn is_logical(self) -> bool {
        match self {
            Operator::LAnd | Operator::LOr | Operator::LNot => true,
            _ => false,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JumpKind {
    Return,
    Continue,
    Break,
}

impl Display for JumpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            JumpKind::Return => "return",
            JumpKind::Continue => "continue",
            JumpKind::Break => "break",
        };
        write!(f, "{}", name)
    }
}
