//! Memoized, cycle-detecting storage of expression types.

use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use thiserror::Error;

use super::Type;
use crate::ast::{Ast, Expression};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeErrorKind {
    /// The types involved do not fit the expression.
    Invalid,

    /// Evaluation of the type depends on itself.
    Cyclic,

    /// Nothing has bound a type to the expression yet.
    Unknown,

    /// A record layout is still missing from the type database.
    Unresolved,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub message: String,
}

impl TypeError {
    pub fn invalid(message: impl Into<String>) -> TypeError {
        TypeError {
            kind: TypeErrorKind::Invalid,
            message: message.into(),
        }
    }

    pub fn unresolved(message: impl Into<String>) -> TypeError {
        TypeError {
            kind: TypeErrorKind::Unresolved,
            message: message.into(),
        }
    }

    pub(crate) fn cyclic() -> TypeError {
        TypeError {
            kind: TypeErrorKind::Cyclic,
            message: "recursive type inference; cyclic type dependency cannot be resolved"
                .to_string(),
        }
    }

    pub(crate) fn unknown() -> TypeError {
        TypeError {
            kind: TypeErrorKind::Unknown,
            message: "unknown type".to_string(),
        }
    }
}

pub type TypeResult = Result<Type, TypeError>;

/// How the type of an identifier, builtin, call, map or variable is obtained.
#[derive(Clone)]
pub enum TypeBinding {
    Known(Type),

    /// Same type as another expression.
    SameAs(Expression),

    /// Arbitrary computation over the tree.
    Computed(Rc<dyn Fn(&Ast) -> TypeResult>),
}

impl TypeBinding {
    pub fn computed(f: impl Fn(&Ast) -> TypeResult + 'static) -> TypeBinding {
        TypeBinding::Computed(Rc::new(f))
    }

    pub(crate) fn evaluate(&self, ast: &Ast) -> TypeResult {
        match self {
            TypeBinding::Known(type_) => Ok(type_.clone()),
            TypeBinding::SameAs(expr) => (*ast.type_of(*expr)).clone(),
            TypeBinding::Computed(f) => f(ast),
        }
    }
}

impl Debug for TypeBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeBinding::Known(type_) => write!(f, "Known({})", type_),
            TypeBinding::SameAs(expr) => write!(f, "SameAs({:?})", expr),
            TypeBinding::Computed(_) => write!(f, "Computed"),
        }
    }
}

#[derive(Debug)]
enum ThunkState {
    Unevaluated,
    Evaluating,
    Resolved {
        generation: u64,
        result: Rc<TypeResult>,
    },
}

/// A suspended type computation.
#[derive(Debug)]
pub(crate) struct Thunk {
    state: RefCell<ThunkState>,
}

impl Thunk {
    fn new() -> Thunk {
        Thunk {
            state: RefCell::new(ThunkState::Unevaluated),
        }
    }

    /// Returns the memoized result if it belongs to `generation`, evaluating `compute`
    /// otherwise. Re-entering a thunk that is being evaluated yields a cyclic type error.
    pub(crate) fn force(
        &self,
        generation: u64,
        compute: impl FnOnce() -> TypeResult,
    ) -> Rc<TypeResult> {
        match &*self.state.borrow() {
            ThunkState::Evaluating => return Rc::new(Err(TypeError::cyclic())),
            ThunkState::Resolved {
                generation: resolved_at,
                result,
            } if *resolved_at == generation => return Rc::clone(result),
            _ => {}
        }

        self.state.replace(ThunkState::Evaluating);
        let result = Rc::new(compute());
        self.state.replace(ThunkState::Resolved {
            generation,
            result: Rc::clone(&result),
        });
        result
    }
}

/// Type storage of an expression node.
#[derive(Debug)]
pub(crate) enum TypeSlot {
    /// Known at construction.
    Fixed(Rc<TypeResult>),

    /// Set after construction by an analysis pass.
    Bound {
        binding: Option<TypeBinding>,
        thunk: Thunk,
    },

    /// Computed by the type rule of the expression kind.
    Derived(Thunk),
}

impl TypeSlot {
    pub(crate) fn fixed(type_: Type) -> TypeSlot {
        TypeSlot::Fixed(Rc::new(Ok(type_)))
    }

    pub(crate) fn unbound() -> TypeSlot {
        TypeSlot::Bound {
            binding: None,
            thunk: Thunk::new(),
        }
    }

    pub(crate) fn derived() -> TypeSlot {
        TypeSlot::Derived(Thunk::new())
    }
}
