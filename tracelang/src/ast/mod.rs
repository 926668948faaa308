//! Syntax tree of a tracing program.
//!
//! All nodes of a compilation unit live in a single [`Ast`] arena and refer to each other
//! through typed [`Id`] handles. Handles stay valid for the lifetime of the arena: nodes are
//! only ever appended, never removed. Replacing a subtree means storing a different handle in
//! the parent; the old node stays in the arena, unreachable.

mod attach_point;
mod builders;
mod display;
mod expressions;
mod ops;
mod program;
mod statements;
mod visitor;

pub use attach_point::{AttachPoint, ProbeType};
pub use display::ToSexp;
pub use expressions::*;
pub use ops::{JumpKind, Operator};
pub use program::{Predicate, Probe, Program, Subprog, SubprogArg};
pub use statements::*;
pub use visitor::{merge_all, VisitOutput, Visitor};

use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use tracing::trace;

/// Typed handle of a node stored in an [`Ast`].
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn new(index: usize) -> Id<T> {
        Id {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Implemented by every concrete node type, allowing it to be stored in the arena.
pub trait AstNode: Sized {
    fn wrap(self) -> Node;
    fn unwrap_ref(node: &Node) -> Option<&Self>;
    fn unwrap_mut(node: &mut Node) -> Option<&mut Self>;
}

macro_rules! nodes {
    ($($kind:ident),* $(,)?) => {
        /// Storage cell of the arena.
        #[derive(Debug)]
        pub enum Node {
            $($kind($kind)),*
        }

        $(
            impl AstNode for $kind {
                fn wrap(self) -> Node {
                    Node::$kind(self)
                }

                fn unwrap_ref(node: &Node) -> Option<&Self> {
                    match node {
                        Node::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn unwrap_mut(node: &mut Node) -> Option<&mut Self> {
                    match node {
                        Node::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

nodes! {
    Integer,
    PositionalParameter,
    StringLiteral,
    StackModeLiteral,
    Identifier,
    Builtin,
    Call,
    Sizeof,
    Offsetof,
    Map,
    Variable,
    Binop,
    Unop,
    FieldAccess,
    ArrayAccess,
    Cast,
    Tuple,
    Ternary,
    ExprStatement,
    VarDeclStatement,
    AssignMapStatement,
    AssignVarStatement,
    AssignConfigVarStatement,
    Block,
    If,
    Unroll,
    Jump,
    While,
    For,
    Config,
    Predicate,
    AttachPoint,
    Probe,
    SubprogArg,
    Subprog,
    Program,
}

/// Arena owning every node of a compilation unit.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,

    /// Bumped on every structural replacement or type binding change. Memoized expression
    /// types computed under an older generation are recomputed on next access.
    pub(crate) generation: u64,
}

impl Ast {
    pub fn new() -> Ast {
        Ast::default()
    }

    /// Stores `node` in the arena and returns its handle.
    pub fn make_node<T: AstNode>(&mut self, node: T) -> Id<T> {
        let id = Id::new(self.nodes.len());
        self.nodes.push(node.wrap());
        id
    }

    /// Number of nodes ever created, including unreachable ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Marks all memoized expression types as stale.
    pub fn invalidate_types(&mut self) {
        self.generation += 1;
        trace!(generation = self.generation, "invalidated expression types");
    }
}

impl<T: AstNode> Index<Id<T>> for Ast {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        T::unwrap_ref(&self.nodes[id.index()]).unwrap_or_else(|| {
            panic!(
                "node {:?} is not a {}",
                id,
                std::any::type_name::<T>()
            )
        })
    }
}

impl<T: AstNode> IndexMut<Id<T>> for Ast {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        T::unwrap_mut(&mut self.nodes[id.index()]).unwrap_or_else(|| {
            panic!(
                "node {:?} is not a {}",
                id,
                std::any::type_name::<T>()
            )
        })
    }
}

/// Any node that can be offered to [`Visitor::pre_visit`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Expression(Expression),
    Statement(Statement),
    Predicate(Id<Predicate>),
    AttachPoint(Id<AttachPoint>),
    Probe(Id<Probe>),
    SubprogArg(Id<SubprogArg>),
    Subprog(Id<Subprog>),
    Program(Id<Program>),
}
