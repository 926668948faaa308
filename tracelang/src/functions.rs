//! Functions callable from tracing programs.
//!
//! Builtin functions are registered first. Functions defined in the script are added
//! afterwards and completely shadow builtins of the same name.

use indexmap::IndexMap;
use thiserror::Error;

use crate::typing::{Aggregate, StackKind, Type, DEFAULT_STRING_SIZE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    #[error("Function not found: '{0}'")]
    NotFound(String),

    #[error("Cannot call function '{name}' using argument types: {arguments}")]
    NoMatch {
        name: String,
        arguments: String,
        candidates: Vec<String>,
    },

    #[error("Function '{0}' is already defined")]
    Redefined(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Builtin,
    Script,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,

    /// `Type::None` makes the parameter of a builtin accept any argument.
    pub type_: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, type_: Type) -> Param {
        Param {
            name: name.into(),
            type_,
        }
    }

    fn generic(name: &str) -> Param {
        Param::new(name, Type::None)
    }
}

#[derive(Copy, Clone)]
pub enum ReturnType {
    Fixed(fn() -> Type),

    /// Depends on the argument types.
    FromArgs(fn(&[Type]) -> Type),
}

#[derive(Clone)]
pub struct Function {
    pub origin: Origin,
    pub name: String,
    pub params: Vec<Param>,
    pub varargs: bool,
    return_type: FunctionReturn,
}

#[derive(Clone)]
enum FunctionReturn {
    Builtin(ReturnType),
    Script(Type),
}

impl Function {
    pub fn builtin(name: &str, params: Vec<Param>, return_type: ReturnType) -> Function {
        Function {
            origin: Origin::Builtin,
            name: name.to_string(),
            params,
            varargs: false,
            return_type: FunctionReturn::Builtin(return_type),
        }
    }

    pub fn script(name: impl Into<String>, params: Vec<Param>, return_type: Type) -> Function {
        Function {
            origin: Origin::Script,
            name: name.into(),
            params,
            varargs: false,
            return_type: FunctionReturn::Script(return_type),
        }
    }

    /// Accepts any number of arguments after the declared parameters.
    fn varargs(self) -> Function {
        Function {
            varargs: true,
            ..self
        }
    }

    pub fn return_type(&self, arg_types: &[Type]) -> Type {
        match &self.return_type {
            FunctionReturn::Builtin(ReturnType::Fixed(f)) => f(),
            FunctionReturn::Builtin(ReturnType::FromArgs(f)) => f(arg_types),
            FunctionReturn::Script(type_) => type_.clone(),
        }
    }

    /// Signature as shown in diagnostics, generic parameters spelled `T`.
    pub fn signature(&self) -> String {
        let params: Vec<_> = self
            .params
            .iter()
            .map(|param| match param.type_ {
                Type::None => "T".to_string(),
                ref type_ => type_.to_string(),
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    fn accepts(&self, arg_types: &[Type]) -> bool {
        let checked = if arg_types.len() == self.params.len() {
            arg_types.len()
        } else if self.varargs && arg_types.len() >= self.params.len() {
            self.params.len()
        } else {
            return false;
        };

        self.params
            .iter()
            .zip(arg_types)
            .take(checked)
            .all(|(param, arg)| {
                (self.origin == Origin::Builtin && param.type_ == Type::None)
                    || can_implicit_cast(arg, &param.type_)
            })
    }
}

fn can_implicit_cast(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::Integer { bits: from, .. }, Type::Integer { bits: to, .. }) => from <= to,
        (Type::Bool, Type::Integer { .. }) => true,
        // String sizes do not matter for calls.
        (Type::String { .. }, Type::String { .. }) => true,
        (Type::String { .. }, Type::Pointer(pointee)) => match **pointee {
            Type::Integer { bits: 8, .. } => true,
            _ => false,
        },
        _ => from == to,
    }
}

fn arg_types_str(arg_types: &[Type]) -> String {
    let types: Vec<_> = arg_types.iter().map(Type::to_string).collect();
    format!("({})", types.join(", "))
}

fn is_signed(arg_types: &[Type]) -> bool {
    arg_types.first().map_or(true, Type::is_signed)
}

pub struct FunctionRegistry {
    functions: IndexMap<String, Vec<Function>>,
}

impl FunctionRegistry {
    pub fn new() -> FunctionRegistry {
        FunctionRegistry {
            functions: IndexMap::new(),
        }
    }

    /// Registry populated with all builtin functions.
    pub fn with_builtins() -> FunctionRegistry {
        use ReturnType::{Fixed, FromArgs};

        let void = Fixed(|| Type::Void);
        let uint64 = Fixed(Type::uint64);
        let string = || Type::string(DEFAULT_STRING_SIZE);
        let t = Param::generic;

        let builtins = vec![
            Function::builtin("count", vec![], Fixed(|| Type::Aggregate(Aggregate::Count))),
            Function::builtin(
                "sum",
                vec![t("n")],
                FromArgs(|args| Type::Aggregate(Aggregate::Sum { signed: is_signed(args) })),
            ),
            Function::builtin(
                "min",
                vec![t("n")],
                FromArgs(|args| Type::Aggregate(Aggregate::Min { signed: is_signed(args) })),
            ),
            Function::builtin(
                "max",
                vec![t("n")],
                FromArgs(|args| Type::Aggregate(Aggregate::Max { signed: is_signed(args) })),
            ),
            Function::builtin(
                "avg",
                vec![t("n")],
                FromArgs(|args| Type::Aggregate(Aggregate::Avg { signed: is_signed(args) })),
            ),
            Function::builtin(
                "stats",
                vec![t("n")],
                FromArgs(|args| Type::Aggregate(Aggregate::Stats { signed: is_signed(args) })),
            ),
            Function::builtin("hist", vec![t("n")], Fixed(|| Type::Aggregate(Aggregate::Hist)))
                .varargs(),
            Function::builtin(
                "lhist",
                vec![
                    t("n"),
                    Param::new("min", Type::int64()),
                    Param::new("max", Type::int64()),
                    Param::new("step", Type::int64()),
                ],
                Fixed(|| Type::Aggregate(Aggregate::Lhist)),
            ),
            Function::builtin(
                "str",
                vec![t("data")],
                FromArgs(|args| match args.first() {
                    Some(type_ @ Type::String { .. }) => type_.clone(),
                    _ => Type::string(DEFAULT_STRING_SIZE),
                }),
            )
            .varargs(),
            Function::builtin(
                "buf",
                vec![t("data")],
                Fixed(|| Type::Buffer {
                    size: DEFAULT_STRING_SIZE,
                }),
            )
            .varargs(),
            Function::builtin("printf", vec![t("fmt")], void).varargs(),
            Function::builtin("print", vec![t("value")], void).varargs(),
            Function::builtin("system", vec![t("fmt")], void).varargs(),
            Function::builtin("cat", vec![t("fmt")], void).varargs(),
            Function::builtin("join", vec![t("array")], void).varargs(),
            Function::builtin("time", vec![], void).varargs(),
            Function::builtin(
                "strftime",
                vec![t("fmt"), Param::new("nsecs", Type::uint64())],
                Fixed(|| Type::Timestamp),
            ),
            Function::builtin("delete", vec![t("map")], void).varargs(),
            Function::builtin("clear", vec![t("map")], void),
            Function::builtin("zero", vec![t("map")], void),
            Function::builtin("exit", vec![], void).varargs(),
            Function::builtin("signal", vec![t("signal")], void),
            Function::builtin("kaddr", vec![Param::new("symbol", string())], uint64),
            Function::builtin("uaddr", vec![Param::new("symbol", string())], uint64),
            Function::builtin("cgroupid", vec![Param::new("path", string())], uint64),
            Function::builtin("reg", vec![Param::new("name", string())], uint64),
            Function::builtin("ksym", vec![t("addr")], Fixed(|| Type::Ksym)),
            Function::builtin("usym", vec![t("addr")], Fixed(|| Type::Usym)),
            Function::builtin("kstack", vec![], Fixed(|| Type::Stack(StackKind::Kernel)))
                .varargs(),
            Function::builtin("ustack", vec![], Fixed(|| Type::Stack(StackKind::User)))
                .varargs(),
            Function::builtin("ntop", vec![t("addr")], Fixed(|| Type::Inet { size: 24 }))
                .varargs(),
            Function::builtin("macaddr", vec![t("addr")], Fixed(|| Type::MacAddress)),
            Function::builtin("strerror", vec![t("errno")], Fixed(|| Type::Strerror)),
            Function::builtin("cgroup_path", vec![t("id")], Fixed(|| Type::CgroupPath))
                .varargs(),
            Function::builtin("path", vec![t("path")], Fixed(string)).varargs(),
            Function::builtin(
                "strncmp",
                vec![t("left"), t("right"), Param::new("n", Type::uint64())],
                uint64,
            ),
            Function::builtin("len", vec![t("map")], Fixed(Type::int64)),
        ];

        let mut registry = FunctionRegistry::new();
        for builtin in builtins {
            registry.insert(builtin);
        }
        registry
    }

    fn insert(&mut self, function: Function) {
        self.functions
            .entry(function.name.clone())
            .or_insert_with(Vec::new)
            .push(function);
    }

    /// Adds a function. Only builtins may share a name.
    pub fn add(&mut self, function: Function) -> Result<(), FunctionError> {
        let redefined = self
            .functions
            .get(&function.name)
            .map_or(false, |existing| {
                existing.iter().any(|f| f.origin != Origin::Builtin)
            });
        if redefined {
            return Err(FunctionError::Redefined(function.name));
        }
        self.insert(function);
        Ok(())
    }

    /// Finds the function `name` accepting `arg_types`, script functions first.
    pub fn get(&self, name: &str, arg_types: &[Type]) -> Result<&Function, FunctionError> {
        let candidates = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))?;

        let mut considered = Vec::new();
        for candidate in candidates.iter().rev() {
            considered.push(candidate.signature());
            if candidate.accepts(arg_types) {
                return Ok(candidate);
            }
            if candidate.origin != Origin::Builtin {
                break;
            }
        }

        Err(FunctionError::NoMatch {
            name: name.to_string(),
            arguments: arg_types_str(arg_types),
            candidates: considered,
        })
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        FunctionRegistry::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_typed_from_arguments() {
        let registry = FunctionRegistry::with_builtins();
        let sum = registry.get("sum", &[Type::uint(32)]).unwrap();
        assert_eq!(
            sum.return_type(&[Type::uint(32)]),
            Type::Aggregate(Aggregate::Sum { signed: false })
        );

        let printf = registry
            .get("printf", &[Type::string(4), Type::int64(), Type::int64()])
            .unwrap();
        assert_eq!(printf.return_type(&[]), Type::Void);
    }

    #[test]
    fn unknown_functions_are_reported() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(
            registry.get("frobnicate", &[]).err().map(|e| e.to_string()),
            Some("Function not found: 'frobnicate'".to_string())
        );
    }

    #[test]
    fn argument_mismatch_lists_candidates() {
        let registry = FunctionRegistry::with_builtins();
        let error = registry.get("kaddr", &[Type::int64()]).err().unwrap();
        assert_eq!(
            error.to_string(),
            "Cannot call function 'kaddr' using argument types: (int64)"
        );
        match error {
            FunctionError::NoMatch { candidates, .. } => {
                assert_eq!(candidates, vec!["kaddr(string[64])".to_string()])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn script_functions_shadow_builtins() {
        let mut registry = FunctionRegistry::with_builtins();
        registry
            .add(Function::script(
                "signal",
                vec![Param::new("a", Type::int64())],
                Type::int64(),
            ))
            .unwrap();

        let signal = registry.get("signal", &[Type::int(32)]).unwrap();
        assert_eq!(signal.origin, Origin::Script);

        // Shadowing is complete: the generic builtin is not considered.
        assert!(registry.get("signal", &[Type::string(3)]).is_err());

        let redefinition = Function::script("signal", vec![], Type::Void);
        assert_eq!(
            registry.add(redefinition).err(),
            Some(FunctionError::Redefined("signal".to_string()))
        );
    }

    #[test]
    fn integers_only_widen() {
        assert!(can_implicit_cast(&Type::int(32), &Type::int64()));
        assert!(!can_implicit_cast(&Type::int64(), &Type::int(32)));
        assert!(can_implicit_cast(
            &Type::string(3),
            &Type::pointer_to(Type::int(8))
        ));
    }
}
