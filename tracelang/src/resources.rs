//! Runtime resources needed by a compiled program.

use std::fmt::{self, Display, Formatter};

use indexmap::{IndexMap, IndexSet};

use crate::config::StackMode;
use crate::source::InputSpan;
use crate::typing::{StackKind, Type};

/// Shape of the key of a map: `None` for scalar maps, a tuple for multi-key maps.
pub type MapKey = Option<Type>;

pub fn key_shape(key: &MapKey) -> String {
    match key {
        None => "[]".to_string(),
        Some(Type::Tuple(elements)) => {
            let elements: Vec<_> = elements.iter().map(Type::to_string).collect();
            format!("[{}]", elements.join(", "))
        }
        Some(type_) => format!("[{}]", type_),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapInfo {
    pub id: usize,
    pub key: MapKey,

    /// `None` while the type of the stored values is unresolved.
    pub value: Option<Type>,

    /// Where the key shape and value type were first established.
    pub first_use: InputSpan,
}

/// Probe or function a variable belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Probe(usize),
    Function(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub scope: Scope,
    pub type_: Option<Type>,

    /// Values too large for the stack live in scratch space.
    pub needs_scratch: bool,
}

impl VariableInfo {
    pub fn size(&self) -> usize {
        self.type_.as_ref().map_or(0, Type::size)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AsyncAction {
    Printf,
    System,
    Cat,
    Join,
    Time,
    Strftime,
    Print,
}

impl AsyncAction {
    pub fn from_function(name: &str) -> Option<AsyncAction> {
        let action = match name {
            "printf" => AsyncAction::Printf,
            "system" => AsyncAction::System,
            "cat" => AsyncAction::Cat,
            "join" => AsyncAction::Join,
            "time" => AsyncAction::Time,
            "strftime" => AsyncAction::Strftime,
            "print" => AsyncAction::Print,
            _ => return None,
        };
        Some(action)
    }
}

/// Arguments of an action performed in user space on behalf of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AsyncSignature {
    pub action: AsyncAction,
    pub arg_types: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    pub index: usize,
    pub name: String,
    pub attach_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequiredResources {
    /// Maps by name, in order of first use.
    pub maps: IndexMap<String, MapInfo>,
    pub variables: Vec<VariableInfo>,
    pub async_signatures: IndexSet<AsyncSignature>,
    pub probes: Vec<ProbeInfo>,
    pub stack_types: IndexSet<(StackKind, StackMode)>,
    pub needs_elapsed_map: bool,
    pub needs_join_map: bool,
    pub uses_usym_table: bool,
}

impl RequiredResources {
    pub fn map(&self, name: &str) -> Option<&MapInfo> {
        self.maps.get(name)
    }

    pub fn variable(&self, name: &str, scope: &Scope) -> Option<&VariableInfo> {
        self.variables
            .iter()
            .find(|var| var.name == name && &var.scope == scope)
    }
}

impl Display for RequiredResources {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "probes: {}", self.probes.len())?;
        for probe in &self.probes {
            writeln!(f, "  #{} {}", probe.index, probe.name)?;
        }

        writeln!(f, "maps: {}", self.maps.len())?;
        for (name, map) in &self.maps {
            let value = match map.value {
                Some(ref type_) => type_.to_string(),
                None => "?".to_string(),
            };
            writeln!(f, "  {} {} -> {}", name, key_shape(&map.key), value)?;
        }

        writeln!(f, "variables: {}", self.variables.len())?;
        for var in &self.variables {
            let scratch = if var.needs_scratch { " (scratch)" } else { "" };
            writeln!(f, "  {} {} bytes{}", var.name, var.size(), scratch)?;
        }

        write!(f, "async actions: {}", self.async_signatures.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(key_shape(&None), "[]");
        assert_eq!(key_shape(&Some(Type::int64())), "[int64]");
        assert_eq!(
            key_shape(&Some(Type::Tuple(vec![Type::int64(), Type::string(4)]))),
            "[int64, string[4]]"
        );
    }

    #[test]
    fn async_signatures_are_unique_and_ordered() {
        let mut resources = RequiredResources::default();
        let printf = AsyncSignature {
            action: AsyncAction::Printf,
            arg_types: vec![Type::string(3)],
        };
        let time = AsyncSignature {
            action: AsyncAction::Time,
            arg_types: vec![],
        };
        resources.async_signatures.insert(printf.clone());
        resources.async_signatures.insert(time.clone());
        resources.async_signatures.insert(printf.clone());

        let signatures: Vec<_> = resources.async_signatures.iter().cloned().collect();
        assert_eq!(signatures, vec![printf, time]);
    }
}
