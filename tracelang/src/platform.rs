//! Access to type information of the traced system.
//!
//! Layouts of kernel and user-space structures, and signatures of traced functions, come
//! from debug information that is not available to the compiler itself. Passes consult a
//! [`TypeDatabase`]; anything it cannot answer is left unresolved and reported as a warning.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::typing::{Field, Record, Type};

/// Name of the field holding the return value in the argument record of return probes.
pub const RETVAL_FIELD_NAME: &str = "$retval";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeDatabaseError {
    #[error("no type information for function `{0}`")]
    UnknownFunction(String),

    #[error("`{0}` does not have typed arguments")]
    Untyped(String),
}

pub trait TypeDatabase {
    /// Looks up a named type, such as `struct task_struct`.
    fn resolve_type(&self, name: &str) -> Option<Type>;

    /// Fills in the layout of `record`. Returns `false` if the layout is unknown.
    fn resolve_fields(&self, record: &Record) -> bool;

    /// Record describing the arguments of `function`. For return probes, the record
    /// also contains the return value as [`RETVAL_FIELD_NAME`].
    fn resolve_args(&self, function: &str, is_return: bool)
        -> Result<Rc<Record>, TypeDatabaseError>;
}

/// Type database backed by tables filled in up front.
#[derive(Debug, Default)]
pub struct StaticTypeDatabase {
    records: HashMap<String, Vec<Field>>,
    functions: HashMap<String, (Vec<Field>, Type)>,
}

/// Lays out fields one after another, without padding.
fn layout(fields: Vec<(&str, Type)>) -> Vec<Field> {
    let mut offset = 0;
    fields
        .into_iter()
        .map(|(name, type_)| {
            let field = Field {
                name: name.to_string(),
                offset,
                type_,
            };
            offset += field.type_.size();
            field
        })
        .collect()
}

impl StaticTypeDatabase {
    pub fn new() -> StaticTypeDatabase {
        StaticTypeDatabase::default()
    }

    pub fn with_record(mut self, name: &str, fields: Vec<(&str, Type)>) -> StaticTypeDatabase {
        self.records.insert(name.to_string(), layout(fields));
        self
    }

    pub fn with_function(
        mut self,
        name: &str,
        args: Vec<(&str, Type)>,
        return_type: Type,
    ) -> StaticTypeDatabase {
        self.functions
            .insert(name.to_string(), (layout(args), return_type));
        self
    }
}

impl TypeDatabase for StaticTypeDatabase {
    fn resolve_type(&self, name: &str) -> Option<Type> {
        let fields = self.records.get(name)?;
        Some(Type::Record(Rc::new(Record::with_fields(
            name,
            fields.clone(),
        ))))
    }

    fn resolve_fields(&self, record: &Record) -> bool {
        if record.is_resolved() {
            return true;
        }
        match self.records.get(record.name()) {
            Some(fields) => {
                record.resolve(fields.clone());
                true
            }
            None => false,
        }
    }

    fn resolve_args(
        &self,
        function: &str,
        is_return: bool,
    ) -> Result<Rc<Record>, TypeDatabaseError> {
        let (args, return_type) = self
            .functions
            .get(function)
            .ok_or_else(|| TypeDatabaseError::UnknownFunction(function.to_string()))?;

        let mut fields = args.clone();
        if is_return {
            let offset = fields
                .last()
                .map(|field| field.offset + field.type_.size())
                .unwrap_or(0);
            fields.push(Field {
                name: RETVAL_FIELD_NAME.to_string(),
                type_: return_type.clone(),
                offset,
            });
        }
        Ok(Rc::new(Record::with_fields(
            format!("struct {}_args", function),
            fields,
        )))
    }
}
