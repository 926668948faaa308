//! Types of tracing program values.

use std::cell::RefCell;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Default size of strings whose length is not known statically.
pub const DEFAULT_STRING_SIZE: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    None,
    Void,
    Bool,
    Integer { bits: u8, signed: bool },
    String { size: usize },
    Buffer { size: usize },
    Inet { size: usize },
    Pointer(Box<Type>),
    Array { element: Box<Type>, len: usize },
    Record(Rc<Record>),
    Tuple(Vec<Type>),
    Aggregate(Aggregate),
    StackMode,
    Stack(StackKind),
    Timestamp,
    MacAddress,
    CgroupPath,
    Strerror,
    Ksym,
    Usym,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackKind {
    Kernel,
    User,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Count,
    Sum { signed: bool },
    Min { signed: bool },
    Max { signed: bool },
    Avg { signed: bool },
    Stats { signed: bool },
    Hist,
    Lhist,
}

impl Type {
    pub fn int(bits: u8) -> Type {
        Type::Integer { bits, signed: true }
    }

    pub fn uint(bits: u8) -> Type {
        Type::Integer {
            bits,
            signed: false,
        }
    }

    pub fn int64() -> Type {
        Type::int(64)
    }

    pub fn uint64() -> Type {
        Type::uint(64)
    }

    pub fn string(size: usize) -> Type {
        Type::String { size }
    }

    pub fn pointer_to(pointee: Type) -> Type {
        Type::Pointer(Box::new(pointee))
    }

    pub fn array_of(element: Type, len: usize) -> Type {
        Type::Array {
            element: Box::new(element),
            len,
        }
    }

    pub fn record(name: impl Into<String>) -> Type {
        Type::Record(Rc::new(Record::unresolved(name)))
    }

    pub fn is_integer(&self) -> bool {
        match self {
            Type::Integer { .. } | Type::Bool => true,
            _ => false,
        }
    }

    pub fn is_signed(&self) -> bool {
        match self {
            Type::Integer { signed, .. } => *signed,
            _ => false,
        }
    }

    pub fn is_string(&self) -> bool {
        match self {
            Type::String { .. } => true,
            _ => false,
        }
    }

    pub fn is_pointer(&self) -> bool {
        match self {
            Type::Pointer(_) => true,
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        match self {
            Type::Array { .. } => true,
            _ => false,
        }
    }

    pub fn is_record(&self) -> bool {
        match self {
            Type::Record(_) => true,
            _ => false,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        match self {
            Type::Aggregate(_) => true,
            _ => false,
        }
    }

    /// Aggregates producing more than one value, which cannot be embedded in tuples.
    pub fn is_multi_output(&self) -> bool {
        match self {
            Type::Aggregate(Aggregate::Stats { .. })
            | Type::Aggregate(Aggregate::Hist)
            | Type::Aggregate(Aggregate::Lhist) => true,
            _ => false,
        }
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The record behind this type or behind a pointer to it.
    pub fn as_record(&self) -> Option<&Rc<Record>> {
        match self {
            Type::Record(record) => Some(record),
            Type::Pointer(pointee) => pointee.as_record(),
            _ => None,
        }
    }

    /// Size of a value of this type in bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::None | Type::Void => 0,
            Type::Bool => 1,
            Type::Integer { bits, .. } => (*bits as usize + 7) / 8,
            Type::String { size } | Type::Buffer { size } | Type::Inet { size } => *size,
            Type::Pointer(_) => 8,
            Type::Array { element, len } => element.size() * len,
            Type::Record(record) => record.size(),
            Type::Tuple(elements) => elements.iter().map(Type::size).sum(),
            Type::Aggregate(Aggregate::Avg { .. }) | Type::Aggregate(Aggregate::Stats { .. }) => {
                16
            }
            Type::Aggregate(_) => 8,
            Type::StackMode => 0,
            Type::Stack(_) => 8,
            Type::Timestamp | Type::Ksym | Type::Usym => 16,
            Type::MacAddress => 6,
            Type::CgroupPath => 16,
            Type::Strerror => 8,
        }
    }

    /// Types that are equal up to the sizes of strings.
    pub fn is_same_kind(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::String { .. }, Type::String { .. }) => true,
            (Type::Tuple(left), Type::Tuple(right)) => {
                left.len() == right.len()
                    && left.iter().zip(right).all(|(l, r)| l.is_same_kind(r))
            }
            _ => self == other,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::None => write!(f, "none"),
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Integer { bits, signed } => {
                write!(f, "{}int{}", if *signed { "" } else { "u" }, bits)
            }
            Type::String { size } => write!(f, "string[{}]", size),
            Type::Buffer { size } => write!(f, "buffer[{}]", size),
            Type::Inet { size } => write!(f, "inet[{}]", size),
            Type::Pointer(pointee) => write!(f, "{} *", pointee),
            Type::Array { element, len } => write!(f, "{}[{}]", element, len),
            Type::Record(record) => write!(f, "{}", record.name()),
            Type::Tuple(elements) => {
                let elements: Vec<_> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", elements.join(","))
            }
            Type::Aggregate(aggregate) => write!(f, "{}", aggregate),
            Type::StackMode => write!(f, "stack_mode"),
            Type::Stack(StackKind::Kernel) => write!(f, "kstack"),
            Type::Stack(StackKind::User) => write!(f, "ustack"),
            Type::Timestamp => write!(f, "timestamp"),
            Type::MacAddress => write!(f, "macaddr_t"),
            Type::CgroupPath => write!(f, "cgroup_path_t"),
            Type::Strerror => write!(f, "strerror_t"),
            Type::Ksym => write!(f, "ksym_t"),
            Type::Usym => write!(f, "usym_t"),
        }
    }
}

impl Display for Aggregate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (name, signed) = match self {
            Aggregate::Count => ("count_t", true),
            Aggregate::Sum { signed } => ("sum_t", *signed),
            Aggregate::Min { signed } => ("min_t", *signed),
            Aggregate::Max { signed } => ("max_t", *signed),
            Aggregate::Avg { signed } => ("avg_t", *signed),
            Aggregate::Stats { signed } => ("stats_t", *signed),
            Aggregate::Hist => ("hist_t", true),
            Aggregate::Lhist => ("lhist_t", true),
        };
        write!(f, "{}{}", if signed { "" } else { "u" }, name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub type_: Type,
    pub offset: usize,
}

/// A named structure. Its layout may be filled in after creation, once the type database
/// has been consulted; every copy of the type observes the update.
pub struct Record {
    name: String,
    fields: RefCell<Option<Vec<Field>>>,
}

impl Record {
    pub fn unresolved(name: impl Into<String>) -> Record {
        Record {
            name: name.into(),
            fields: RefCell::new(None),
        }
    }

    pub fn with_fields(name: impl Into<String>, fields: Vec<Field>) -> Record {
        Record {
            name: name.into(),
            fields: RefCell::new(Some(fields)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.fields.borrow().is_some()
    }

    pub fn resolve(&self, fields: Vec<Field>) {
        *self.fields.borrow_mut() = Some(fields);
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields
            .borrow()
            .as_ref()
            .and_then(|fields| fields.iter().find(|field| field.name == name).cloned())
    }

    pub fn fields(&self) -> Vec<Field> {
        self.fields.borrow().clone().unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.fields
            .borrow()
            .as_ref()
            .and_then(|fields| {
                fields
                    .iter()
                    .map(|field| field.offset + field.type_.size())
                    .max()
            })
            .unwrap_or(0)
    }
}

// Records can refer to themselves through pointer fields, so only the name is printed.
impl Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

/// Resolves a type name usable in `sizeof`, casts and declarations.
pub fn name_to_type(name: &str) -> Option<Type> {
    let type_ = match name {
        "bool" => Type::Bool,
        "int8" => Type::int(8),
        "int16" => Type::int(16),
        "int32" => Type::int(32),
        "int64" => Type::int(64),
        "uint8" => Type::uint(8),
        "uint16" => Type::uint(16),
        "uint32" => Type::uint(32),
        "uint64" => Type::uint(64),
        "void" => Type::Void,
        "count_t" => Type::Aggregate(Aggregate::Count),
        "sum_t" => Type::Aggregate(Aggregate::Sum { signed: true }),
        "usum_t" => Type::Aggregate(Aggregate::Sum { signed: false }),
        "min_t" => Type::Aggregate(Aggregate::Min { signed: true }),
        "umin_t" => Type::Aggregate(Aggregate::Min { signed: false }),
        "max_t" => Type::Aggregate(Aggregate::Max { signed: true }),
        "umax_t" => Type::Aggregate(Aggregate::Max { signed: false }),
        "avg_t" => Type::Aggregate(Aggregate::Avg { signed: true }),
        "uavg_t" => Type::Aggregate(Aggregate::Avg { signed: false }),
        "stats_t" => Type::Aggregate(Aggregate::Stats { signed: true }),
        "ustats_t" => Type::Aggregate(Aggregate::Stats { signed: false }),
        "hist_t" => Type::Aggregate(Aggregate::Hist),
        "lhist_t" => Type::Aggregate(Aggregate::Lhist),
        "timestamp" => Type::Timestamp,
        "macaddr_t" => Type::MacAddress,
        "cgroup_path_t" => Type::CgroupPath,
        "strerror_t" => Type::Strerror,
        "string" => Type::string(DEFAULT_STRING_SIZE),
        "inet" => Type::Inet { size: 24 },
        "buffer" => Type::Buffer {
            size: DEFAULT_STRING_SIZE,
        },
        _ => return None,
    };
    Some(type_)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_source_spellings() {
        assert_eq!(Type::int64().to_string(), "int64");
        assert_eq!(Type::uint(8).to_string(), "uint8");
        assert_eq!(Type::string(3).to_string(), "string[3]");
        assert_eq!(
            Type::pointer_to(Type::record("struct task_struct")).to_string(),
            "struct task_struct *"
        );
        assert_eq!(Type::array_of(Type::int(8), 4).to_string(), "int8[4]");
        assert_eq!(
            Type::Tuple(vec![Type::int64(), Type::string(2)]).to_string(),
            "(int64,string[2])"
        );
        assert_eq!(
            Type::Aggregate(Aggregate::Min { signed: false }).to_string(),
            "umin_t"
        );
    }

    #[test]
    fn records_resolve_in_place() {
        let type_ = Type::record("struct foo");
        let copy = type_.clone();
        let record = type_.as_record().unwrap();
        assert!(!record.is_resolved());

        record.resolve(vec![Field {
            name: "x".to_string(),
            type_: Type::int(32),
            offset: 4,
        }]);

        let copied = copy.as_record().unwrap();
        assert!(copied.is_resolved());
        assert_eq!(copied.field("x").unwrap().type_, Type::int(32));
        assert_eq!(copy.size(), 8);
    }

    #[test]
    fn only_some_aggregates_are_multi_output() {
        assert!(name_to_type("hist_t").unwrap().is_multi_output());
        assert!(name_to_type("stats_t").unwrap().is_multi_output());
        assert!(!name_to_type("count_t").unwrap().is_multi_output());
        assert!(name_to_type("struct").is_none());
    }
}
