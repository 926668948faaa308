//! Binds types of identifiers, builtins, calls, maps and variables, consulting the type
//! database for layouts of records.
//!
//! Analysis runs in four walks over the program:
//!
//! 1. collecting every map and variable assignment, so reads can refer to them;
//! 2. binding types, most of them as lazy computations over the tree;
//! 3. resolving records reached through field accesses, now that operand types are known;
//! 4. checking that the types of all statement-level expressions resolve.
//!
//! Names the type database does not know are not errors: they end up in
//! [`UnresolvedTypes`], and expressions depending on them produce warnings.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tracing::debug;

use super::Pass;
use crate::ast::{
    AssignMapStatement, AssignVarStatement, Ast, Builtin, Call, Cast, Config, Expression,
    FieldAccess, For, Id, Identifier, If, Jump, Map, Offsetof, Predicate, Probe, Sizeof,
    Statement, Subprog, TypeOrExpr, Unroll, VarDeclStatement, Variable, Visitor, While,
    ExprStatement, Program,
};
use crate::errors::{
    function_redefined, illegal_array_type, mixed_probe_arguments, probe_arguments_unresolved,
    type_deferred, type_resolution_failed, Diagnostics, Outcome,
};
use crate::functions::{Function, FunctionError, FunctionRegistry, Param};
use crate::platform::{TypeDatabase, RETVAL_FIELD_NAME};
use crate::resources::Scope;
use crate::source::InputSpan;
use crate::typing::{
    Field, Record, StackKind, Type, TypeBinding, TypeError, TypeErrorKind, TypeResult,
};

/// Names of types the type database could not resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnresolvedTypes(pub BTreeSet<String>);

/// Something a map or variable read can take its type from.
#[derive(Debug, Clone)]
enum Source {
    MapValue(Id<AssignMapStatement>),
    VarValue(Id<AssignVarStatement>),
    Declared(Type),
    LoopVar(Id<Variable>),
}

impl Source {
    fn resolve(&self, ast: &Ast) -> TypeResult {
        match self {
            Source::MapValue(stmt) => ast.resolved_type(ast[*stmt].expr),
            Source::VarValue(stmt) => ast.resolved_type(ast[*stmt].expr),
            Source::Declared(type_) => Ok(type_.clone()),
            Source::LoopVar(var) => ast.resolved_type(*var),
        }
    }

    fn is_part_of(&self, assignment: Option<Statement>) -> bool {
        match (self, assignment) {
            (Source::MapValue(stmt), Some(Statement::AssignMap(enclosing))) => *stmt == enclosing,
            (Source::VarValue(stmt), Some(Statement::AssignVar(enclosing))) => *stmt == enclosing,
            _ => false,
        }
    }
}

/// Type of the first source that resolves. Sources that only fail because they depend on
/// the read itself are skipped, and a name without usable sources is an `int64`.
fn first_resolving(sources: Vec<Source>) -> TypeBinding {
    TypeBinding::computed(move |ast| {
        let mut failure = None;
        for source in &sources {
            match source.resolve(ast) {
                Ok(type_) => return Ok(type_),
                Err(error) => {
                    if error.kind != TypeErrorKind::Cyclic && failure.is_none() {
                        failure = Some(error);
                    }
                }
            }
        }
        failure.map_or(Ok(Type::int64()), Err)
    })
}

fn unresolved_binding(name: &str) -> TypeBinding {
    let message = format!("{} has not been resolved", name);
    TypeBinding::computed(move |_| Err(TypeError::unresolved(message.clone())))
}

#[derive(Default)]
struct Assignments {
    maps: HashMap<String, Vec<Id<AssignMapStatement>>>,
    vars: HashMap<(Scope, String), Vec<Source>>,
}

/// First walk: records where maps and variables get their values.
struct Collector<'a> {
    ast: &'a mut Ast,
    scope: Scope,
    probes_seen: usize,
    assignments: Assignments,
}

impl<'a> Collector<'a> {
    fn add_var(&mut self, name: &str, source: Source) {
        self.assignments
            .vars
            .entry((self.scope.clone(), name.to_string()))
            .or_insert_with(Vec::new)
            .push(source);
    }
}

impl<'a> Visitor for Collector<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_subprog(&mut self, subprog: Id<Subprog>) {
        self.scope = Scope::Function(self.ast[subprog].name.clone());
        for arg in self.ast[subprog].args.clone() {
            let arg = &self.ast[arg];
            let (name, type_) = (arg.name.clone(), arg.arg_type.clone());
            self.add_var(&name, Source::Declared(type_));
        }
        self.walk_subprog(subprog)
    }

    fn visit_probe(&mut self, probe: Id<Probe>) {
        self.scope = Scope::Probe(self.probes_seen);
        self.probes_seen += 1;
        self.walk_probe(probe)
    }

    fn visit_assign_map(&mut self, stmt: Id<AssignMapStatement>) {
        let name = self.ast[self.ast[stmt].map].ident.clone();
        self.assignments
            .maps
            .entry(name)
            .or_insert_with(Vec::new)
            .push(stmt);
        self.walk_assign_map(stmt)
    }

    fn visit_assign_var(&mut self, stmt: Id<AssignVarStatement>) {
        let AssignVarStatement {
            var, declaration, ..
        } = self.ast[stmt];
        let name = self.ast[var].ident.clone();
        let declared = declaration.and_then(|decl| self.ast[decl].declared_type.clone());
        match declared {
            Some(type_) => self.add_var(&name, Source::Declared(type_)),
            None => self.add_var(&name, Source::VarValue(stmt)),
        }
        self.walk_assign_var(stmt)
    }

    fn visit_var_decl(&mut self, decl: Id<VarDeclStatement>) {
        let VarDeclStatement {
            var,
            ref declared_type,
            ..
        } = self.ast[decl];
        if let Some(type_) = declared_type.clone() {
            let name = self.ast[var].ident.clone();
            self.add_var(&name, Source::Declared(type_));
        }
    }

    fn visit_for(&mut self, for_: Id<For>) {
        let decl = self.ast[for_].decl;
        let name = self.ast[decl].ident.clone();
        self.add_var(&name, Source::LoopVar(decl));
        self.walk_for(for_)
    }

    fn visit_config(&mut self, _config: Id<Config>) {}
}

/// Second walk: binds types.
struct Binder<'a> {
    ast: &'a mut Ast,
    types: &'a dyn TypeDatabase,
    registry: Rc<FunctionRegistry>,
    assignments: Assignments,

    scope: Scope,
    probes_seen: usize,
    probe: Option<Id<Probe>>,

    /// Type of `args` in the current probe, once computed.
    args_type: Option<Type>,

    /// Assignment whose value is being visited.
    assignment: Option<Statement>,

    unresolved: BTreeSet<String>,
    errors: Diagnostics,
    warnings: Diagnostics,
}

impl<'a> Binder<'a> {
    fn resolve_record(&mut self, type_: &Type) {
        resolve_record(self.types, &mut self.unresolved, type_);
    }

    /// Checks a type written in the program.
    fn check_written_type(&mut self, type_: &Type, loc: InputSpan) {
        if let Type::Array { element, .. } = type_ {
            if !element.is_integer() {
                self.errors.push(illegal_array_type(type_, loc));
            }
        }
        self.resolve_record(type_);
    }

    fn var_sources(&self, name: &str) -> Vec<Source> {
        self.assignments
            .vars
            .get(&(self.scope.clone(), name.to_string()))
            .map(|sources| {
                sources
                    .iter()
                    .filter(|source| !source.is_part_of(self.assignment))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn map_sources(&self, name: &str) -> Vec<Source> {
        self.assignments
            .maps
            .get(name)
            .map(|stmts| {
                stmts
                    .iter()
                    .map(|stmt| Source::MapValue(*stmt))
                    .filter(|source| !source.is_part_of(self.assignment))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Type of `args` in `probe`.
    fn args_type(&mut self, probe: Id<Probe>, loc: InputSpan) -> Type {
        if let Some(ref type_) = self.args_type {
            return type_.clone();
        }

        let typename = self.ast[probe].args_typename(&*self.ast);
        let mut records: Vec<Rc<Record>> = Vec::new();
        let mut typed = false;
        let mut complete = true;
        for ap in self.ast[probe].attach_points.clone() {
            let ap = &self.ast[ap];
            let probe_type = match ap.probe_type() {
                Some(probe_type) if probe_type.has_typed_args() => probe_type,
                _ => continue,
            };
            typed = true;
            match self.types.resolve_args(&ap.func, probe_type.is_return()) {
                Ok(record) => records.push(record),
                Err(error) => {
                    self.warnings
                        .push(probe_arguments_unresolved(&ap.name(), error, ap.loc));
                    complete = false;
                }
            }
        }

        let type_ = if !typed {
            match self.types.resolve_type(&typename) {
                Some(type_) => type_,
                None => {
                    self.unresolved.insert(typename.clone());
                    Type::record(typename)
                }
            }
        } else if !complete || records.is_empty() {
            Type::record(typename)
        } else {
            let fields = records[0].fields();
            if records.iter().any(|record| record.fields() != fields) {
                let name = self.ast[probe].name(&*self.ast);
                self.errors.push(mixed_probe_arguments(&name, loc));
            }
            Type::Record(Rc::new(Record::with_fields(typename, fields)))
        };

        self.args_type = Some(type_.clone());
        type_
    }

    fn builtin_binding(&mut self, name: &str, loc: InputSpan) -> TypeBinding {
        let known = match name {
            "pid" | "tid" | "uid" | "gid" | "cpu" => Type::uint(32),
            "nsecs" | "elapsed" => Type::uint64(),
            "comm" => Type::string(16),
            "probe" | "func" => Type::string(64),
            "ctx" => Type::pointer_to(Type::record("struct pt_regs")),
            "curtask" => Type::pointer_to(Type::record("struct task_struct")),
            "kstack" => Type::Stack(StackKind::Kernel),
            "ustack" => Type::Stack(StackKind::User),
            "args" | "retval" => {
                let probe = match self.probe {
                    Some(probe) => probe,
                    None => {
                        let message = format!("builtin {} is not available in functions", name);
                        return TypeBinding::computed(move |_| {
                            Err(TypeError::invalid(message.clone()))
                        });
                    }
                };
                let args = self.args_type(probe, loc);
                if name == "args" {
                    args
                } else {
                    let retval: Option<Field> = args
                        .as_record()
                        .and_then(|record| record.field(RETVAL_FIELD_NAME));
                    retval.map_or_else(Type::int64, |field| field.type_)
                }
            }
            _ if is_arg_builtin(name) => Type::uint64(),
            _ => {
                let message = format!("unknown builtin {}", name);
                return TypeBinding::computed(move |_| Err(TypeError::invalid(message.clone())));
            }
        };
        self.resolve_record(&known);
        TypeBinding::Known(known)
    }
}

/// `arg0` to `arg9`.
fn is_arg_builtin(name: &str) -> bool {
    name.len() == 4 && name.starts_with("arg") && name.as_bytes()[3].is_ascii_digit()
}

fn resolve_record(types: &dyn TypeDatabase, unresolved: &mut BTreeSet<String>, type_: &Type) {
    if let Some(record) = type_.as_record() {
        if !record.is_resolved() && !types.resolve_fields(record) {
            debug!(record = record.name(), "type database cannot resolve record");
            unresolved.insert(record.name().to_string());
        }
    }
}

impl<'a> Visitor for Binder<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_subprog(&mut self, subprog: Id<Subprog>) {
        self.scope = Scope::Function(self.ast[subprog].name.clone());
        self.probe = None;

        let loc = self.ast[subprog].loc;
        let mut written = vec![self.ast[subprog].return_type.clone()];
        for arg in &self.ast[subprog].args {
            written.push(self.ast[*arg].arg_type.clone());
        }
        for type_ in written {
            self.check_written_type(&type_, loc);
        }
        self.walk_subprog(subprog)
    }

    fn visit_probe(&mut self, probe: Id<Probe>) {
        self.scope = Scope::Probe(self.probes_seen);
        self.probes_seen += 1;
        self.probe = Some(probe);
        self.args_type = None;
        self.walk_probe(probe)
    }

    fn visit_config(&mut self, _config: Id<Config>) {}

    fn visit_identifier(&mut self, identifier: Id<Identifier>) {
        let name = self.ast[identifier].name.clone();
        let binding = match self.types.resolve_type(&name) {
            Some(type_) => TypeBinding::Known(type_),
            None => {
                debug!(identifier = name.as_str(), "type database cannot resolve identifier");
                self.unresolved.insert(name.clone());
                unresolved_binding(&name)
            }
        };
        self.ast.set_type(identifier, binding);
    }

    fn visit_builtin(&mut self, builtin: Id<Builtin>) {
        let Builtin { ref name, ref info } = self.ast[builtin];
        let (name, loc) = (name.clone(), info.loc);
        let binding = self.builtin_binding(&name, loc);
        self.ast.set_type(builtin, binding);
    }

    fn visit_call(&mut self, call: Id<Call>) {
        self.walk_call(call);
        let registry = Rc::clone(&self.registry);
        self.ast.set_type(
            call,
            TypeBinding::computed(move |ast| {
                let call = &ast[call];
                let arg_types = call
                    .args
                    .iter()
                    .map(|arg| ast.resolved_type(*arg))
                    .collect::<Result<Vec<_>, _>>()?;
                registry
                    .get(&call.func, &arg_types)
                    .map(|function| function.return_type(&arg_types))
                    .map_err(|error| TypeError::invalid(error.to_string()))
            }),
        );
    }

    fn visit_sizeof(&mut self, sizeof: Id<Sizeof>) {
        if let TypeOrExpr::Type(ref type_) = self.ast[sizeof].arg {
            let (type_, loc) = (type_.clone(), self.ast[sizeof].info.loc);
            self.check_written_type(&type_, loc);
        }
        self.walk_sizeof(sizeof)
    }

    fn visit_offsetof(&mut self, offsetof: Id<Offsetof>) {
        if let TypeOrExpr::Type(ref type_) = self.ast[offsetof].record {
            let (type_, loc) = (type_.clone(), self.ast[offsetof].info.loc);
            self.check_written_type(&type_, loc);
        }
        self.walk_offsetof(offsetof)
    }

    fn visit_cast(&mut self, cast: Id<Cast>) {
        let (type_, loc) = (self.ast[cast].cast_type.clone(), self.ast[cast].info.loc);
        self.check_written_type(&type_, loc);
        self.walk_cast(cast)
    }

    fn visit_map(&mut self, map: Id<Map>) {
        let sources = self.map_sources(&self.ast[map].ident);
        self.ast.set_type(map, first_resolving(sources));
        self.walk_map(map)
    }

    fn visit_variable(&mut self, var: Id<Variable>) {
        let sources = self.var_sources(&self.ast[var].ident);
        self.ast.set_type(var, first_resolving(sources));
    }

    fn visit_assign_map(&mut self, stmt: Id<AssignMapStatement>) {
        let map = self.ast[stmt].map;
        self.ast.set_type(
            map,
            TypeBinding::computed(move |ast| ast.resolved_type(ast[stmt].expr)),
        );
        self.walk_map(map);

        let enclosing = self.assignment.replace(Statement::AssignMap(stmt));
        self.visit_expr_slot(|ast| &mut ast[stmt].expr);
        self.assignment = enclosing;
    }

    fn visit_assign_var(&mut self, stmt: Id<AssignVarStatement>) {
        let AssignVarStatement {
            var, declaration, ..
        } = self.ast[stmt];
        let declared = declaration.and_then(|decl| self.ast[decl].declared_type.clone());
        let binding = match declared {
            Some(type_) => {
                let loc = self.ast[stmt].loc;
                self.check_written_type(&type_, loc);
                TypeBinding::Known(type_)
            }
            None => TypeBinding::computed(move |ast| ast.resolved_type(ast[stmt].expr)),
        };
        self.ast.set_type(var, binding);

        let enclosing = self.assignment.replace(Statement::AssignVar(stmt));
        self.visit_expr_slot(|ast| &mut ast[stmt].expr);
        self.assignment = enclosing;
    }

    fn visit_var_decl(&mut self, decl: Id<VarDeclStatement>) {
        let VarDeclStatement {
            var,
            ref declared_type,
            loc,
        } = self.ast[decl];
        let binding = match declared_type.clone() {
            Some(type_) => {
                self.check_written_type(&type_, loc);
                TypeBinding::Known(type_)
            }
            None => first_resolving(self.var_sources(&self.ast[var].ident)),
        };
        self.ast.set_type(var, binding);
    }

    fn visit_for(&mut self, for_: Id<For>) {
        let For { decl, expr, .. } = self.ast[for_];
        let assignments = match expr {
            Expression::Map(map) => self
                .assignments
                .maps
                .get(&self.ast[map].ident)
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        self.ast.set_type(
            decl,
            TypeBinding::computed(move |ast| {
                let map = match ast[for_].expr {
                    Expression::Map(map) => map,
                    _ => return Err(TypeError::invalid("for loops can only iterate over maps")),
                };
                let value = ast.resolved_type(map)?;
                let key = match assignments.first().and_then(|stmt| ast[ast[*stmt].map].key) {
                    Some(key) => ast.resolved_type(key)?,
                    None => Type::int64(),
                };
                Ok(Type::Tuple(vec![key, value]))
            }),
        );

        self.visit_expr_slot(|ast| &mut ast[for_].expr);
        self.visit_block_slot(|ast| &mut ast[for_].block);
    }
}

/// Third walk: resolves records met through field accesses, innermost first.
struct RecordResolver<'a> {
    ast: &'a mut Ast,
    types: &'a dyn TypeDatabase,
    unresolved: &'a mut BTreeSet<String>,
}

impl<'a> Visitor for RecordResolver<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_config(&mut self, _config: Id<Config>) {}

    fn visit_field_access(&mut self, access: Id<FieldAccess>) {
        self.walk_field_access(access);
        let operand = self.ast.resolved_type(self.ast[access].expr);
        if let Ok(type_) = operand {
            let was_resolved = type_.as_record().map_or(true, |record| record.is_resolved());
            resolve_record(self.types, self.unresolved, &type_);
            if !was_resolved {
                // Field types computed against the unresolved record are stale.
                self.ast.invalidate_types();
            }
        }
    }
}

/// Fourth walk: reports expressions whose types do not resolve.
struct ErrorSweep<'a> {
    ast: &'a mut Ast,
    registry: Rc<FunctionRegistry>,
    errors: Diagnostics,
    warnings: Diagnostics,
}

impl<'a> ErrorSweep<'a> {
    fn check(&mut self, expr: Expression) {
        let error = match self.ast.resolved_type(expr) {
            Ok(_) => return,
            Err(error) => error,
        };
        let loc = expr.location(self.ast);
        if error.kind == TypeErrorKind::Unresolved {
            self.warnings.push(type_deferred(&error, loc));
            return;
        }

        let mut diagnostic = type_resolution_failed(&error, loc);
        if let Expression::Call(call) = expr {
            for candidate in self.candidates(call) {
                diagnostic = diagnostic.with_free_note(format!("Candidate: {}", candidate));
            }
        }
        self.errors.push(diagnostic);
    }

    /// Signatures considered for a call that matches none of them.
    fn candidates(&self, call: Id<Call>) -> Vec<String> {
        let call = &self.ast[call];
        let arg_types: Result<Vec<_>, _> = call
            .args
            .iter()
            .map(|arg| self.ast.resolved_type(*arg))
            .collect();
        match arg_types.map(|arg_types| self.registry.get(&call.func, &arg_types).err()) {
            Ok(Some(FunctionError::NoMatch { candidates, .. })) => candidates,
            _ => Vec::new(),
        }
    }
}

impl<'a> Visitor for ErrorSweep<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_config(&mut self, _config: Id<Config>) {}

    fn visit_expr_statement(&mut self, stmt: Id<ExprStatement>) {
        self.check(self.ast[stmt].expr);
    }

    fn visit_assign_map(&mut self, stmt: Id<AssignMapStatement>) {
        if let Some(key) = self.ast[self.ast[stmt].map].key {
            self.check(key);
        }
        self.check(self.ast[stmt].expr);
    }

    fn visit_assign_var(&mut self, stmt: Id<AssignVarStatement>) {
        self.check(self.ast[stmt].expr);
    }

    fn visit_if(&mut self, if_: Id<If>) {
        self.check(self.ast[if_].cond);
        self.walk_if(if_)
    }

    fn visit_while(&mut self, while_: Id<While>) {
        self.check(self.ast[while_].cond);
        self.walk_while(while_)
    }

    fn visit_unroll(&mut self, unroll: Id<Unroll>) {
        self.check(self.ast[unroll].expr);
        self.walk_unroll(unroll)
    }

    fn visit_for(&mut self, for_: Id<For>) {
        self.check(self.ast[for_].expr);
        self.walk_for(for_)
    }

    fn visit_jump(&mut self, jump: Id<Jump>) {
        if let Some(value) = self.ast[jump].return_value {
            self.check(value);
        }
    }

    fn visit_predicate(&mut self, predicate: Id<Predicate>) {
        self.check(self.ast[predicate].expr);
    }
}

/// Builtin functions plus the functions defined by the program.
fn function_registry(ast: &Ast, program: Id<Program>) -> (FunctionRegistry, Diagnostics) {
    let mut registry = FunctionRegistry::with_builtins();
    let mut errors = Vec::new();
    for subprog in &ast[program].functions {
        let subprog = &ast[*subprog];
        let params = subprog
            .args
            .iter()
            .map(|arg| Param::new(ast[*arg].name.clone(), ast[*arg].arg_type.clone()))
            .collect();
        let function = Function::script(subprog.name.clone(), params, subprog.return_type.clone());
        if registry.add(function).is_err() {
            errors.push(function_redefined(&subprog.name, subprog.loc));
        }
    }
    (registry, errors)
}

fn analyse(
    ast: &mut Ast,
    program: Id<Program>,
    types: &dyn TypeDatabase,
) -> Outcome<UnresolvedTypes> {
    let (registry, mut errors) = function_registry(ast, program);
    let registry = Rc::new(registry);

    let mut collector = Collector {
        ast,
        scope: Scope::Probe(0),
        probes_seen: 0,
        assignments: Assignments::default(),
    };
    collector.visit(program);
    let assignments = collector.assignments;

    let mut binder = Binder {
        ast,
        types,
        registry: Rc::clone(&registry),
        assignments,
        scope: Scope::Probe(0),
        probes_seen: 0,
        probe: None,
        args_type: None,
        assignment: None,
        unresolved: BTreeSet::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    binder.visit(program);
    let mut unresolved = binder.unresolved;
    errors.extend(binder.errors);
    let mut warnings = binder.warnings;

    RecordResolver {
        ast,
        types,
        unresolved: &mut unresolved,
    }
    .visit(program);

    let mut sweep = ErrorSweep {
        ast,
        registry,
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    sweep.visit(program);
    errors.extend(sweep.errors);
    warnings.extend(sweep.warnings);

    if !unresolved.is_empty() {
        debug!(count = unresolved.len(), "unresolved types left for later");
    }
    Outcome::from_parts(UnresolvedTypes(unresolved), errors, warnings)
}

pub fn pass() -> Pass {
    Pass::producing("FieldAnalyser", |ctx| {
        analyse(ctx.ast, ctx.program, ctx.types)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;
    use crate::params::Params;
    use crate::passes::test_utils::{messages, run_passes_with};
    use crate::platform::StaticTypeDatabase;

    struct Analysed {
        ast: Ast,
        program: Id<Program>,
        outcome: Outcome<()>,
    }

    fn analyse_with(source: &str, types: &StaticTypeDatabase) -> Analysed {
        let (ast, program, outcome) = run_passes_with(
            source,
            &Params::default(),
            &CompilerOptions::default(),
            types,
            vec![pass()],
        );
        Analysed {
            ast,
            program,
            outcome,
        }
    }

    fn analyse_source(source: &str) -> Analysed {
        analyse_with(source, &StaticTypeDatabase::new())
    }

    impl Analysed {
        /// Types of the maps assigned at the top level of the last probe, in order.
        fn map_types(&self) -> Vec<TypeResult> {
            let probe = *self.ast[self.program].probes.last().unwrap();
            let block = self.ast[probe].block;
            self.ast[block]
                .stmts
                .iter()
                .filter_map(|stmt| match stmt {
                    Statement::AssignMap(id) => Some(self.ast.resolved_type(self.ast[*id].map)),
                    _ => None,
                })
                .collect()
        }

        fn map_type(&self) -> Type {
            self.map_types().remove(0).unwrap()
        }
    }

    #[test]
    fn binds_builtin_types() {
        let analysed = analyse_source(
            "kprobe:f { @a = pid; @b = comm; @c = nsecs; @d = arg3; @e = kstack; @f = retval; }",
        );
        assert!(analysed.outcome.is_ok());
        assert_eq!(
            analysed.map_types(),
            vec![
                Ok(Type::uint(32)),
                Ok(Type::string(16)),
                Ok(Type::uint64()),
                Ok(Type::uint64()),
                Ok(Type::Stack(StackKind::Kernel)),
                Ok(Type::int64()),
            ]
        );
    }

    #[test]
    fn reads_take_the_type_of_assignments() {
        let analysed = analyse_source("BEGIN { @x = \"abc\"; } END { @y = @x; }");
        assert_eq!(analysed.map_type(), Type::string(4));
    }

    #[test]
    fn self_referencing_assignments_default_to_int64() {
        let analysed = analyse_source("BEGIN { @x = @x + 1; $y = $y * 2; @z = $y; }");
        assert!(analysed.outcome.is_ok());
        assert_eq!(analysed.map_types(), vec![Ok(Type::int64()), Ok(Type::int64())]);
    }

    #[test]
    fn variables_are_scoped_to_probes() {
        let analysed = analyse_source("BEGIN { $x = \"s\"; } END { $x = 1; @y = $x; }");
        assert_eq!(analysed.map_type(), Type::int64());
    }

    #[test]
    fn declared_types_win() {
        let analysed = analyse_source("BEGIN { let $x: uint16; $x = 1; @y = $x; }");
        assert_eq!(analysed.map_type(), Type::uint(16));
    }

    #[test]
    fn loop_variables_are_key_value_tuples() {
        let analysed =
            analyse_source("BEGIN { @m[1] = \"a\"; for ($kv : @m) { @k = $kv.0; @v = $kv.1; } }");
        assert!(analysed.outcome.is_ok());
        let probe = analysed.ast[analysed.program].probes[0];
        let block = analysed.ast[probe].block;
        let for_ = match analysed.ast[block].stmts[1] {
            Statement::For(id) => id,
            other => panic!("unexpected {:?}", other),
        };
        let body = analysed.ast[for_].block;
        let types: Vec<_> = analysed.ast[body]
            .stmts
            .iter()
            .map(|stmt| match stmt {
                Statement::AssignMap(id) => analysed.ast.resolved_type(analysed.ast[*id].map),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(types, vec![Ok(Type::int64()), Ok(Type::string(2))]);
    }

    #[test]
    fn calls_are_typed_through_the_registry() {
        let analysed = analyse_source("BEGIN { @c = count(); @s = sum(-1); @t = str(\"ab\"); }");
        assert_eq!(
            analysed.map_types(),
            vec![
                Ok(Type::Aggregate(crate::typing::Aggregate::Count)),
                Ok(Type::Aggregate(crate::typing::Aggregate::Sum { signed: true })),
                Ok(Type::string(3)),
            ]
        );
    }

    #[test]
    fn script_functions_shadow_builtins() {
        let analysed = analyse_source(
            "fn count(): int16 { return 1; } fn f($a: int64): uint8 { return $a; } \
             BEGIN { @x = count(); @y = f(1); }",
        );
        assert!(analysed.outcome.is_ok());
        assert_eq!(analysed.map_types(), vec![Ok(Type::int(16)), Ok(Type::uint(8))]);
    }

    #[test]
    fn redefinitions_are_rejected() {
        let analysed =
            analyse_source("fn f(): int64 { return 1; } fn f(): int64 { return 2; } BEGIN {}");
        assert_eq!(
            messages(analysed.outcome.errors()),
            vec!["Function 'f' is already defined"]
        );
    }

    #[test]
    fn reports_unknown_functions() {
        let analysed = analyse_source("BEGIN { @x = nope(1); }");
        let errors = analysed.outcome.errors();
        assert_eq!(messages(errors), vec!["Function not found: 'nope'"]);
        assert_eq!(errors[0].code, "E0002");
    }

    #[test]
    fn mismatched_calls_list_candidates() {
        let analysed = analyse_source("BEGIN { @x = kaddr(1); }");
        let errors = analysed.outcome.errors();
        assert_eq!(
            messages(errors),
            vec!["Cannot call function 'kaddr' using argument types: (int64)"]
        );
        assert_eq!(errors[0].free_notes, vec!["Candidate: kaddr(string[64])"]);
    }

    #[test]
    fn resolves_records_through_the_database() {
        let types = StaticTypeDatabase::new().with_record(
            "struct task_struct",
            vec![
                ("pid", Type::int(32)),
                ("parent", Type::pointer_to(Type::record("struct task_struct"))),
            ],
        );
        let analysed = analyse_with(
            "BEGIN { @a = curtask->pid; @b = curtask->parent->pid; }",
            &types,
        );
        assert!(analysed.outcome.is_ok());
        assert!(analysed.outcome.warnings().is_empty());
        assert_eq!(analysed.map_types(), vec![Ok(Type::int(32)), Ok(Type::int(32))]);
    }

    #[test]
    fn unresolved_records_are_deferred() {
        let (_, outcome, unresolved) = crate::passes::test_utils::run_collecting::<UnresolvedTypes>(
            "BEGIN { @x = curtask->pid; }",
            vec![pass()],
        );
        assert!(outcome.is_ok());
        let warnings = outcome.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "W0004");
        assert_eq!(warnings[0].message, "struct task_struct has not been resolved");
        assert!(unresolved.unwrap().0.contains("struct task_struct"));
    }

    #[test]
    fn probe_arguments_come_from_function_signatures() {
        let types = StaticTypeDatabase::new()
            .with_function(
                "vfs_read",
                vec![("count", Type::uint64()), ("flags", Type::int(32))],
                Type::int(32),
            );
        let analysed = analyse_with(
            "fexit:vfs_read { @a = args.count; @b = args.flags; @c = retval; }",
            &types,
        );
        assert!(analysed.outcome.is_ok());
        assert_eq!(
            analysed.map_types(),
            vec![Ok(Type::uint64()), Ok(Type::int(32)), Ok(Type::int(32))]
        );
    }

    #[test]
    fn unknown_probe_functions_warn() {
        let analysed = analyse_source("fentry:missing { @a = args.x; }");
        assert!(analysed.outcome.is_ok());
        let codes: Vec<_> = analysed.outcome.warnings().iter().map(|w| w.code).collect();
        assert_eq!(codes, vec!["W0002", "W0004"]);
    }

    #[test]
    fn attach_points_must_agree_on_arguments() {
        let types = StaticTypeDatabase::new()
            .with_function("a", vec![("x", Type::int(32))], Type::Void)
            .with_function("b", vec![("y", Type::int(32))], Type::Void);
        let analysed = analyse_with("fentry:a,fentry:b { @x = args; }", &types);
        assert_eq!(
            messages(analysed.outcome.errors()),
            vec!["Probe has attach points with mixed arguments"]
        );
    }

    #[test]
    fn only_integer_arrays_are_permitted() {
        let analysed = analyse_source("BEGIN { let $a: struct foo[2]; }");
        assert_eq!(
            messages(analysed.outcome.errors()),
            vec!["only integer array types are permitted"]
        );

        let analysed = analyse_source("BEGIN { let $a: int8[2]; }");
        assert!(analysed.outcome.is_ok());
    }

    #[test]
    fn reports_type_errors_of_statements() {
        let analysed = analyse_source("BEGIN { @x = \"a\" + 1; if (comm > 2) {} }");
        assert_eq!(
            messages(analysed.outcome.errors()),
            vec![
                "type mismatch for '+': comparing 'string[2]' with 'int64'",
                "type mismatch for '>': comparing 'string[16]' with 'int64'",
            ]
        );
    }
}
