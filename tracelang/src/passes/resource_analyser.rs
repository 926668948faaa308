//! Works out the runtime resources a program needs: maps, variables, user-space actions,
//! stack formats, and indices of probes and attach points.

use std::collections::HashSet;

use tracing::debug;

use super::{Pass, ScriptConfig, UnresolvedTypes};
use crate::ast::{
    AssignMapStatement, AssignVarStatement, Ast, Builtin, Call, Expression, For, Id, Map,
    Probe, Subprog, VarDeclStatement, Variable, Visitor,
};
use crate::config::{Config, StackMode};
use crate::errors::{map_key_mismatch, map_type_unresolved, map_value_mismatch, Diagnostics, Outcome};
use crate::resources::{
    key_shape, AsyncAction, AsyncSignature, MapInfo, MapKey, ProbeInfo, RequiredResources, Scope,
    VariableInfo,
};
use crate::typing::{StackKind, Type, TypeErrorKind};

struct ResourceAnalyser<'a> {
    ast: &'a mut Ast,
    config: &'a Config,
    resources: RequiredResources,

    scope: Scope,
    attach_points_seen: usize,

    /// Maps whose key shape was set by a keyed access or an assignment.
    keyed: HashSet<String>,
    /// Maps whose value type was set by an assignment.
    assigned: HashSet<String>,
    /// Maps already warned about.
    unresolved: HashSet<String>,

    errors: Diagnostics,
    warnings: Diagnostics,
}

/// Integers of any width can share a map, as keys and as values. Tuple keys are compared
/// element by element.
fn compatible(left: &Type, right: &Type) -> bool {
    match (left, right) {
        (Type::Tuple(left), Type::Tuple(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| compatible(l, r))
        }
        _ => left.is_same_kind(right) || (left.is_integer() && right.is_integer()),
    }
}

/// The larger of two compatible types, element-wise for tuples.
fn widen(left: &Type, right: &Type) -> Type {
    match (left, right) {
        (Type::Tuple(left), Type::Tuple(right)) => {
            Type::Tuple(left.iter().zip(right).map(|(l, r)| widen(l, r)).collect())
        }
        _ if right.size() > left.size() => right.clone(),
        _ => left.clone(),
    }
}

impl<'a> ResourceAnalyser<'a> {
    fn stack_type(&mut self, kind: StackKind, mode: StackMode) {
        self.resources.stack_types.insert((kind, mode));
        if kind == StackKind::User {
            self.resources.uses_usym_table = true;
        }
    }

    /// Type of the values stored through `map`, warning once per map if it is unresolved.
    fn value_type(&mut self, map: Id<Map>) -> Option<Type> {
        match self.ast.resolved_type(map) {
            Ok(type_) => Some(type_),
            Err(error) => {
                let name = &self.ast[map].ident;
                if error.kind == TypeErrorKind::Unresolved && self.unresolved.insert(name.clone()) {
                    self.warnings
                        .push(map_type_unresolved(name, &error, self.ast[map].info.loc));
                }
                None
            }
        }
    }

    fn record_map(&mut self, map: Id<Map>, is_assignment: bool) {
        let Map {
            ref ident,
            key,
            ref info,
        } = self.ast[map];
        let (name, loc) = (ident.clone(), info.loc);
        let key: Option<MapKey> = match key {
            Some(key) => self.ast.resolved_type(key).ok().map(Some),
            None if is_assignment => Some(None),
            // Whole-map uses such as `print(@m)` say nothing about the key.
            None => None,
        };
        let value = self.value_type(map);

        if !self.resources.maps.contains_key(&name) {
            let id = self.resources.maps.len();
            debug!(map = name.as_str(), id, "new map");
            self.resources.maps.insert(
                name.clone(),
                MapInfo {
                    id,
                    key: None,
                    value: None,
                    first_use: loc,
                },
            );
        }

        let mut errors = Vec::new();
        let info = match self.resources.maps.get_mut(&name) {
            Some(info) => info,
            None => return,
        };

        if let Some(key) = key {
            if self.keyed.insert(name.clone()) {
                info.key = key;
                info.first_use = loc;
            } else {
                let widened = match (&info.key, &key) {
                    (None, None) => Some(None),
                    (Some(expected), Some(actual)) if compatible(expected, actual) => {
                        Some(Some(widen(expected, actual)))
                    }
                    _ => None,
                };
                if let Some(widened) = widened {
                    info.key = widened;
                } else {
                    errors.push(map_key_mismatch(
                        &name,
                        &key_shape(&info.key),
                        &key_shape(&key),
                        loc,
                        info.first_use,
                    ));
                }
            }
        }

        if let Some(value) = value {
            if is_assignment {
                if self.assigned.insert(name.clone()) {
                    info.value = Some(value);
                } else if let Some(ref expected) = info.value {
                    if !compatible(expected, &value) {
                        errors.push(map_value_mismatch(
                            &name,
                            expected,
                            &value,
                            loc,
                            info.first_use,
                        ));
                    } else {
                        info.value = Some(widen(expected, &value));
                    }
                }
            } else if info.value.is_none() {
                info.value = Some(value);
            }
        }

        self.errors.extend(errors);
    }

    fn record_variable(&mut self, var: Id<Variable>) {
        let name = self.ast[var].ident.clone();
        let type_ = self.ast.resolved_type(var).ok();
        let needs_scratch = type_
            .as_ref()
            .map_or(false, |type_| type_.size() as u64 > self.config.on_stack_limit());

        let scope = self.scope.clone();
        let existing = self
            .resources
            .variables
            .iter_mut()
            .find(|known| known.name == name && known.scope == scope);
        match existing {
            Some(known) => {
                if known.type_.is_none() {
                    known.type_ = type_;
                    known.needs_scratch = needs_scratch;
                }
            }
            None => self.resources.variables.push(VariableInfo {
                name,
                scope,
                type_,
                needs_scratch,
            }),
        }
    }
}

impl<'a> Visitor for ResourceAnalyser<'a> {
    type Output = ();

    fn ast(&mut self) -> &mut Ast {
        self.ast
    }

    fn visit_subprog(&mut self, subprog: Id<Subprog>) {
        self.scope = Scope::Function(self.ast[subprog].name.clone());
        self.walk_subprog(subprog)
    }

    fn visit_probe(&mut self, probe: Id<Probe>) {
        let index = self.resources.probes.len();
        self.ast[probe].index = index;
        let mut attach_points = Vec::new();
        for ap in self.ast[probe].attach_points.clone() {
            self.ast[ap].index = self.attach_points_seen;
            self.attach_points_seen += 1;
            attach_points.push(self.ast[ap].name());
        }
        let name = self.ast[probe].name(&*self.ast);
        self.resources.probes.push(ProbeInfo {
            index,
            name,
            attach_points,
        });

        self.scope = Scope::Probe(index);
        self.walk_probe(probe)
    }

    fn visit_map(&mut self, map: Id<Map>) {
        self.walk_map(map);
        self.record_map(map, false);
    }

    fn visit_assign_map(&mut self, stmt: Id<AssignMapStatement>) {
        let map = self.ast[stmt].map;
        self.walk_map(map);
        self.record_map(map, true);
        self.visit_expr_slot(|ast| &mut ast[stmt].expr);
    }

    fn visit_assign_var(&mut self, stmt: Id<AssignVarStatement>) {
        self.walk_assign_var(stmt);
        let var = self.ast[stmt].var;
        self.record_variable(var);
    }

    fn visit_var_decl(&mut self, decl: Id<VarDeclStatement>) {
        let var = self.ast[decl].var;
        self.record_variable(var);
    }

    fn visit_for(&mut self, for_: Id<For>) {
        let decl = self.ast[for_].decl;
        self.record_variable(decl);
        self.walk_for(for_)
    }

    fn visit_builtin(&mut self, builtin: Id<Builtin>) {
        let mode = self.config.stack_mode();
        match self.ast[builtin].name.as_str() {
            "elapsed" => self.resources.needs_elapsed_map = true,
            "kstack" => self.stack_type(StackKind::Kernel, mode),
            "ustack" => self.stack_type(StackKind::User, mode),
            _ => {}
        }
    }

    fn visit_call(&mut self, call: Id<Call>) {
        self.walk_call(call);
        let Call {
            ref func, ref args, ..
        } = self.ast[call];

        let stack_kind = match func.as_str() {
            "kstack" => Some(StackKind::Kernel),
            "ustack" => Some(StackKind::User),
            _ => None,
        };
        if let Some(kind) = stack_kind {
            let mode = match args.first() {
                Some(Expression::StackMode(mode)) => self.ast[*mode].mode,
                _ => self.config.stack_mode(),
            };
            self.stack_type(kind, mode);
            return;
        }

        match func.as_str() {
            "join" => self.resources.needs_join_map = true,
            "usym" => self.resources.uses_usym_table = true,
            _ => {}
        }

        let action = match AsyncAction::from_function(func) {
            Some(action) => action,
            None => return,
        };
        // Printing a whole map reads the map itself.
        if action == AsyncAction::Print && args.first().map_or(false, |arg| arg.is_map()) {
            return;
        }
        let arg_types: Result<Vec<_>, _> =
            args.iter().map(|arg| self.ast.resolved_type(*arg)).collect();
        if let Ok(arg_types) = arg_types {
            self.resources
                .async_signatures
                .insert(AsyncSignature { action, arg_types });
        }
    }
}

pub fn pass() -> Pass {
    Pass::producing("ResourceAnalyser", |ctx| {
        let config = ctx.get::<ScriptConfig>().0.clone();
        let mut analyser = ResourceAnalyser {
            ast: ctx.ast,
            config: &config,
            resources: RequiredResources::default(),
            scope: Scope::Probe(0),
            attach_points_seen: 0,
            keyed: HashSet::new(),
            assigned: HashSet::new(),
            unresolved: HashSet::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };
        analyser.visit(ctx.program);
        let ResourceAnalyser {
            resources,
            errors,
            warnings,
            ..
        } = analyser;
        Outcome::from_parts(resources, errors, warnings)
    })
    .requires::<ScriptConfig>()
    .requires::<UnresolvedTypes>()
}
