//! Scheduling of analysis passes.
//!
//! A pass declares the capabilities it requires and the capabilities it produces.
//! Capabilities are identified by Rust types: a pass producing `T` stores a value of `T`
//! in the [`PassContext`], and passes requiring `T` read it from there. Registration checks
//! that every required capability is produced by an earlier pass, so ordering mistakes are
//! caught when the pipeline is assembled, before any program is compiled.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::time::Instant;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::ast::{Ast, Id, Program};
use crate::errors::Outcome;
use crate::options::CompilerOptions;
use crate::params::Params;
use crate::platform::TypeDatabase;

/// Identifies a kind of compilation state passed between passes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    id: TypeId,
    name: &'static str,
}

impl Capability {
    pub fn of<T: 'static>() -> Capability {
        Capability {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Type name without its module path.
    pub fn name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl Debug for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shared state of a compilation, handed to every pass in turn.
pub struct PassContext<'a> {
    pub ast: &'a mut Ast,
    pub program: Id<Program>,
    pub params: &'a Params,
    pub options: &'a CompilerOptions,
    pub types: &'a dyn TypeDatabase,
    outputs: HashMap<TypeId, Box<dyn Any>>,
}

impl<'a> PassContext<'a> {
    pub fn new(
        ast: &'a mut Ast,
        program: Id<Program>,
        params: &'a Params,
        options: &'a CompilerOptions,
        types: &'a dyn TypeDatabase,
    ) -> PassContext<'a> {
        PassContext {
            ast,
            program,
            params,
            options,
            types,
            outputs: HashMap::new(),
        }
    }

    /// Output of an earlier pass.
    ///
    /// Reading a capability that was never produced is a compiler defect and aborts.
    pub fn get<T: 'static>(&self) -> &T {
        self.try_get()
            .unwrap_or_else(|| panic!("get<{}> failed; no object available.", type_name::<T>()))
    }

    pub fn try_get<T: 'static>(&self) -> Option<&T> {
        self.outputs
            .get(&TypeId::of::<T>())
            .and_then(|output| output.downcast_ref())
    }

    pub fn put<T: 'static>(&mut self, value: T) {
        self.outputs.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Removes an output, typically at the end of the pipeline.
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        self.outputs
            .remove(&TypeId::of::<T>())
            .and_then(|output| output.downcast().ok())
            .map(|output| *output)
    }
}

type PassFn = Box<dyn Fn(&mut PassContext<'_>) -> Outcome<()>>;

fn boxed(run: impl Fn(&mut PassContext<'_>) -> Outcome<()> + 'static) -> PassFn {
    Box::new(run)
}

pub struct Pass {
    name: &'static str,
    inputs: Vec<Capability>,
    outputs: Vec<Capability>,
    run: PassFn,
}

impl Pass {
    /// A pass that only inspects or rewrites the tree.
    pub fn analysis(
        name: &'static str,
        run: impl Fn(&mut PassContext<'_>) -> Outcome<()> + 'static,
    ) -> Pass {
        Pass {
            name,
            inputs: Vec::new(),
            outputs: Vec::new(),
            run: boxed(run),
        }
    }

    /// A pass producing a value of `T`, stored in the context when the pass succeeds.
    pub fn producing<T: 'static>(
        name: &'static str,
        run: impl Fn(&mut PassContext<'_>) -> Outcome<T> + 'static,
    ) -> Pass {
        Pass {
            name,
            inputs: Vec::new(),
            outputs: vec![Capability::of::<T>()],
            run: boxed(move |ctx| {
                run(ctx).map(|output| {
                    ctx.put(output);
                })
            }),
        }
    }

    pub fn requires<T: 'static>(mut self) -> Pass {
        self.inputs.push(Capability::of::<T>());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inputs(&self) -> &[Capability] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Capability] {
        &self.outputs
    }
}

#[derive(Default)]
pub struct PassManager {
    passes: Vec<Pass>,

    /// Index of the pass producing each capability.
    outputs: HashMap<Capability, usize>,
}

impl PassManager {
    pub fn new() -> PassManager {
        PassManager::default()
    }

    /// Appends a pass to the pipeline.
    ///
    /// A pass requiring a capability no earlier pass produces, or producing a capability
    /// some earlier pass already produces, is a compiler defect and aborts.
    pub fn add(&mut self, pass: Pass) -> &mut PassManager {
        for input in pass.inputs() {
            if !self.outputs.contains_key(input) {
                panic!(
                    "Pass {} requires output {}, which is not available.",
                    pass.name(),
                    input.name()
                );
            }
        }

        let pass_index = self.passes.len();
        for output in pass.outputs() {
            if let Some(&original) = self.outputs.get(output) {
                panic!(
                    "Pass {} attempting to register output {}, which is already registered by pass {}.",
                    pass.name(),
                    output.name(),
                    self.passes[original].name()
                );
            }
            self.outputs.insert(*output, pass_index);
        }

        self.passes.push(pass);
        self
    }

    pub fn passes(&self) -> impl Iterator<Item = &Pass> {
        self.passes.iter()
    }

    /// Runs all passes in registration order, stopping at the first pass that fails.
    /// The result carries the errors of the failing pass and every warning produced up
    /// to that point, in emission order.
    pub fn run(&self, ctx: &mut PassContext<'_>) -> Outcome<()> {
        let mut warnings = Vec::new();
        for pass in &self.passes {
            debug!(pass = pass.name(), "running pass");
            let started = Instant::now();
            let outcome = (pass.run)(ctx);
            info!(
                target: "passes",
                pass = pass.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                ok = outcome.is_ok(),
                "pass finished"
            );

            let (result, pass_warnings) = outcome.into_parts();
            warnings.extend(pass_warnings);
            if let Err(errors) = result {
                return Outcome::failure(errors).with_warnings(warnings);
            }
        }
        Outcome::success(()).with_warnings(warnings)
    }

    /// Graph of passes, with an edge from each producer to each consumer of a capability.
    pub fn dependency_graph(&self) -> DiGraph<&'static str, &'static str> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = self
            .passes
            .iter()
            .map(|pass| graph.add_node(pass.name()))
            .collect();

        for (consumer, pass) in self.passes.iter().enumerate() {
            for input in pass.inputs() {
                let producer = self.outputs[input];
                graph.add_edge(nodes[producer], nodes[consumer], input.name());
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::syntax_error;
    use crate::platform::StaticTypeDatabase;
    use crate::source::InputSpan;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct X;
    struct Y;

    fn produces_x() -> Pass {
        Pass::producing("A", |_| Outcome::success(X))
    }

    #[test]
    fn consumers_after_producers_are_accepted() {
        let mut manager = PassManager::new();
        manager
            .add(produces_x())
            .add(Pass::analysis("B", |_| Outcome::success(())).requires::<X>());
        assert_eq!(manager.passes().count(), 2);
    }

    #[test]
    #[should_panic(expected = "Pass B requires output X, which is not available.")]
    fn consumers_before_producers_are_rejected() {
        let mut manager = PassManager::new();
        manager.add(Pass::analysis("B", |_| Outcome::success(())).requires::<X>());
    }

    #[test]
    #[should_panic(
        expected = "Pass C attempting to register output X, which is already registered by pass A."
    )]
    fn duplicate_outputs_are_rejected() {
        let mut manager = PassManager::new();
        manager
            .add(produces_x())
            .add(Pass::producing("C", |_| Outcome::success(X)));
    }

    fn warning(message: &str) -> crate::errors::Diagnostic {
        let mut warning =
            crate::errors::unreachable_code(InputSpan::top_of_file(), InputSpan::new(0, 0));
        warning.message = message.to_string();
        warning
    }

    fn run(manager: &PassManager) -> Outcome<()> {
        let mut ast = Ast::new();
        let program = ast.program(None, vec![], vec![], InputSpan::top_of_file());
        let params = Params::default();
        let options = CompilerOptions::default();
        let types = StaticTypeDatabase::new();
        let mut ctx = PassContext::new(&mut ast, program, &params, &options, &types);
        manager.run(&mut ctx)
    }

    #[test]
    fn diagnostics_accumulate_in_emission_order() {
        let ran = Rc::new(RefCell::new(Vec::new()));
        let mut manager = PassManager::new();

        let log = Rc::clone(&ran);
        manager.add(Pass::analysis("P1", move |_| {
            log.borrow_mut().push("P1");
            Outcome::success(()).with_warnings(vec![warning("w1"), warning("w2")])
        }));
        let log = Rc::clone(&ran);
        manager.add(Pass::analysis("P2", move |_| {
            log.borrow_mut().push("P2");
            Outcome::failure(vec![syntax_error("e1", InputSpan::top_of_file())])
                .with_warnings(vec![warning("w3")])
        }));
        let log = Rc::clone(&ran);
        manager.add(Pass::analysis("P3", move |_| {
            log.borrow_mut().push("P3");
            Outcome::success(())
        }));

        let outcome = run(&manager);
        assert_eq!(*ran.borrow(), vec!["P1", "P2"]);

        let errors: Vec<_> = outcome.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(errors, vec!["e1"]);
        let warnings: Vec<_> = outcome
            .warnings()
            .iter()
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(warnings, vec!["w1", "w2", "w3"]);
    }

    #[test]
    fn outputs_are_visible_to_later_passes() {
        struct Count(usize);

        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let mut manager = PassManager::new();
        manager
            .add(Pass::producing("Counter", |_| Outcome::success(Count(3))))
            .add(
                Pass::analysis("Reader", move |ctx| {
                    *sink.borrow_mut() = Some(ctx.get::<Count>().0);
                    Outcome::success(())
                })
                .requires::<Count>(),
            );

        assert!(run(&manager).is_ok());
        assert_eq!(*seen.borrow(), Some(3));
    }

    #[test]
    fn failed_producers_do_not_publish() {
        let mut manager = PassManager::new();
        manager.add(Pass::producing::<Y>("Fails", |_| {
            Outcome::failure(vec![syntax_error("no", InputSpan::top_of_file())])
        }));

        let mut ast = Ast::new();
        let program = ast.program(None, vec![], vec![], InputSpan::top_of_file());
        let params = Params::default();
        let options = CompilerOptions::default();
        let types = StaticTypeDatabase::new();
        let mut ctx = PassContext::new(&mut ast, program, &params, &options, &types);

        assert!(!manager.run(&mut ctx).is_ok());
        assert!(ctx.try_get::<Y>().is_none());
    }

    #[test]
    fn dependency_graph_links_producers_to_consumers() {
        let mut manager = PassManager::new();
        manager
            .add(produces_x())
            .add(Pass::analysis("B", |_| Outcome::success(())).requires::<X>())
            .add(Pass::analysis("C", |_| Outcome::success(())).requires::<X>());

        let graph = manager.dependency_graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.raw_edges().iter().all(|edge| edge.weight == "X"));
    }
}
