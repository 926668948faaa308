//! Generic traversal and rewriting of the syntax tree.
//!
//! Every node kind has a `visit_*` method that passes may override, and a `walk_*` method
//! visiting the children of the node. Children are visited in the order listed on each
//! `walk_*` method, which is the order of the slots in the node. Every node is offered to
//! `pre_visit` before its children.
//!
//! Child expressions, statements and blocks are visited through slots: after a child has
//! been visited, the corresponding `replace_*` hook may return a different node, which is
//! then stored in the parent. List elements can be replaced individually, but the shape of a
//! list cannot change; a pass needing that replaces the owning block instead.

use super::*;
use crate::errors::Outcome;

/// Result of visiting a node, combined across children.
pub trait VisitOutput: Default {
    fn merge(self, other: Self) -> Self;
}

impl VisitOutput for () {
    fn merge(self, _other: ()) {}
}

/// First visited child wins.
impl VisitOutput for bool {
    fn merge(self, _other: bool) -> bool {
        self
    }
}

impl<T: Default> VisitOutput for Outcome<T> {
    fn merge(self, other: Outcome<T>) -> Outcome<T> {
        Outcome::merge(self, other)
    }
}

/// Merges outputs in order. An empty sequence yields the default output.
pub fn merge_all<R: VisitOutput>(outputs: impl IntoIterator<Item = R>) -> R {
    let mut outputs = outputs.into_iter();
    match outputs.next() {
        Some(first) => outputs.fold(first, R::merge),
        None => R::default(),
    }
}

pub trait Visitor {
    type Output: VisitOutput;

    fn ast(&mut self) -> &mut Ast;

    /// Called for every node before it is visited.
    fn pre_visit(&mut self, _node: NodeRef) {}

    fn replace_expr(&mut self, original: Expression, _result: &Self::Output) -> Expression {
        original
    }

    fn replace_stmt(&mut self, original: Statement, _result: &Self::Output) -> Statement {
        original
    }

    fn replace_block(&mut self, original: Id<Block>, _result: &Self::Output) -> Id<Block> {
        original
    }

    /// Traverses a whole program.
    fn visit(&mut self, program: Id<Program>) -> Self::Output {
        self.pre_visit(NodeRef::Program(program));
        self.visit_program(program)
    }

    fn visit_expr(&mut self, expr: Expression) -> Self::Output {
        self.pre_visit(NodeRef::Expression(expr));
        match expr {
            Expression::Integer(id) => self.visit_integer(id),
            Expression::PositionalParameter(id) => self.visit_positional_parameter(id),
            Expression::String(id) => self.visit_string(id),
            Expression::StackMode(id) => self.visit_stack_mode(id),
            Expression::Identifier(id) => self.visit_identifier(id),
            Expression::Builtin(id) => self.visit_builtin(id),
            Expression::Call(id) => self.visit_call(id),
            Expression::Sizeof(id) => self.visit_sizeof(id),
            Expression::Offsetof(id) => self.visit_offsetof(id),
            Expression::Map(id) => self.visit_map(id),
            Expression::Variable(id) => self.visit_variable(id),
            Expression::Binop(id) => self.visit_binop(id),
            Expression::Unop(id) => self.visit_unop(id),
            Expression::FieldAccess(id) => self.visit_field_access(id),
            Expression::ArrayAccess(id) => self.visit_array_access(id),
            Expression::Cast(id) => self.visit_cast(id),
            Expression::Tuple(id) => self.visit_tuple(id),
            Expression::Ternary(id) => self.visit_ternary(id),
        }
    }

    fn visit_stmt(&mut self, stmt: Statement) -> Self::Output {
        self.pre_visit(NodeRef::Statement(stmt));
        match stmt {
            Statement::Expr(id) => self.visit_expr_statement(id),
            Statement::VarDecl(id) => self.visit_var_decl(id),
            Statement::AssignMap(id) => self.visit_assign_map(id),
            Statement::AssignVar(id) => self.visit_assign_var(id),
            Statement::AssignConfigVar(id) => self.visit_assign_config_var(id),
            Statement::Block(id) => self.visit_block(id),
            Statement::If(id) => self.visit_if(id),
            Statement::Unroll(id) => self.visit_unroll(id),
            Statement::Jump(id) => self.visit_jump(id),
            Statement::While(id) => self.visit_while(id),
            Statement::For(id) => self.visit_for(id),
            Statement::Config(id) => self.visit_config(id),
        }
    }

    /// Visits `expr` and, if `replace_expr` substitutes it, hands the substitute to `store`.
    /// Back-links of the original node carry over to the substitute.
    fn visit_and_store<S>(&mut self, expr: Expression, store: S) -> Self::Output
    where
        S: FnOnce(&mut Ast, Expression),
    {
        let result = self.visit_expr(expr);
        let replacement = self.replace_expr(expr, &result);
        if replacement != expr {
            let ast = self.ast();
            let (key_for_map, map, var) = {
                let info = expr.info(ast);
                (info.key_for_map, info.map, info.var)
            };
            let info = replacement.info_mut(ast);
            info.key_for_map = info.key_for_map.or(key_for_map);
            info.map = info.map.or(map);
            info.var = info.var.or(var);

            store(ast, replacement);
            ast.invalidate_types();
        }
        result
    }

    fn visit_expr_slot<F>(&mut self, slot: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Expression,
    {
        let original = *slot(self.ast());
        self.visit_and_store(original, move |ast, replacement| *slot(ast) = replacement)
    }

    fn visit_opt_expr_slot<F>(&mut self, slot: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Option<Expression>,
    {
        let current = *slot(self.ast());
        match current {
            Some(original) => self.visit_and_store(original, move |ast, replacement| {
                *slot(ast) = Some(replacement)
            }),
            None => Self::Output::default(),
        }
    }

    fn visit_expr_list<F>(&mut self, list: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Vec<Expression>,
    {
        let len = list(self.ast()).len();
        let mut outputs = Vec::with_capacity(len);
        for i in 0..len {
            outputs.push(self.visit_expr_slot(|ast| &mut list(ast)[i]));
        }
        merge_all(outputs)
    }

    fn visit_stmt_slot<F>(&mut self, slot: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Statement,
    {
        let original = *slot(self.ast());
        let result = self.visit_stmt(original);
        let replacement = self.replace_stmt(original, &result);
        if replacement != original {
            *slot(self.ast()) = replacement;
            self.ast().invalidate_types();
        }
        result
    }

    fn visit_stmt_list<F>(&mut self, list: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Vec<Statement>,
    {
        let len = list(self.ast()).len();
        let mut outputs = Vec::with_capacity(len);
        for i in 0..len {
            outputs.push(self.visit_stmt_slot(|ast| &mut list(ast)[i]));
        }
        merge_all(outputs)
    }

    fn visit_block_slot<F>(&mut self, slot: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Id<Block>,
    {
        let original = *slot(self.ast());
        self.pre_visit(NodeRef::Statement(Statement::Block(original)));
        let result = self.visit_block(original);
        let replacement = self.replace_block(original, &result);
        if replacement != original {
            *slot(self.ast()) = replacement;
            self.ast().invalidate_types();
        }
        result
    }

    fn visit_opt_block_slot<F>(&mut self, slot: F) -> Self::Output
    where
        F: Fn(&mut Ast) -> &mut Option<Id<Block>>,
    {
        let current = *slot(self.ast());
        let original = match current {
            Some(original) => original,
            None => return Self::Output::default(),
        };
        self.pre_visit(NodeRef::Statement(Statement::Block(original)));
        let result = self.visit_block(original);
        let replacement = self.replace_block(original, &result);
        if replacement != original {
            *slot(self.ast()) = Some(replacement);
            self.ast().invalidate_types();
        }
        result
    }

    fn visit_integer(&mut self, _integer: Id<Integer>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_positional_parameter(&mut self, _param: Id<PositionalParameter>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_string(&mut self, _string: Id<StringLiteral>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_stack_mode(&mut self, _mode: Id<StackModeLiteral>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_identifier(&mut self, _identifier: Id<Identifier>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_builtin(&mut self, _builtin: Id<Builtin>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_call(&mut self, call: Id<Call>) -> Self::Output {
        self.walk_call(call)
    }

    /// Visits arguments, left to right.
    fn walk_call(&mut self, call: Id<Call>) -> Self::Output {
        self.visit_expr_list(|ast| &mut ast[call].args)
    }

    fn visit_sizeof(&mut self, sizeof: Id<Sizeof>) -> Self::Output {
        self.walk_sizeof(sizeof)
    }

    /// Visits the operand if it is an expression.
    fn walk_sizeof(&mut self, sizeof: Id<Sizeof>) -> Self::Output {
        let arg = match &self.ast()[sizeof].arg {
            TypeOrExpr::Expr(expr) => *expr,
            TypeOrExpr::Type(_) => return Self::Output::default(),
        };
        self.visit_and_store(arg, move |ast, replacement| {
            ast[sizeof].arg = TypeOrExpr::Expr(replacement)
        })
    }

    fn visit_offsetof(&mut self, offsetof: Id<Offsetof>) -> Self::Output {
        self.walk_offsetof(offsetof)
    }

    /// Visits the record operand if it is an expression.
    fn walk_offsetof(&mut self, offsetof: Id<Offsetof>) -> Self::Output {
        let record = match &self.ast()[offsetof].record {
            TypeOrExpr::Expr(expr) => *expr,
            TypeOrExpr::Type(_) => return Self::Output::default(),
        };
        self.visit_and_store(record, move |ast, replacement| {
            ast[offsetof].record = TypeOrExpr::Expr(replacement)
        })
    }

    fn visit_map(&mut self, map: Id<Map>) -> Self::Output {
        self.walk_map(map)
    }

    /// Visits the key.
    fn walk_map(&mut self, map: Id<Map>) -> Self::Output {
        self.visit_opt_expr_slot(|ast| &mut ast[map].key)
    }

    fn visit_variable(&mut self, _variable: Id<Variable>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_binop(&mut self, binop: Id<Binop>) -> Self::Output {
        self.walk_binop(binop)
    }

    /// Visits left, then right.
    fn walk_binop(&mut self, binop: Id<Binop>) -> Self::Output {
        let left = self.visit_expr_slot(|ast| &mut ast[binop].left);
        let right = self.visit_expr_slot(|ast| &mut ast[binop].right);
        left.merge(right)
    }

    fn visit_unop(&mut self, unop: Id<Unop>) -> Self::Output {
        self.walk_unop(unop)
    }

    fn walk_unop(&mut self, unop: Id<Unop>) -> Self::Output {
        self.visit_expr_slot(|ast| &mut ast[unop].expr)
    }

    fn visit_field_access(&mut self, access: Id<FieldAccess>) -> Self::Output {
        self.walk_field_access(access)
    }

    fn walk_field_access(&mut self, access: Id<FieldAccess>) -> Self::Output {
        self.visit_expr_slot(|ast| &mut ast[access].expr)
    }

    fn visit_array_access(&mut self, access: Id<ArrayAccess>) -> Self::Output {
        self.walk_array_access(access)
    }

    /// Visits the array, then the index.
    fn walk_array_access(&mut self, access: Id<ArrayAccess>) -> Self::Output {
        let expr = self.visit_expr_slot(|ast| &mut ast[access].expr);
        let index = self.visit_expr_slot(|ast| &mut ast[access].index);
        expr.merge(index)
    }

    fn visit_cast(&mut self, cast: Id<Cast>) -> Self::Output {
        self.walk_cast(cast)
    }

    fn walk_cast(&mut self, cast: Id<Cast>) -> Self::Output {
        self.visit_expr_slot(|ast| &mut ast[cast].expr)
    }

    fn visit_tuple(&mut self, tuple: Id<Tuple>) -> Self::Output {
        self.walk_tuple(tuple)
    }

    fn walk_tuple(&mut self, tuple: Id<Tuple>) -> Self::Output {
        self.visit_expr_list(|ast| &mut ast[tuple].elems)
    }

    fn visit_ternary(&mut self, ternary: Id<Ternary>) -> Self::Output {
        self.walk_ternary(ternary)
    }

    /// Visits the condition, then left, then right.
    fn walk_ternary(&mut self, ternary: Id<Ternary>) -> Self::Output {
        let cond = self.visit_expr_slot(|ast| &mut ast[ternary].cond);
        let left = self.visit_expr_slot(|ast| &mut ast[ternary].left);
        let right = self.visit_expr_slot(|ast| &mut ast[ternary].right);
        merge_all(vec![cond, left, right])
    }

    fn visit_expr_statement(&mut self, stmt: Id<ExprStatement>) -> Self::Output {
        self.walk_expr_statement(stmt)
    }

    fn walk_expr_statement(&mut self, stmt: Id<ExprStatement>) -> Self::Output {
        self.visit_expr_slot(|ast| &mut ast[stmt].expr)
    }

    fn visit_var_decl(&mut self, decl: Id<VarDeclStatement>) -> Self::Output {
        self.walk_var_decl(decl)
    }

    /// Visits the declared variable. It cannot be replaced.
    fn walk_var_decl(&mut self, decl: Id<VarDeclStatement>) -> Self::Output {
        let var = self.ast()[decl].var;
        self.visit_expr(var.into())
    }

    fn visit_assign_map(&mut self, assignment: Id<AssignMapStatement>) -> Self::Output {
        self.walk_assign_map(assignment)
    }

    /// Visits the assigned map, then the value. The map cannot be replaced.
    fn walk_assign_map(&mut self, assignment: Id<AssignMapStatement>) -> Self::Output {
        let map = self.ast()[assignment].map;
        let target = self.visit_expr(map.into());
        let value = self.visit_expr_slot(|ast| &mut ast[assignment].expr);
        target.merge(value)
    }

    fn visit_assign_var(&mut self, assignment: Id<AssignVarStatement>) -> Self::Output {
        self.walk_assign_var(assignment)
    }

    /// Visits the assigned variable, then the value. The variable cannot be replaced.
    fn walk_assign_var(&mut self, assignment: Id<AssignVarStatement>) -> Self::Output {
        let var = self.ast()[assignment].var;
        let target = self.visit_expr(var.into());
        let value = self.visit_expr_slot(|ast| &mut ast[assignment].expr);
        target.merge(value)
    }

    fn visit_assign_config_var(
        &mut self,
        assignment: Id<AssignConfigVarStatement>,
    ) -> Self::Output {
        self.walk_assign_config_var(assignment)
    }

    fn walk_assign_config_var(
        &mut self,
        assignment: Id<AssignConfigVarStatement>,
    ) -> Self::Output {
        self.visit_expr_slot(|ast| &mut ast[assignment].expr)
    }

    fn visit_block(&mut self, block: Id<Block>) -> Self::Output {
        self.walk_block(block)
    }

    fn walk_block(&mut self, block: Id<Block>) -> Self::Output {
        self.visit_stmt_list(|ast| &mut ast[block].stmts)
    }

    fn visit_if(&mut self, if_: Id<If>) -> Self::Output {
        self.walk_if(if_)
    }

    /// Visits the condition, then the `if` block, then the `else` block.
    fn walk_if(&mut self, if_: Id<If>) -> Self::Output {
        let cond = self.visit_expr_slot(|ast| &mut ast[if_].cond);
        let if_block = self.visit_block_slot(|ast| &mut ast[if_].if_block);
        let else_block = self.visit_opt_block_slot(|ast| &mut ast[if_].else_block);
        merge_all(vec![cond, if_block, else_block])
    }

    fn visit_unroll(&mut self, unroll: Id<Unroll>) -> Self::Output {
        self.walk_unroll(unroll)
    }

    /// Visits the count, then the body.
    fn walk_unroll(&mut self, unroll: Id<Unroll>) -> Self::Output {
        let count = self.visit_expr_slot(|ast| &mut ast[unroll].expr);
        let block = self.visit_block_slot(|ast| &mut ast[unroll].block);
        count.merge(block)
    }

    fn visit_jump(&mut self, jump: Id<Jump>) -> Self::Output {
        self.walk_jump(jump)
    }

    fn walk_jump(&mut self, jump: Id<Jump>) -> Self::Output {
        self.visit_opt_expr_slot(|ast| &mut ast[jump].return_value)
    }

    fn visit_while(&mut self, while_: Id<While>) -> Self::Output {
        self.walk_while(while_)
    }

    /// Visits the condition, then the body.
    fn walk_while(&mut self, while_: Id<While>) -> Self::Output {
        let cond = self.visit_expr_slot(|ast| &mut ast[while_].cond);
        let block = self.visit_block_slot(|ast| &mut ast[while_].block);
        cond.merge(block)
    }

    fn visit_for(&mut self, for_: Id<For>) -> Self::Output {
        self.walk_for(for_)
    }

    /// Visits the loop variable, then the iterated map, then the body.
    fn walk_for(&mut self, for_: Id<For>) -> Self::Output {
        let decl = self.ast()[for_].decl;
        let decl = self.visit_expr(decl.into());
        let expr = self.visit_expr_slot(|ast| &mut ast[for_].expr);
        let block = self.visit_block_slot(|ast| &mut ast[for_].block);
        merge_all(vec![decl, expr, block])
    }

    fn visit_config(&mut self, config: Id<Config>) -> Self::Output {
        self.walk_config(config)
    }

    fn walk_config(&mut self, config: Id<Config>) -> Self::Output {
        self.visit_stmt_list(|ast| &mut ast[config].stmts)
    }

    fn visit_predicate(&mut self, predicate: Id<Predicate>) -> Self::Output {
        self.walk_predicate(predicate)
    }

    fn walk_predicate(&mut self, predicate: Id<Predicate>) -> Self::Output {
        self.visit_expr_slot(|ast| &mut ast[predicate].expr)
    }

    fn visit_attach_point(&mut self, _attach_point: Id<AttachPoint>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_probe(&mut self, probe: Id<Probe>) -> Self::Output {
        self.walk_probe(probe)
    }

    /// Visits attach points, then the predicate, then the body.
    fn walk_probe(&mut self, probe: Id<Probe>) -> Self::Output {
        let mut outputs = Vec::new();
        let attach_points = self.ast()[probe].attach_points.clone();
        for attach_point in attach_points {
            self.pre_visit(NodeRef::AttachPoint(attach_point));
            outputs.push(self.visit_attach_point(attach_point));
        }
        if let Some(predicate) = self.ast()[probe].pred {
            self.pre_visit(NodeRef::Predicate(predicate));
            outputs.push(self.visit_predicate(predicate));
        }
        outputs.push(self.visit_block_slot(|ast| &mut ast[probe].block));
        merge_all(outputs)
    }

    fn visit_subprog_arg(&mut self, _arg: Id<SubprogArg>) -> Self::Output {
        Self::Output::default()
    }

    fn visit_subprog(&mut self, subprog: Id<Subprog>) -> Self::Output {
        self.walk_subprog(subprog)
    }

    /// Visits arguments, then statements.
    fn walk_subprog(&mut self, subprog: Id<Subprog>) -> Self::Output {
        let mut outputs = Vec::new();
        let args = self.ast()[subprog].args.clone();
        for arg in args {
            self.pre_visit(NodeRef::SubprogArg(arg));
            outputs.push(self.visit_subprog_arg(arg));
        }
        outputs.push(self.visit_stmt_list(|ast| &mut ast[subprog].stmts));
        merge_all(outputs)
    }

    fn visit_program(&mut self, program: Id<Program>) -> Self::Output {
        self.walk_program(program)
    }

    /// Visits functions, then probes, then the config block.
    fn walk_program(&mut self, program: Id<Program>) -> Self::Output {
        let mut outputs = Vec::new();
        let functions = self.ast()[program].functions.clone();
        for function in functions {
            self.pre_visit(NodeRef::Subprog(function));
            outputs.push(self.visit_subprog(function));
        }
        let probes = self.ast()[program].probes.clone();
        for probe in probes {
            self.pre_visit(NodeRef::Probe(probe));
            outputs.push(self.visit_probe(probe));
        }
        if let Some(config) = self.ast()[program].config {
            self.pre_visit(NodeRef::Statement(Statement::Config(config)));
            outputs.push(self.visit_config(config));
        }
        merge_all(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InputSpan;

    fn loc() -> InputSpan {
        InputSpan::top_of_file()
    }

    /// `kprobe:f { @m[1 + 2] = 3; print(4, 5); }`
    fn sample(ast: &mut Ast) -> Id<Program> {
        let one = ast.integer(1, loc());
        let two = ast.integer(2, loc());
        let key = ast.binop(one, Operator::Plus, two, loc());
        let map = ast.map("@m", Some(key), loc());
        let three = ast.integer(3, loc());
        let assignment = ast.assign_map(map, three, loc());

        let four = ast.integer(4, loc());
        let five = ast.integer(5, loc());
        let call = ast.call("print", vec![four, five], loc());
        let call = ast.expr_statement(call, loc());

        let block = ast.block(vec![assignment, call], loc());
        let ap = AttachPoint::parse("kprobe:f", loc()).unwrap();
        let ap = ast.make_node(ap);
        let probe = ast.probe(vec![ap], None, block, loc());
        ast.program(None, vec![], vec![probe], loc())
    }

    struct Recorder<'a> {
        ast: &'a mut Ast,
        integers: Vec<i64>,
        kinds: Vec<&'static str>,
    }

    impl<'a> Visitor for Recorder<'a> {
        type Output = ();

        fn ast(&mut self) -> &mut Ast {
            self.ast
        }

        fn pre_visit(&mut self, node: NodeRef) {
            self.kinds.push(match node {
                NodeRef::Program(_) => "program",
                NodeRef::Probe(_) => "probe",
                NodeRef::AttachPoint(_) => "attach_point",
                NodeRef::Statement(_) => "statement",
                NodeRef::Expression(_) => "expression",
                _ => "other",
            });
        }

        fn visit_integer(&mut self, integer: Id<Integer>) {
            let value = self.ast[integer].value;
            self.integers.push(value);
        }
    }

    #[test]
    fn children_are_visited_in_slot_order() {
        let mut ast = Ast::new();
        let program = sample(&mut ast);
        let mut recorder = Recorder {
            ast: &mut ast,
            integers: Vec::new(),
            kinds: Vec::new(),
        };
        recorder.visit(program);

        assert_eq!(recorder.integers, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            &recorder.kinds[..5],
            &["program", "probe", "attach_point", "statement", "statement"]
        );
        // map, binop, 1, 2, 3, call, 4, 5
        let expressions = recorder
            .kinds
            .iter()
            .filter(|kind| **kind == "expression")
            .count();
        assert_eq!(expressions, 8);
    }

    /// Replaces every integer literal with its double.
    struct Doubler<'a> {
        ast: &'a mut Ast,
    }

    impl<'a> Visitor for Doubler<'a> {
        type Output = ();

        fn ast(&mut self) -> &mut Ast {
            self.ast
        }

        fn replace_expr(&mut self, original: Expression, _result: &()) -> Expression {
            match original {
                Expression::Integer(id) => {
                    let value = self.ast[id].value * 2;
                    let loc = self.ast[id].info.loc;
                    self.ast.integer(value, loc)
                }
                other => other,
            }
        }
    }

    #[test]
    fn replacements_are_stored_in_parents() {
        let mut ast = Ast::new();
        let program = sample(&mut ast);
        Doubler { ast: &mut ast }.visit(program);

        let mut recorder = Recorder {
            ast: &mut ast,
            integers: Vec::new(),
            kinds: Vec::new(),
        };
        recorder.visit(program);
        assert_eq!(recorder.integers, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn replacements_keep_back_links() {
        let mut ast = Ast::new();
        let key = ast.integer(7, loc());
        let map = ast.map("@m", Some(key), loc());
        let value = ast.integer(1, loc());
        let stmt = ast.assign_map(map, value, loc());
        let block = ast.block(vec![stmt], loc());
        let probe = ast.probe(vec![], None, block, loc());
        let program = ast.program(None, vec![], vec![probe], loc());

        Doubler { ast: &mut ast }.visit(program);

        let new_key = ast[map].key.unwrap();
        assert_ne!(new_key, key);
        assert_eq!(new_key.info(&ast).key_for_map, Some(map));

        let assignment = match stmt {
            Statement::AssignMap(id) => id,
            other => panic!("unexpected {:?}", other),
        };
        let new_value = ast[assignment].expr;
        assert_eq!(new_value.info(&ast).map, Some(map));
    }

    /// Reports every integer literal above 2 as an error.
    struct LargeIntegers<'a> {
        ast: &'a mut Ast,
    }

    impl<'a> Visitor for LargeIntegers<'a> {
        type Output = Outcome<()>;

        fn ast(&mut self) -> &mut Ast {
            self.ast
        }

        fn visit_integer(&mut self, integer: Id<Integer>) -> Outcome<()> {
            let value = self.ast[integer].value;
            if value > 2 {
                let error = crate::errors::syntax_error(value.to_string(), loc());
                Outcome::failure(vec![error])
            } else {
                Outcome::success(())
            }
        }
    }

    #[test]
    fn outcomes_aggregate_every_error_in_order() {
        let mut ast = Ast::new();
        let program = sample(&mut ast);
        let outcome = LargeIntegers { ast: &mut ast }.visit(program);

        let messages: Vec<_> = outcome.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["3", "4", "5"]);
    }
}
