//! Construction helpers keeping node invariants, such as the back-links between map keys,
//! assigned values and their maps or variables.

use super::*;
use crate::config::StackMode;
use crate::source::InputSpan;
use crate::typing::Type;

impl Ast {
    pub fn integer(&mut self, value: i64, loc: InputSpan) -> Expression {
        self.make_node(Integer {
            info: ExprInfo::fixed(loc, Type::int64()),
            value,
        })
        .into()
    }

    /// `type_` depends on the parameter value and is decided by the caller.
    pub fn positional_parameter(
        &mut self,
        param: ParameterRef,
        type_: Type,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(PositionalParameter {
            info: ExprInfo::fixed(loc, type_),
            param,
        })
        .into()
    }

    pub fn string(&mut self, value: impl Into<String>, loc: InputSpan) -> Expression {
        let value = value.into();
        self.make_node(StringLiteral {
            info: ExprInfo::fixed(loc, Type::string(value.len() + 1)),
            value,
        })
        .into()
    }

    pub fn stack_mode(&mut self, mode: StackMode, loc: InputSpan) -> Expression {
        self.make_node(StackModeLiteral {
            info: ExprInfo::fixed(loc, Type::StackMode),
            mode,
        })
        .into()
    }

    pub fn identifier(&mut self, name: impl Into<String>, loc: InputSpan) -> Expression {
        self.make_node(Identifier {
            info: ExprInfo::bound(loc),
            name: name.into(),
        })
        .into()
    }

    pub fn builtin(&mut self, name: impl Into<String>, loc: InputSpan) -> Expression {
        self.make_node(Builtin {
            info: ExprInfo::bound(loc),
            name: name.into(),
        })
        .into()
    }

    pub fn call(
        &mut self,
        func: impl Into<String>,
        args: Vec<Expression>,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(Call {
            info: ExprInfo::bound(loc),
            func: func.into(),
            args,
        })
        .into()
    }

    pub fn sizeof(&mut self, arg: TypeOrExpr, loc: InputSpan) -> Expression {
        self.make_node(Sizeof {
            info: ExprInfo::fixed(loc, Type::uint64()),
            arg,
        })
        .into()
    }

    pub fn offsetof(
        &mut self,
        record: TypeOrExpr,
        field: impl Into<String>,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(Offsetof {
            info: ExprInfo::fixed(loc, Type::uint64()),
            record,
            field: field.into(),
        })
        .into()
    }

    pub fn map(
        &mut self,
        ident: impl Into<String>,
        key: Option<Expression>,
        loc: InputSpan,
    ) -> Id<Map> {
        let map = self.make_node(Map {
            info: ExprInfo::bound(loc),
            ident: ident.into(),
            key,
        });
        if let Some(key) = key {
            key.info_mut(self).key_for_map = Some(map);
        }
        map
    }

    pub fn variable(&mut self, ident: impl Into<String>, loc: InputSpan) -> Id<Variable> {
        self.make_node(Variable {
            info: ExprInfo::bound(loc),
            ident: ident.into(),
        })
    }

    pub fn binop(
        &mut self,
        left: Expression,
        op: Operator,
        right: Expression,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(Binop {
            info: ExprInfo::derived(loc),
            left,
            op,
            right,
        })
        .into()
    }

    pub fn unop(
        &mut self,
        op: Operator,
        expr: Expression,
        is_post_op: bool,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(Unop {
            info: ExprInfo::derived(loc),
            op,
            expr,
            is_post_op,
        })
        .into()
    }

    pub fn field_access(
        &mut self,
        expr: Expression,
        field: FieldName,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(FieldAccess {
            info: ExprInfo::derived(loc),
            expr,
            field,
        })
        .into()
    }

    pub fn array_access(
        &mut self,
        expr: Expression,
        index: Expression,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(ArrayAccess {
            info: ExprInfo::derived(loc),
            expr,
            index,
        })
        .into()
    }

    pub fn cast(&mut self, cast_type: Type, expr: Expression, loc: InputSpan) -> Expression {
        self.make_node(Cast {
            info: ExprInfo::fixed(loc, cast_type.clone()),
            cast_type,
            expr,
        })
        .into()
    }

    pub fn tuple(&mut self, elems: Vec<Expression>, loc: InputSpan) -> Expression {
        self.make_node(Tuple {
            info: ExprInfo::derived(loc),
            elems,
        })
        .into()
    }

    pub fn ternary(
        &mut self,
        cond: Expression,
        left: Expression,
        right: Expression,
        loc: InputSpan,
    ) -> Expression {
        self.make_node(Ternary {
            info: ExprInfo::derived(loc),
            cond,
            left,
            right,
        })
        .into()
    }

    pub fn expr_statement(&mut self, expr: Expression, loc: InputSpan) -> Statement {
        self.make_node(ExprStatement { loc, expr }).into()
    }

    pub fn var_decl(
        &mut self,
        var: Id<Variable>,
        declared_type: Option<Type>,
        loc: InputSpan,
    ) -> Id<VarDeclStatement> {
        self.make_node(VarDeclStatement {
            loc,
            var,
            declared_type,
        })
    }

    pub fn assign_map(&mut self, map: Id<Map>, expr: Expression, loc: InputSpan) -> Statement {
        expr.info_mut(self).map = Some(map);
        self.make_node(AssignMapStatement { loc, map, expr }).into()
    }

    pub fn assign_var(
        &mut self,
        var: Id<Variable>,
        expr: Expression,
        declaration: Option<Id<VarDeclStatement>>,
        loc: InputSpan,
    ) -> Statement {
        expr.info_mut(self).var = Some(var);
        self.make_node(AssignVarStatement {
            loc,
            var,
            expr,
            declaration,
        })
        .into()
    }

    pub fn assign_config_var(
        &mut self,
        var: impl Into<String>,
        expr: Expression,
        loc: InputSpan,
    ) -> Statement {
        self.make_node(AssignConfigVarStatement {
            loc,
            var: var.into(),
            expr,
        })
        .into()
    }

    pub fn block(&mut self, stmts: Vec<Statement>, loc: InputSpan) -> Id<Block> {
        self.make_node(Block { loc, stmts })
    }

    pub fn if_statement(
        &mut self,
        cond: Expression,
        if_block: Id<Block>,
        else_block: Option<Id<Block>>,
        loc: InputSpan,
    ) -> Statement {
        self.make_node(If {
            loc,
            cond,
            if_block,
            else_block,
        })
        .into()
    }

    pub fn unroll(&mut self, expr: Expression, block: Id<Block>, loc: InputSpan) -> Statement {
        self.make_node(Unroll { loc, expr, block }).into()
    }

    pub fn jump(
        &mut self,
        kind: JumpKind,
        return_value: Option<Expression>,
        loc: InputSpan,
    ) -> Statement {
        self.make_node(Jump {
            loc,
            kind,
            return_value,
        })
        .into()
    }

    pub fn while_loop(&mut self, cond: Expression, block: Id<Block>, loc: InputSpan) -> Statement {
        self.make_node(While { loc, cond, block }).into()
    }

    pub fn for_loop(
        &mut self,
        decl: Id<Variable>,
        expr: Expression,
        block: Id<Block>,
        loc: InputSpan,
    ) -> Statement {
        self.make_node(For {
            loc,
            decl,
            expr,
            block,
        })
        .into()
    }

    pub fn config(&mut self, stmts: Vec<Statement>, loc: InputSpan) -> Id<Config> {
        self.make_node(Config { loc, stmts })
    }

    pub fn predicate(&mut self, expr: Expression, loc: InputSpan) -> Id<Predicate> {
        self.make_node(Predicate { loc, expr })
    }

    pub fn probe(
        &mut self,
        attach_points: Vec<Id<AttachPoint>>,
        pred: Option<Id<Predicate>>,
        block: Id<Block>,
        loc: InputSpan,
    ) -> Id<Probe> {
        self.make_node(Probe {
            loc,
            attach_points,
            pred,
            block,
            index: 0,
        })
    }

    pub fn subprog_arg(
        &mut self,
        name: impl Into<String>,
        arg_type: Type,
        loc: InputSpan,
    ) -> Id<SubprogArg> {
        self.make_node(SubprogArg {
            loc,
            name: name.into(),
            arg_type,
        })
    }

    pub fn subprog(
        &mut self,
        name: impl Into<String>,
        return_type: Type,
        args: Vec<Id<SubprogArg>>,
        stmts: Vec<Statement>,
        loc: InputSpan,
    ) -> Id<Subprog> {
        self.make_node(Subprog {
            loc,
            name: name.into(),
            return_type,
            args,
            stmts,
        })
    }

    pub fn program(
        &mut self,
        config: Option<Id<Config>>,
        functions: Vec<Id<Subprog>>,
        probes: Vec<Id<Probe>>,
        loc: InputSpan,
    ) -> Id<Program> {
        self.make_node(Program {
            loc,
            config,
            functions,
            probes,
        })
    }
}
