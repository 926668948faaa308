//! S-expression dumps of the tree, used by `tools ast` and in tests.

use super::*;
use crate::sexp_list;
use crate::utils::sexp::Sexp;

pub trait ToSexp {
    fn to_sexp(&self, ast: &Ast) -> Sexp;
}

impl ToSexp for Expression {
    fn to_sexp(&self, ast: &Ast) -> Sexp {
        match *self {
            Expression::Integer(id) => Sexp::int(ast[id].value),
            Expression::PositionalParameter(id) => match ast[id].param {
                ParameterRef::Index(index) => Sexp::str(format!("${}", index)),
                ParameterRef::Count => Sexp::str("$#"),
            },
            Expression::String(id) => Sexp::quoted(&ast[id].value),
            Expression::StackMode(id) => Sexp::str(ast[id].mode.to_string()),
            Expression::Identifier(id) => Sexp::str(ast[id].name.clone()),
            Expression::Builtin(id) => Sexp::str(ast[id].name.clone()),
            Expression::Call(id) => {
                let call = &ast[id];
                let mut elements = vec![Sexp::str("call"), Sexp::str(call.func.clone())];
                elements.extend(call.args.iter().map(|arg| arg.to_sexp(ast)));
                Sexp::List(elements)
            }
            Expression::Sizeof(id) => sexp_list!(Sexp::str("sizeof"), ast[id].arg.to_sexp(ast)),
            Expression::Offsetof(id) => {
                let offsetof = &ast[id];
                sexp_list!(
                    Sexp::str("offsetof"),
                    offsetof.record.to_sexp(ast),
                    Sexp::str(offsetof.field.clone())
                )
            }
            Expression::Map(id) => {
                let map = &ast[id];
                match map.key {
                    Some(key) => sexp_list!(Sexp::str(map.ident.clone()), key.to_sexp(ast)),
                    None => Sexp::str(map.ident.clone()),
                }
            }
            Expression::Variable(id) => Sexp::str(ast[id].ident.clone()),
            Expression::Binop(id) => {
                let binop = &ast[id];
                sexp_list!(
                    Sexp::str(binop.op.as_str()),
                    binop.left.to_sexp(ast),
                    binop.right.to_sexp(ast)
                )
            }
            Expression::Unop(id) => {
                let unop = &ast[id];
                let op = if unop.is_post_op {
                    format!("post{}", unop.op)
                } else {
                    unop.op.to_string()
                };
                sexp_list!(Sexp::str(op), unop.expr.to_sexp(ast))
            }
            Expression::FieldAccess(id) => {
                let access = &ast[id];
                let field = match &access.field {
                    FieldName::Named(name) => Sexp::str(name.clone()),
                    FieldName::Index(index) => Sexp::int(*index as i64),
                };
                sexp_list!(Sexp::str("."), access.expr.to_sexp(ast), field)
            }
            Expression::ArrayAccess(id) => {
                let access = &ast[id];
                sexp_list!(
                    Sexp::str("[]"),
                    access.expr.to_sexp(ast),
                    access.index.to_sexp(ast)
                )
            }
            Expression::Cast(id) => {
                let cast = &ast[id];
                sexp_list!(
                    Sexp::str("cast"),
                    Sexp::str(cast.cast_type.to_string()),
                    cast.expr.to_sexp(ast)
                )
            }
            Expression::Tuple(id) => {
                let mut elements = vec![Sexp::str("tuple")];
                elements.extend(ast[id].elems.iter().map(|elem| elem.to_sexp(ast)));
                Sexp::List(elements)
            }
            Expression::Ternary(id) => {
                let ternary = &ast[id];
                sexp_list!(
                    Sexp::str("?"),
                    ternary.cond.to_sexp(ast),
                    ternary.left.to_sexp(ast),
                    ternary.right.to_sexp(ast)
                )
            }
        }
    }
}

impl ToSexp for TypeOrExpr {
    fn to_sexp(&self, ast: &Ast) -> Sexp {
        match self {
            TypeOrExpr::Type(type_) => Sexp::str(type_.to_string()),
            TypeOrExpr::Expr(expr) => expr.to_sexp(ast),
        }
    }
}

impl ToSexp for Statement {
    fn to_sexp(&self, ast: &Ast) -> Sexp {
        match *self {
            Statement::Expr(id) => sexp_list!(Sexp::str("expr"), ast[id].expr.to_sexp(ast)),
            Statement::VarDecl(id) => {
                let decl = &ast[id];
                let mut elements = vec![Sexp::str("let"), Expression::from(decl.var).to_sexp(ast)];
                if let Some(ref type_) = decl.declared_type {
                    elements.push(Sexp::str(type_.to_string()));
                }
                Sexp::List(elements)
            }
            Statement::AssignMap(id) => {
                let assignment = &ast[id];
                sexp_list!(
                    Sexp::str("="),
                    Expression::from(assignment.map).to_sexp(ast),
                    assignment.expr.to_sexp(ast)
                )
            }
            Statement::AssignVar(id) => {
                let assignment = &ast[id];
                let op = if assignment.declaration.is_some() {
                    "let="
                } else {
                    "="
                };
                sexp_list!(
                    Sexp::str(op),
                    Expression::from(assignment.var).to_sexp(ast),
                    assignment.expr.to_sexp(ast)
                )
            }
            Statement::AssignConfigVar(id) => {
                let assignment = &ast[id];
                sexp_list!(
                    Sexp::str("set"),
                    Sexp::str(assignment.var.clone()),
                    assignment.expr.to_sexp(ast)
                )
            }
            Statement::Block(id) => stmts_sexp("block", &ast[id].stmts, ast),
            Statement::If(id) => {
                let if_ = &ast[id];
                let mut elements = vec![
                    Sexp::str("if"),
                    if_.cond.to_sexp(ast),
                    Statement::from(if_.if_block).to_sexp(ast),
                ];
                if let Some(else_block) = if_.else_block {
                    elements.push(Statement::from(else_block).to_sexp(ast));
                }
                Sexp::List(elements)
            }
            Statement::Unroll(id) => {
                let unroll = &ast[id];
                sexp_list!(
                    Sexp::str("unroll"),
                    unroll.expr.to_sexp(ast),
                    Statement::from(unroll.block).to_sexp(ast)
                )
            }
            Statement::Jump(id) => {
                let jump = &ast[id];
                let mut elements = vec![Sexp::str(jump.kind.to_string())];
                if let Some(value) = jump.return_value {
                    elements.push(value.to_sexp(ast));
                }
                Sexp::List(elements)
            }
            Statement::While(id) => {
                let while_ = &ast[id];
                sexp_list!(
                    Sexp::str("while"),
                    while_.cond.to_sexp(ast),
                    Statement::from(while_.block).to_sexp(ast)
                )
            }
            Statement::For(id) => {
                let for_ = &ast[id];
                sexp_list!(
                    Sexp::str("for"),
                    Expression::from(for_.decl).to_sexp(ast),
                    for_.expr.to_sexp(ast),
                    Statement::from(for_.block).to_sexp(ast)
                )
            }
            Statement::Config(id) => stmts_sexp("config", &ast[id].stmts, ast),
        }
    }
}

fn stmts_sexp(head: &str, stmts: &[Statement], ast: &Ast) -> Sexp {
    let mut elements = vec![Sexp::str(head)];
    elements.extend(stmts.iter().map(|stmt| stmt.to_sexp(ast)));
    Sexp::List(elements)
}

impl ToSexp for Id<Probe> {
    fn to_sexp(&self, ast: &Ast) -> Sexp {
        let probe = &ast[*self];
        let mut elements = vec![Sexp::str("probe"), Sexp::quoted(&probe.name(ast))];
        if let Some(pred) = probe.pred {
            elements.push(sexp_list!(
                Sexp::str("pred"),
                ast[pred].expr.to_sexp(ast)
            ));
        }
        elements.push(Statement::from(probe.block).to_sexp(ast));
        Sexp::List(elements)
    }
}

impl ToSexp for Id<Subprog> {
    fn to_sexp(&self, ast: &Ast) -> Sexp {
        let subprog = &ast[*self];
        let args = subprog
            .args
            .iter()
            .map(|arg| {
                let arg = &ast[*arg];
                sexp_list!(Sexp::str(arg.name.clone()), Sexp::str(arg.arg_type.to_string()))
            })
            .collect();
        let mut elements = vec![
            Sexp::str("fn"),
            Sexp::str(subprog.name.clone()),
            Sexp::str(subprog.return_type.to_string()),
            Sexp::List(args),
        ];
        elements.extend(subprog.stmts.iter().map(|stmt| stmt.to_sexp(ast)));
        Sexp::List(elements)
    }
}

impl ToSexp for Id<Program> {
    fn to_sexp(&self, ast: &Ast) -> Sexp {
        let program = &ast[*self];
        let mut elements = vec![Sexp::str("program")];
        elements.extend(program.functions.iter().map(|f| f.to_sexp(ast)));
        elements.extend(program.probes.iter().map(|p| p.to_sexp(ast)));
        if let Some(config) = program.config {
            elements.push(Statement::from(config).to_sexp(ast));
        }
        Sexp::List(elements)
    }
}
