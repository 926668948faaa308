//! Type rules of expressions.

use std::rc::Rc;

use super::deferred::TypeSlot;
use super::{Type, TypeBinding, TypeError, TypeResult};
use crate::ast::{Ast, Expression, FieldName, Operator};

impl Ast {
    /// Type of `expr`, evaluated on first access and memoized until the tree changes.
    /// Repeated calls without intervening changes return the same object.
    pub fn type_of(&self, expr: impl Into<Expression>) -> Rc<TypeResult> {
        let expr = expr.into();
        match &expr.info(self).ty {
            TypeSlot::Fixed(result) => Rc::clone(result),
            TypeSlot::Bound { binding, thunk } => thunk.force(self.generation, || match binding {
                Some(binding) => binding.evaluate(self),
                None => Err(TypeError::unknown()),
            }),
            TypeSlot::Derived(thunk) => thunk.force(self.generation, || self.derive_type(expr)),
        }
    }

    pub fn resolved_type(&self, expr: impl Into<Expression>) -> TypeResult {
        (*self.type_of(expr)).clone()
    }

    /// Binds the type of an identifier, builtin, call, map or variable.
    ///
    /// Binding any other expression kind is a compiler defect and aborts.
    pub fn set_type(&mut self, expr: impl Into<Expression>, binding: TypeBinding) {
        let expr = expr.into();
        match &mut expr.info_mut(self).ty {
            TypeSlot::Bound { binding: slot, .. } => *slot = Some(binding),
            _ => panic!("type of {:?} cannot be bound", expr),
        }
        self.invalidate_types();
    }

    pub fn has_type_binding(&self, expr: impl Into<Expression>) -> bool {
        match &expr.into().info(self).ty {
            TypeSlot::Bound { binding, .. } => binding.is_some(),
            _ => false,
        }
    }

    fn derive_type(&self, expr: Expression) -> TypeResult {
        match expr {
            Expression::Binop(id) => {
                let binop = &self[id];
                let left = self.resolved_type(binop.left)?;
                let right = self.resolved_type(binop.right)?;
                binop_type(binop.op, &left, &right)
            }
            Expression::Unop(id) => {
                let unop = &self[id];
                let operand = self.resolved_type(unop.expr)?;
                match unop.op {
                    Operator::LNot => Ok(Type::Bool),
                    Operator::Mul => operand.pointee().cloned().ok_or_else(|| {
                        TypeError::invalid(format!("invalid dereference of type {}", operand))
                    }),
                    _ => Ok(operand),
                }
            }
            Expression::Ternary(id) => {
                let ternary = &self[id];
                self.resolved_type(ternary.cond)?;
                let left = self.resolved_type(ternary.left)?;
                let right = self.resolved_type(ternary.right)?;
                if left != right {
                    return Err(TypeError::invalid(format!(
                        "ternary type mismatch, left type is {}, right type is {}",
                        left, right
                    )));
                }
                Ok(left)
            }
            Expression::FieldAccess(id) => {
                let access = &self[id];
                let operand = self.resolved_type(access.expr)?;
                field_type(&operand, &access.field)
            }
            Expression::ArrayAccess(id) => {
                let access = &self[id];
                let operand = self.resolved_type(access.expr)?;
                let index = self.resolved_type(access.index)?;
                if !index.is_integer() {
                    return Err(TypeError::invalid(format!(
                        "array index must be an integer, not {}",
                        index
                    )));
                }
                match operand {
                    Type::Array { element, .. } => Ok(*element),
                    Type::Pointer(pointee) => Ok(*pointee),
                    other => Err(TypeError::invalid(format!(
                        "type {} not legal for array access",
                        other
                    ))),
                }
            }
            Expression::Tuple(id) => {
                let mut elements = Vec::new();
                for elem in &self[id].elems {
                    let element = self.resolved_type(*elem)?;
                    if element.is_multi_output() {
                        return Err(TypeError::invalid(format!(
                            "map type {} cannot exist inside a tuple",
                            element
                        )));
                    }
                    elements.push(element);
                }
                Ok(Type::Tuple(elements))
            }
            _ => Err(TypeError::unknown()),
        }
    }
}

fn binop_type(op: Operator, left: &Type, right: &Type) -> TypeResult {
    if left.is_array() || right.is_array() {
        return array_comparison_type(op, left, right);
    }

    let mismatch = || {
        TypeError::invalid(format!(
            "type mismatch for '{}': comparing '{}' with '{}'",
            op, left, right
        ))
    };

    if op.is_comparison() {
        let comparable = (left.is_integer() && right.is_integer())
            || (left.is_string() && right.is_string())
            || (left.is_pointer() && (right.is_pointer() || right.is_integer()))
            || (left.is_integer() && right.is_pointer());
        return if comparable {
            Ok(Type::Bool)
        } else {
            Err(mismatch())
        };
    }

    if op.is_logical() {
        let truthy = |type_: &Type| type_.is_integer() || type_.is_pointer();
        return if truthy(left) && truthy(right) {
            Ok(Type::Bool)
        } else {
            Err(mismatch())
        };
    }

    match (left, right) {
        (Type::String { size: l }, Type::String { size: r }) if op == Operator::Plus => {
            Ok(Type::string(l + r - 1))
        }
        (l, r) if l.is_integer() && r.is_integer() => Ok(Type::Integer {
            bits: 64,
            signed: l.is_signed() || r.is_signed(),
        }),
        (Type::Pointer(_), r) if r.is_integer() && is_additive(op) => Ok(left.clone()),
        (l, Type::Pointer(_)) if l.is_integer() && op == Operator::Plus => Ok(right.clone()),
        _ => Err(mismatch()),
    }
}

fn is_additive(op: Operator) -> bool {
    op == Operator::Plus || op == Operator::Minus
}

fn array_comparison_type(op: Operator, left: &Type, right: &Type) -> TypeResult {
    if op != Operator::Eq && op != Operator::Ne {
        return Err(TypeError::invalid(format!(
            "operator '{}' cannot be applied to arrays",
            op
        )));
    }

    match (left, right) {
        (
            Type::Array {
                element: left_element,
                len: left_len,
            },
            Type::Array {
                element: right_element,
                len: right_len,
            },
        ) => {
            if !left_element.is_integer() || left_element != right_element {
                Err(TypeError::invalid(
                    "Only arrays of same sized integer support comparison operators.",
                ))
            } else if left_len != right_len {
                Err(TypeError::invalid(
                    "Only arrays of same size support comparison operators.",
                ))
            } else {
                Ok(Type::Bool)
            }
        }
        _ => Err(TypeError::invalid(format!(
            "type mismatch for '{}': comparing '{}' with '{}'",
            op, left, right
        ))),
    }
}

fn field_type(operand: &Type, field: &FieldName) -> TypeResult {
    match (operand, field) {
        (Type::Record(record), FieldName::Named(name)) => {
            if !record.is_resolved() {
                return Err(TypeError::unresolved(format!(
                    "{} has not been resolved",
                    record.name()
                )));
            }
            record.field(name).map(|field| field.type_).ok_or_else(|| {
                TypeError::invalid(format!("field {} not found on type {}", name, operand))
            })
        }
        (Type::Tuple(elements), FieldName::Index(index)) => {
            elements.get(*index).cloned().ok_or_else(|| {
                TypeError::invalid(format!(
                    "tuple index {} out of range for type {}",
                    index, operand
                ))
            })
        }
        _ => Err(TypeError::invalid(format!(
            "field access on non-record type {}",
            operand
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InputSpan;
    use crate::typing::{Aggregate, Field, Record, TypeErrorKind};

    fn loc() -> InputSpan {
        InputSpan::top_of_file()
    }

    fn error_of(ast: &Ast, expr: impl Into<Expression>) -> TypeError {
        ast.resolved_type(expr).unwrap_err()
    }

    #[test]
    fn repeated_resolution_returns_the_same_object() {
        let mut ast = Ast::new();
        let left = ast.integer(1, loc());
        let right = ast.integer(2, loc());
        let sum = ast.binop(left, Operator::Plus, right, loc());

        let first = ast.type_of(sum);
        let second = ast.type_of(sum);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(*first, Ok(Type::int64()));
    }

    #[test]
    fn mutual_references_are_cyclic() {
        let mut ast = Ast::new();
        let a = ast.variable("$a", loc());
        let b = ast.variable("$b", loc());
        ast.set_type(a, TypeBinding::SameAs(b.into()));
        ast.set_type(b, TypeBinding::SameAs(a.into()));

        assert_eq!(error_of(&ast, a).kind, TypeErrorKind::Cyclic);
        assert_eq!(error_of(&ast, b).kind, TypeErrorKind::Cyclic);
    }

    #[test]
    fn self_referential_thunk_is_cyclic() {
        let mut ast = Ast::new();
        let var = ast.variable("$x", loc());
        ast.set_type(
            var,
            TypeBinding::computed(move |ast| ast.resolved_type(var)),
        );

        assert_eq!(error_of(&ast, var).kind, TypeErrorKind::Cyclic);
    }

    #[test]
    fn unbound_types_are_unknown() {
        let mut ast = Ast::new();
        let map = ast.map("@m", None, loc());
        let one = ast.integer(1, loc());
        let sum = ast.binop(map.into(), Operator::Plus, one, loc());

        let error = error_of(&ast, sum);
        assert_eq!(error.kind, TypeErrorKind::Unknown);
        assert_eq!(error.message, "unknown type");
    }

    #[test]
    fn binding_invalidates_memoized_types() {
        let mut ast = Ast::new();
        let var = ast.variable("$x", loc());
        let one = ast.integer(1, loc());
        let sum = ast.binop(var.into(), Operator::Plus, one, loc());
        assert!(ast.resolved_type(sum).is_err());

        ast.set_type(var, TypeBinding::Known(Type::uint(32)));
        assert_eq!(ast.resolved_type(sum), Ok(Type::int64()));
    }

    #[test]
    fn comparisons_yield_truth_values() {
        let mut ast = Ast::new();
        let left = ast.string("a", loc());
        let right = ast.string("bc", loc());
        let eq = ast.binop(left, Operator::Eq, right, loc());
        assert_eq!(ast.resolved_type(eq), Ok(Type::Bool));

        let not = ast.unop(Operator::LNot, eq, false, loc());
        assert_eq!(ast.resolved_type(not), Ok(Type::Bool));
    }

    #[test]
    fn string_concatenation_sums_sizes() {
        let mut ast = Ast::new();
        let left = ast.string("ab", loc());
        let right = ast.string("c", loc());
        let concat = ast.binop(left, Operator::Plus, right, loc());
        assert_eq!(ast.resolved_type(concat), Ok(Type::string(4)));
    }

    #[test]
    fn mismatched_operands_are_rejected() {
        let mut ast = Ast::new();
        let left = ast.string("a", loc());
        let right = ast.integer(1, loc());
        let sum = ast.binop(left, Operator::Plus, right, loc());
        assert_eq!(
            error_of(&ast, sum).message,
            "type mismatch for '+': comparing 'string[2]' with 'int64'"
        );
    }

    #[test]
    fn arrays_compare_only_with_equality() {
        let mut ast = Ast::new();
        let array = |ast: &mut Ast, element: Type, len: usize| {
            let var = ast.variable("$a", loc());
            ast.set_type(var, TypeBinding::Known(Type::array_of(element, len)));
            Expression::from(var)
        };

        let a = array(&mut ast, Type::int(8), 4);
        let b = array(&mut ast, Type::int(8), 4);
        let eq = ast.binop(a, Operator::Eq, b, loc());
        assert_eq!(ast.resolved_type(eq), Ok(Type::Bool));

        let c = array(&mut ast, Type::int(8), 4);
        let d = array(&mut ast, Type::int(8), 8);
        let eq = ast.binop(c, Operator::Eq, d, loc());
        assert_eq!(
            error_of(&ast, eq).message,
            "Only arrays of same size support comparison operators."
        );

        let e = array(&mut ast, Type::int(8), 4);
        let f = array(&mut ast, Type::int(16), 4);
        let ne = ast.binop(e, Operator::Ne, f, loc());
        assert_eq!(
            error_of(&ast, ne).message,
            "Only arrays of same sized integer support comparison operators."
        );

        let g = array(&mut ast, Type::int(8), 4);
        let h = array(&mut ast, Type::int(8), 4);
        let lt = ast.binop(g, Operator::Lt, h, loc());
        assert!(ast.resolved_type(lt).is_err());
    }

    #[test]
    fn dereference_requires_pointer() {
        let mut ast = Ast::new();
        let ptr = ast.variable("$p", loc());
        ast.set_type(ptr, TypeBinding::Known(Type::pointer_to(Type::int(32))));
        let deref = ast.unop(Operator::Mul, ptr.into(), false, loc());
        assert_eq!(ast.resolved_type(deref), Ok(Type::int(32)));

        let value = ast.integer(3, loc());
        let deref = ast.unop(Operator::Mul, value, false, loc());
        assert_eq!(error_of(&ast, deref).message, "invalid dereference of type int64");
    }

    #[test]
    fn field_access_requires_record_with_field() {
        let mut ast = Ast::new();
        let record = Type::Record(Rc::new(Record::with_fields(
            "struct point",
            vec![Field {
                name: "x".to_string(),
                type_: Type::int(32),
                offset: 0,
            }],
        )));

        let var = ast.variable("$pt", loc());
        ast.set_type(var, TypeBinding::Known(record.clone()));
        let x = ast.field_access(var.into(), FieldName::Named("x".to_string()), loc());
        assert_eq!(ast.resolved_type(x), Ok(Type::int(32)));

        let var = ast.variable("$pt", loc());
        ast.set_type(var, TypeBinding::Known(record));
        let y = ast.field_access(var.into(), FieldName::Named("y".to_string()), loc());
        assert_eq!(
            error_of(&ast, y).message,
            "field y not found on type struct point"
        );

        let number = ast.integer(1, loc());
        let z = ast.field_access(number, FieldName::Named("z".to_string()), loc());
        assert_eq!(
            error_of(&ast, z).message,
            "field access on non-record type int64"
        );
    }

    #[test]
    fn unresolved_records_defer_field_types() {
        let mut ast = Ast::new();
        let var = ast.variable("$task", loc());
        ast.set_type(var, TypeBinding::Known(Type::record("struct opaque")));
        let access = ast.field_access(var.into(), FieldName::Named("pid".to_string()), loc());
        assert_eq!(error_of(&ast, access).kind, TypeErrorKind::Unresolved);
    }

    #[test]
    fn array_access_accepts_arrays_and_pointers() {
        let mut ast = Ast::new();
        let array = ast.variable("$a", loc());
        ast.set_type(array, TypeBinding::Known(Type::array_of(Type::uint(16), 2)));
        let index = ast.integer(0, loc());
        let access = ast.array_access(array.into(), index, loc());
        assert_eq!(ast.resolved_type(access), Ok(Type::uint(16)));

        let text = ast.string("abc", loc());
        let index = ast.integer(0, loc());
        let access = ast.array_access(text, index, loc());
        assert_eq!(
            error_of(&ast, access).message,
            "type string[4] not legal for array access"
        );
    }

    #[test]
    fn tuples_reject_multi_output_aggregates() {
        let mut ast = Ast::new();
        let one = ast.integer(1, loc());
        let text = ast.string("x", loc());
        let tuple = ast.tuple(vec![one, text], loc());
        assert_eq!(
            ast.resolved_type(tuple),
            Ok(Type::Tuple(vec![Type::int64(), Type::string(2)]))
        );

        let hist = ast.map("@h", None, loc());
        ast.set_type(hist, TypeBinding::Known(Type::Aggregate(Aggregate::Hist)));
        let tuple = ast.tuple(vec![hist.into()], loc());
        assert_eq!(
            error_of(&ast, tuple).message,
            "map type hist_t cannot exist inside a tuple"
        );
    }

    #[test]
    fn ternary_branches_must_agree() {
        let mut ast = Ast::new();
        let cond = ast.integer(1, loc());
        let left = ast.string("yes", loc());
        let right = ast.string("nah", loc());
        let ternary = ast.ternary(cond, left, right, loc());
        assert_eq!(ast.resolved_type(ternary), Ok(Type::string(4)));

        let cond = ast.integer(1, loc());
        let left = ast.string("yes", loc());
        let right = ast.string("no", loc());
        let ternary = ast.ternary(cond, left, right, loc());
        assert_eq!(
            error_of(&ast, ternary).message,
            "ternary type mismatch, left type is string[4], right type is string[3]"
        );

        let cond = ast.integer(1, loc());
        let left = ast.integer(1, loc());
        let right = ast.string("no", loc());
        let ternary = ast.ternary(cond, left, right, loc());
        assert_eq!(
            error_of(&ast, ternary).message,
            "ternary type mismatch, left type is int64, right type is string[3]"
        );
    }

    #[test]
    fn errors_propagate_to_enclosing_expressions() {
        let mut ast = Ast::new();
        let value = ast.integer(3, loc());
        let deref = ast.unop(Operator::Mul, value, false, loc());
        let one = ast.integer(1, loc());
        let sum = ast.binop(deref, Operator::Plus, one, loc());
        assert_eq!(error_of(&ast, sum).message, "invalid dereference of type int64");
    }

    #[test]
    #[should_panic(expected = "cannot be bound")]
    fn literal_types_cannot_be_rebound() {
        let mut ast = Ast::new();
        let one = ast.integer(1, loc());
        ast.set_type(one, TypeBinding::Known(Type::Bool));
    }
}
