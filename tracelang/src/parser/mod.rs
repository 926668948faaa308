//! Recursive-descent parser building the syntax tree from source text.
//!
//! Attach points are read raw by the lexer, since their syntax (paths, wildcards, colons)
//! does not fit the expression tokens. Everything else goes through [`Lexer::next`].

mod lexer;

use lexer::{Lexer, Token, TokenKind};

use crate::ast::{
    Ast, AttachPoint, Block, Expression, FieldName, Id, JumpKind, Operator, ParameterRef, Probe,
    Program, Statement, Subprog, TypeOrExpr,
};
use crate::config::StackMode;
use crate::errors::{invalid_attach_point, syntax_error, Diagnostic, Diagnostics, Outcome};
use crate::params::Params;
use crate::source::InputSpan;
use crate::typing::{name_to_type, Type};

type ParseResult<T> = Result<T, Diagnostic>;

const BUILTINS: &[&str] = &[
    "pid", "tid", "uid", "gid", "cpu", "nsecs", "elapsed", "comm", "probe", "func", "ctx",
    "curtask", "kstack", "ustack", "args", "retval",
];

fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
        || (name.len() == 4 && name.starts_with("arg") && name.as_bytes()[3].is_ascii_digit())
}

fn is_record_keyword(word: &str) -> bool {
    word == "struct" || word == "union" || word == "enum"
}

fn compound_operator(op: &str) -> Operator {
    match op {
        "<<" => Operator::Left,
        ">>" => Operator::Right,
        "+" => Operator::Plus,
        "-" => Operator::Minus,
        "*" => Operator::Mul,
        "/" => Operator::Div,
        "%" => Operator::Mod,
        "&" => Operator::BAnd,
        "|" => Operator::BOr,
        _ => Operator::BXor,
    }
}

/// Parses `source` into `ast`. Positional parameters are typed from `params`.
///
/// Parsing stops at the first syntax error. Malformed attach points are reported but
/// do not stop parsing, so all of them are reported at once.
pub fn parse(source: &str, params: &Params, ast: &mut Ast) -> Outcome<Id<Program>> {
    let mut parser = Parser {
        lexer: Lexer::new(source),
        ast,
        params,
        errors: Vec::new(),
        stop_at_slash: false,
    };
    match parser.program() {
        Ok(program) if parser.errors.is_empty() => Outcome::success(program),
        Ok(_) => Outcome::failure(parser.errors),
        Err(error) => {
            let mut errors = parser.errors;
            errors.push(error);
            Outcome::failure(errors)
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    ast: &'a mut Ast,
    params: &'a Params,
    errors: Diagnostics,

    /// Set while parsing a predicate, where `/` closes the predicate instead of dividing.
    stop_at_slash: bool,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<TokenKind> {
        self.lexer.peek().map(|token| token.kind)
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek().as_ref() == Some(kind)
    }

    fn unexpected(token: &Token, expected: &str) -> Diagnostic {
        syntax_error(
            format!("unexpected {}, expected {}", token.kind, expected),
            token.span,
        )
    }

    /// Error for whatever comes next in the input.
    fn unexpected_next(&self, expected: &str) -> Diagnostic {
        match self.lexer.peek() {
            Some(token) => Self::unexpected(&token, expected),
            None => syntax_error(
                format!("unexpected end of input, expected {}", expected),
                self.lexer.eof_span(),
            ),
        }
    }

    fn next_token(&mut self, expected: &str) -> ParseResult<Token> {
        match self.lexer.next() {
            Some(token) => Ok(token),
            None => Err(syntax_error(
                format!("unexpected end of input, expected {}", expected),
                self.lexer.eof_span(),
            )),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<InputSpan> {
        let expected = kind.to_string();
        let token = self.next_token(&expected)?;
        if token.kind == kind {
            Ok(token.span)
        } else {
            Err(Self::unexpected(&token, &expected))
        }
    }

    /// Consumes the next token if it is `kind`.
    fn eat(&mut self, kind: &TokenKind) -> Option<InputSpan> {
        match self.lexer.peek() {
            Some(token) if token.kind == *kind => {
                self.lexer.next();
                Some(token.span)
            }
            _ => None,
        }
    }

    fn ident(&mut self, expected: &str) -> ParseResult<(String, InputSpan)> {
        let token = self.next_token(expected)?;
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.span)),
            _ => Err(Self::unexpected(&token, expected)),
        }
    }

    fn variable_name(&mut self) -> ParseResult<(String, InputSpan)> {
        let token = self.next_token("variable")?;
        match token.kind {
            TokenKind::Var(name) => Ok((name, token.span)),
            _ => Err(Self::unexpected(&token, "variable")),
        }
    }

    fn non_negative_integer(&mut self, expected: &str) -> ParseResult<usize> {
        let token = self.next_token(expected)?;
        match token.kind {
            TokenKind::Int(value) if value >= 0 => Ok(value as usize),
            _ => Err(Self::unexpected(&token, expected)),
        }
    }

    /// Runs `parse` with `/` treated as division again, as inside brackets.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let saved = std::mem::replace(&mut self.stop_at_slash, false);
        let result = parse(self);
        self.stop_at_slash = saved;
        result
    }

    fn block_location(&self, block: Id<Block>) -> InputSpan {
        self.ast[block].loc
    }

    // Top level

    fn program(&mut self) -> ParseResult<Id<Program>> {
        let mut config = Vec::new();
        let mut config_loc: Option<InputSpan> = None;
        let mut functions = Vec::new();
        let mut probes = Vec::new();

        while !self.lexer.at_eof() {
            match self.peek() {
                Some(TokenKind::KwConfig) => {
                    let (stmts, loc) = self.config_block()?;
                    config_loc = Some(config_loc.map_or(loc, |first| first.to(loc)));
                    config.extend(stmts);
                }
                Some(TokenKind::KwFn) => functions.push(self.function()?),
                Some(TokenKind::Ident(ref word)) if word == "set" && self.at_set_statement() => {
                    let (stmt, loc) = self.set_statement()?;
                    config_loc = Some(config_loc.map_or(loc, |first| first.to(loc)));
                    config.push(stmt);
                }
                _ => probes.push(self.probe()?),
            }
        }

        let config = config_loc.map(|loc| self.ast.config(config, loc));
        let loc = InputSpan::new(0, self.lexer.source().len());
        Ok(self.ast.program(config, functions, probes, loc))
    }

    /// `config = { name = value; ... }`
    fn config_block(&mut self) -> ParseResult<(Vec<Statement>, InputSpan)> {
        let start = self.expect(TokenKind::KwConfig)?;
        self.expect(TokenKind::Assign)?;
        self.expect(TokenKind::LeftBrace)?;
        let mut stmts = Vec::new();
        loop {
            if let Some(end) = self.eat(&TokenKind::RightBrace) {
                return Ok((stmts, start.to(end)));
            }
            stmts.push(self.config_assignment()?);
            if self.eat(&TokenKind::Semicolon).is_none() {
                let end = self.expect(TokenKind::RightBrace)?;
                return Ok((stmts, start.to(end)));
            }
        }
    }

    fn config_assignment(&mut self) -> ParseResult<Statement> {
        let (name, start) = self.ident("config option name")?;
        self.expect(TokenKind::Assign)?;
        let value = self.expr()?;
        let loc = start.to(value.location(self.ast));
        Ok(self.ast.assign_config_var(name, value, loc))
    }

    /// `set name = value;` at the top level is the same as a one-line config block.
    fn at_set_statement(&self) -> bool {
        let mut lexer = self.lexer;
        lexer.next();
        matches!(lexer.next().map(|token| token.kind), Some(TokenKind::Ident(_)))
            && matches!(lexer.next().map(|token| token.kind), Some(TokenKind::Assign))
    }

    fn set_statement(&mut self) -> ParseResult<(Statement, InputSpan)> {
        let (_, start) = self.ident("`set`")?;
        let stmt = self.config_assignment()?;
        let end = self.expect(TokenKind::Semicolon)?;
        Ok((stmt, start.to(end)))
    }

    /// `fn name($a: type, ...): type { ... }`
    fn function(&mut self) -> ParseResult<Id<Subprog>> {
        let start = self.expect(TokenKind::KwFn)?;
        let (name, _) = self.ident("function name")?;
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RightParen).is_none() {
            loop {
                let (arg, loc) = self.variable_name()?;
                self.expect(TokenKind::Colon)?;
                let arg_type = self.type_expr()?;
                args.push(self.ast.subprog_arg(arg, arg_type, loc));
                if self.eat(&TokenKind::Comma).is_none() {
                    self.expect(TokenKind::RightParen)?;
                    break;
                }
            }
        }
        let return_type = if self.eat(&TokenKind::Colon).is_some() {
            self.type_expr()?
        } else {
            Type::Void
        };
        let (stmts, body) = self.braced_statements()?;
        Ok(self.ast.subprog(name, return_type, args, stmts, start.to(body)))
    }

    fn probe(&mut self) -> ParseResult<Id<Probe>> {
        let mut attach_points = Vec::new();
        let mut start: Option<InputSpan> = None;
        loop {
            let (raw, loc) = match self.lexer.attach_point() {
                Some(attach_point) => attach_point,
                None => return Err(self.unexpected_next("attach point")),
            };
            start.get_or_insert(loc);
            match AttachPoint::parse(&raw, loc) {
                Ok(attach_point) => attach_points.push(self.ast.make_node(attach_point)),
                Err(reason) => self.errors.push(invalid_attach_point(&raw, reason, loc)),
            }
            if !self.lexer.next_char_is(',') {
                break;
            }
            self.lexer.next();
        }

        let pred = if self.lexer.next_char_is('/') {
            let open = self.expect(TokenKind::Slash)?;
            self.stop_at_slash = true;
            let expr = self.expr();
            self.stop_at_slash = false;
            let expr = expr?;
            let close = self.expect(TokenKind::Slash)?;
            Some(self.ast.predicate(expr, open.to(close)))
        } else {
            None
        };

        let block = self.block()?;
        let loc = start.unwrap_or_default().to(self.block_location(block));
        Ok(self.ast.probe(attach_points, pred, block, loc))
    }

    // Statements

    fn block(&mut self) -> ParseResult<Id<Block>> {
        let (stmts, loc) = self.braced_statements()?;
        Ok(self.ast.block(stmts, loc))
    }

    /// `{ stmt; stmt; ... }`. Statements ending in a block need no `;`, nor does the last one.
    fn braced_statements(&mut self) -> ParseResult<(Vec<Statement>, InputSpan)> {
        let start = self.expect(TokenKind::LeftBrace)?;
        let mut stmts = Vec::new();
        loop {
            if let Some(end) = self.eat(&TokenKind::RightBrace) {
                return Ok((stmts, start.to(end)));
            }
            if self.eat(&TokenKind::Semicolon).is_some() {
                continue;
            }
            let (stmt, needs_separator) = self.statement()?;
            stmts.push(stmt);
            if needs_separator
                && self.eat(&TokenKind::Semicolon).is_none()
                && !self.peek_is(&TokenKind::RightBrace)
            {
                return Err(self.unexpected_next("`;`"));
            }
        }
    }

    /// Returns the statement and whether a `;` must follow it.
    fn statement(&mut self) -> ParseResult<(Statement, bool)> {
        let token = match self.lexer.peek() {
            Some(token) => token,
            None => return Err(self.unexpected_next("statement")),
        };
        let stmt = match token.kind {
            TokenKind::KwIf => return Ok((self.if_statement()?, false)),
            TokenKind::KwWhile => {
                self.lexer.next();
                let cond = self.parenthesized()?;
                let block = self.block()?;
                let loc = token.span.to(self.block_location(block));
                return Ok((self.ast.while_loop(cond, block, loc), false));
            }
            TokenKind::KwUnroll => {
                self.lexer.next();
                let count = self.parenthesized()?;
                let block = self.block()?;
                let loc = token.span.to(self.block_location(block));
                return Ok((self.ast.unroll(count, block, loc), false));
            }
            TokenKind::KwFor => return Ok((self.for_loop()?, false)),
            TokenKind::LeftBrace => return Ok((Statement::Block(self.block()?), false)),
            TokenKind::KwReturn => {
                self.lexer.next();
                let value = match self.peek() {
                    None | Some(TokenKind::Semicolon) | Some(TokenKind::RightBrace) => None,
                    Some(_) => Some(self.expr()?),
                };
                let loc = match value {
                    Some(value) => token.span.to(value.location(self.ast)),
                    None => token.span,
                };
                self.ast.jump(JumpKind::Return, value, loc)
            }
            TokenKind::KwBreak => {
                self.lexer.next();
                self.ast.jump(JumpKind::Break, None, token.span)
            }
            TokenKind::KwContinue => {
                self.lexer.next();
                self.ast.jump(JumpKind::Continue, None, token.span)
            }
            TokenKind::KwLet => self.let_statement()?,
            _ => self.expression_statement()?,
        };
        Ok((stmt, true))
    }

    fn parenthesized(&mut self) -> ParseResult<Expression> {
        self.expect(TokenKind::LeftParen)?;
        let expr = self.nested(|p| p.expr())?;
        self.expect(TokenKind::RightParen)?;
        Ok(expr)
    }

    fn if_statement(&mut self) -> ParseResult<Statement> {
        let start = self.expect(TokenKind::KwIf)?;
        let cond = self.parenthesized()?;
        let if_block = self.block()?;
        let else_block = if self.eat(&TokenKind::KwElse).is_some() {
            if self.peek_is(&TokenKind::KwIf) {
                let nested = self.if_statement()?;
                let loc = nested.location(self.ast);
                Some(self.ast.block(vec![nested], loc))
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        let end = self.block_location(else_block.unwrap_or(if_block));
        Ok(self.ast.if_statement(cond, if_block, else_block, start.to(end)))
    }

    /// `for ($kv : @map) { ... }`
    fn for_loop(&mut self) -> ParseResult<Statement> {
        let start = self.expect(TokenKind::KwFor)?;
        self.expect(TokenKind::LeftParen)?;
        let (name, var_loc) = self.variable_name()?;
        self.expect(TokenKind::Colon)?;
        let token = self.next_token("map")?;
        let map = match token.kind {
            TokenKind::Map(map) => self.ast.map(map, None, token.span),
            _ => return Err(Self::unexpected(&token, "map")),
        };
        self.expect(TokenKind::RightParen)?;
        let block = self.block()?;
        let decl = self.ast.variable(name, var_loc);
        let loc = start.to(self.block_location(block));
        Ok(self.ast.for_loop(decl, map.into(), block, loc))
    }

    /// `let $x;`, `let $x: type;` or `let $x[: type] = value;`
    fn let_statement(&mut self) -> ParseResult<Statement> {
        let start = self.expect(TokenKind::KwLet)?;
        let (name, var_loc) = self.variable_name()?;
        let declared_type = if self.eat(&TokenKind::Colon).is_some() {
            Some(self.type_expr()?)
        } else {
            None
        };
        let var = self.ast.variable(name, var_loc);
        let decl_loc = InputSpan::new(start.start, self.lexer.offset());
        let decl = self.ast.var_decl(var, declared_type, decl_loc);
        if self.eat(&TokenKind::Assign).is_none() {
            return Ok(Statement::VarDecl(decl));
        }
        let value = self.expr()?;
        let loc = start.to(value.location(self.ast));
        Ok(self.ast.assign_var(var, value, Some(decl), loc))
    }

    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let target_start = self.lexer;
        let target = self.expr()?;
        let token = match self.lexer.peek() {
            Some(token) => token,
            None => {
                let loc = target.location(self.ast);
                return Ok(self.ast.expr_statement(target, loc));
            }
        };
        match token.kind {
            TokenKind::Assign => {
                self.lexer.next();
                let value = self.expr()?;
                self.assignment(target, value)
            }
            TokenKind::CompoundAssign(op) => {
                self.lexer.next();
                let operand = self.expr()?;
                // `x op= y` reads `x` too; parse it again for a separate node.
                let after = std::mem::replace(&mut self.lexer, target_start);
                let current = self.expr()?;
                self.lexer = after;
                let loc = target.location(self.ast).to(operand.location(self.ast));
                let value = self.ast.binop(current, compound_operator(op), operand, loc);
                self.assignment(target, value)
            }
            _ => {
                let loc = target.location(self.ast);
                Ok(self.ast.expr_statement(target, loc))
            }
        }
    }

    fn assignment(&mut self, target: Expression, value: Expression) -> ParseResult<Statement> {
        let loc = target.location(self.ast).to(value.location(self.ast));
        match target {
            Expression::Map(map) => Ok(self.ast.assign_map(map, value, loc)),
            Expression::Variable(var) => Ok(self.ast.assign_var(var, value, None, loc)),
            _ => Err(syntax_error(
                "only maps and variables can be assigned to",
                target.location(self.ast),
            )),
        }
    }

    // Types

    /// Whether the tokens after the next one start a type rather than an expression.
    fn at_type(&self) -> bool {
        match self.peek() {
            Some(TokenKind::Ident(name)) => is_record_keyword(&name) || name_to_type(&name).is_some(),
            _ => false,
        }
    }

    fn type_expr(&mut self) -> ParseResult<Type> {
        let (name, _) = self.ident("type")?;
        let mut type_ = if is_record_keyword(&name) {
            let (tag, _) = self.ident("type name")?;
            Type::record(format!("{} {}", name, tag))
        } else {
            name_to_type(&name).unwrap_or_else(|| Type::record(name))
        };
        while self.eat(&TokenKind::Star).is_some() {
            type_ = Type::pointer_to(type_);
        }
        if self.eat(&TokenKind::LeftBracket).is_some() {
            let len = self.non_negative_integer("array length")?;
            self.expect(TokenKind::RightBracket)?;
            type_ = match type_ {
                Type::String { .. } => Type::string(len),
                Type::Buffer { .. } => Type::Buffer { size: len },
                element => Type::array_of(element, len),
            };
        }
        Ok(type_)
    }

    /// `(` followed by a type and `)` is a cast. Unknown names count as types only when
    /// written as pointers, since `(x)` is also a parenthesized identifier.
    fn at_cast(&self) -> bool {
        let mut lexer = self.lexer;
        lexer.next();
        let name = match lexer.next().map(|token| token.kind) {
            Some(TokenKind::Ident(name)) => name,
            _ => return false,
        };
        if is_record_keyword(&name) {
            return true;
        }
        let known = name_to_type(&name).is_some();
        match lexer.next().map(|token| token.kind) {
            Some(TokenKind::RightParen) | Some(TokenKind::LeftBracket) => known,
            Some(TokenKind::Star) => loop {
                match lexer.next().map(|token| token.kind) {
                    Some(TokenKind::Star) => continue,
                    Some(TokenKind::RightParen) => break true,
                    _ => break false,
                }
            },
            _ => false,
        }
    }

    // Expressions

    fn expr(&mut self) -> ParseResult<Expression> {
        self.ternary()
    }

    fn ternary(&mut self) -> ParseResult<Expression> {
        let cond = self.binary(1)?;
        if self.eat(&TokenKind::Question).is_none() {
            return Ok(cond);
        }
        let left = self.expr()?;
        self.expect(TokenKind::Colon)?;
        let right = self.ternary()?;
        let loc = cond.location(self.ast).to(right.location(self.ast));
        Ok(self.ast.ternary(cond, left, right, loc))
    }

    /// Binary operator at the start of the input and its precedence, higher binding tighter.
    fn binary_operator(&self) -> Option<(Operator, u8)> {
        let op = match self.peek()? {
            TokenKind::OrOr => (Operator::LOr, 1),
            TokenKind::AndAnd => (Operator::LAnd, 2),
            TokenKind::Pipe => (Operator::BOr, 3),
            TokenKind::Caret => (Operator::BXor, 4),
            TokenKind::Amp => (Operator::BAnd, 5),
            TokenKind::EqEq => (Operator::Eq, 6),
            TokenKind::NotEq => (Operator::Ne, 6),
            TokenKind::Less => (Operator::Lt, 7),
            TokenKind::LessEq => (Operator::Le, 7),
            TokenKind::Greater => (Operator::Gt, 7),
            TokenKind::GreaterEq => (Operator::Ge, 7),
            TokenKind::ShiftLeft => (Operator::Left, 8),
            TokenKind::ShiftRight => (Operator::Right, 8),
            TokenKind::Plus => (Operator::Plus, 9),
            TokenKind::Minus => (Operator::Minus, 9),
            TokenKind::Star => (Operator::Mul, 10),
            TokenKind::Slash if !self.stop_at_slash => (Operator::Div, 10),
            TokenKind::Percent => (Operator::Mod, 10),
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_precedence: u8) -> ParseResult<Expression> {
        let mut left = self.unary()?;
        while let Some((op, precedence)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }
            self.lexer.next();
            let right = self.binary(precedence + 1)?;
            let loc = left.location(self.ast).to(right.location(self.ast));
            left = self.ast.binop(left, op, right, loc);
        }
        Ok(left)
    }

    fn unary(&mut self) -> ParseResult<Expression> {
        let token = match self.lexer.peek() {
            Some(token) => token,
            None => return Err(self.unexpected_next("expression")),
        };
        let op = match token.kind {
            TokenKind::Bang => Operator::LNot,
            TokenKind::Tilde => Operator::BNot,
            TokenKind::Minus => Operator::Minus,
            TokenKind::Star => Operator::Mul,
            TokenKind::PlusPlus => Operator::Increment,
            TokenKind::MinusMinus => Operator::Decrement,
            TokenKind::LeftParen if self.at_cast() => return self.cast(),
            _ => return self.postfix(),
        };
        self.lexer.next();

        if op == Operator::Minus {
            if let Some(Token {
                kind: TokenKind::Int(value),
                span,
            }) = self.lexer.peek()
            {
                self.lexer.next();
                return Ok(self.ast.integer(value.wrapping_neg(), token.span.to(span)));
            }
        }

        let operand = self.unary()?;
        let loc = token.span.to(operand.location(self.ast));
        Ok(self.ast.unop(op, operand, false, loc))
    }

    fn cast(&mut self) -> ParseResult<Expression> {
        let start = self.expect(TokenKind::LeftParen)?;
        let cast_type = self.type_expr()?;
        self.expect(TokenKind::RightParen)?;
        let operand = self.unary()?;
        let loc = start.to(operand.location(self.ast));
        Ok(self.ast.cast(cast_type, operand, loc))
    }

    fn postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            let start = expr.location(self.ast);
            expr = match self.peek() {
                Some(TokenKind::LeftBracket) => {
                    self.lexer.next();
                    let index = self.nested(|p| p.expr())?;
                    let end = self.expect(TokenKind::RightBracket)?;
                    self.ast.array_access(expr, index, start.to(end))
                }
                Some(TokenKind::Dot) => {
                    self.lexer.next();
                    let (field, end) = self.field_name()?;
                    self.ast.field_access(expr, field, start.to(end))
                }
                Some(TokenKind::Arrow) => {
                    self.lexer.next();
                    let (field, end) = self.ident("field name")?;
                    let deref = self.ast.unop(Operator::Mul, expr, false, start);
                    self.ast.field_access(deref, FieldName::Named(field), start.to(end))
                }
                Some(TokenKind::PlusPlus) | Some(TokenKind::MinusMinus) => {
                    let token = self.next_token("operator")?;
                    let op = if token.kind == TokenKind::PlusPlus {
                        Operator::Increment
                    } else {
                        Operator::Decrement
                    };
                    self.ast.unop(op, expr, true, start.to(token.span))
                }
                _ => return Ok(expr),
            };
        }
    }

    fn field_name(&mut self) -> ParseResult<(FieldName, InputSpan)> {
        let token = self.next_token("field name")?;
        match token.kind {
            TokenKind::Ident(name) => Ok((FieldName::Named(name), token.span)),
            TokenKind::Int(index) if index >= 0 => Ok((FieldName::Index(index as usize), token.span)),
            _ => Err(Self::unexpected(&token, "field name")),
        }
    }

    /// Comma separated expressions up to `close`, which is consumed.
    fn expr_list(&mut self, close: TokenKind) -> ParseResult<(Vec<Expression>, InputSpan)> {
        self.nested(|p| {
            let mut items = Vec::new();
            if let Some(end) = p.eat(&close) {
                return Ok((items, end));
            }
            loop {
                items.push(p.expr()?);
                if p.eat(&TokenKind::Comma).is_none() {
                    let end = p.expect(close)?;
                    return Ok((items, end));
                }
            }
        })
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        let token = self.next_token("expression")?;
        let span = token.span;
        let expr = match token.kind {
            TokenKind::Int(value) => self.ast.integer(value, span),
            TokenKind::Str(value) => self.ast.string(value, span),
            TokenKind::Param(index) => {
                let param = ParameterRef::Index(index);
                let type_ = self.params.type_of(param);
                self.ast.positional_parameter(param, type_, span)
            }
            TokenKind::ParamCount => {
                let type_ = self.params.type_of(ParameterRef::Count);
                self.ast.positional_parameter(ParameterRef::Count, type_, span)
            }
            TokenKind::Var(name) => self.ast.variable(name, span).into(),
            TokenKind::Map(name) => {
                let (key, loc) = if self.eat(&TokenKind::LeftBracket).is_some() {
                    let (mut keys, end) = self.expr_list(TokenKind::RightBracket)?;
                    let key = match keys.len() {
                        0 => return Err(syntax_error("map key cannot be empty", span.to(end))),
                        1 => keys.remove(0),
                        _ => {
                            let first = keys[0].location(self.ast);
                            let last = keys[keys.len() - 1].location(self.ast);
                            self.ast.tuple(keys, first.to(last))
                        }
                    };
                    (Some(key), span.to(end))
                } else {
                    (None, span)
                };
                self.ast.map(name, key, loc).into()
            }
            TokenKind::Ident(name) => self.identifier(name, span)?,
            TokenKind::KwSizeof => {
                self.expect(TokenKind::LeftParen)?;
                let arg = self.type_or_expr()?;
                let end = self.expect(TokenKind::RightParen)?;
                self.ast.sizeof(arg, span.to(end))
            }
            TokenKind::KwOffsetof => {
                self.expect(TokenKind::LeftParen)?;
                let record = self.type_or_expr()?;
                self.expect(TokenKind::Comma)?;
                let (field, _) = self.ident("field name")?;
                let end = self.expect(TokenKind::RightParen)?;
                self.ast.offsetof(record, field, span.to(end))
            }
            TokenKind::LeftParen => {
                let (mut elems, end) = self.expr_list(TokenKind::RightParen)?;
                match elems.len() {
                    0 => return Err(syntax_error("empty parentheses", span.to(end))),
                    1 => elems.remove(0),
                    _ => self.ast.tuple(elems, span.to(end)),
                }
            }
            _ => return Err(Self::unexpected(&token, "expression")),
        };
        Ok(expr)
    }

    fn type_or_expr(&mut self) -> ParseResult<TypeOrExpr> {
        if self.at_type() {
            Ok(TypeOrExpr::Type(self.type_expr()?))
        } else {
            Ok(TypeOrExpr::Expr(self.nested(|p| p.expr())?))
        }
    }

    /// A call, builtin, stack mode or bare identifier.
    fn identifier(&mut self, name: String, span: InputSpan) -> ParseResult<Expression> {
        if self.eat(&TokenKind::LeftParen).is_some() {
            let (args, end) = self.expr_list(TokenKind::RightParen)?;
            return Ok(self.ast.call(name, args, span.to(end)));
        }
        if is_builtin(&name) {
            return Ok(self.ast.builtin(name, span));
        }
        if let Ok(mode) = name.parse::<StackMode>() {
            return Ok(self.ast.stack_mode(mode, span));
        }
        Ok(self.ast.identifier(name, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSexp;
    use crate::passes::test_utils::messages;

    fn parse_with(source: &str, params: &Params) -> (Ast, Outcome<Id<Program>>) {
        let mut ast = Ast::new();
        let outcome = parse(source, params, &mut ast);
        (ast, outcome)
    }

    fn dump(source: &str) -> String {
        let (ast, outcome) = parse_with(source, &Params::default());
        let program = match outcome.into_parts().0 {
            Ok(program) => program,
            Err(errors) => panic!("cannot parse {:?}: {:?}", source, errors),
        };
        program.to_sexp(&ast).pretty_print(1000)
    }

    /// Dump of the statements of a single `BEGIN` probe.
    fn dump_body(body: &str) -> String {
        let dumped = dump(&format!("BEGIN {{ {} }}", body));
        let prefix = "(program (probe \"BEGIN\" (block ";
        assert!(dumped.starts_with(prefix), "{}", dumped);
        dumped[prefix.len()..dumped.len() - 3].to_string()
    }

    fn errors(source: &str) -> Vec<Diagnostic> {
        let (_, outcome) = parse_with(source, &Params::default());
        outcome.errors().to_vec()
    }

    #[test]
    fn counts_nodes_of_minimal_program() {
        let (ast, outcome) = parse_with("BEGIN { exit(1); }", &Params::default());
        assert!(outcome.is_ok());
        assert_eq!(ast.len(), 7);
    }

    #[test]
    fn respects_operator_precedence() {
        assert_eq!(dump_body("@x = 1 + 2 * 3"), "(= @x (+ 1 (* 2 3)))");
        assert_eq!(
            dump_body("@x = 1 << 4 | 3 & 1 ^ 8"),
            "(= @x (| (<< 1 4) (^ (& 3 1) 8)))"
        );
        assert_eq!(dump_body("@x = 8 - 2 - 1"), "(= @x (- (- 8 2) 1))");
        assert_eq!(
            dump_body("@x = $a < 1 || $b == 2 && !$c"),
            "(= @x (|| (< $a 1) (&& (== $b 2) (! $c))))"
        );
        assert_eq!(dump_body("@x = pid ? 1 : 2 ? 3 : 4"), "(= @x (? pid 1 (? 2 3 4)))");
    }

    #[test]
    fn parses_postfix_chains() {
        assert_eq!(
            dump_body("@x = curtask->parent->pid"),
            "(= @x (. (* (. (* curtask) parent)) pid))"
        );
        assert_eq!(dump_body("@x = $kv.0"), "(= @x (. $kv 0))");
        assert_eq!(dump_body("@x = args.buf[2]"), "(= @x ([] (. args buf) 2))");
        assert_eq!(dump_body("$i++; --$j"), "(expr (post++ $i)) (expr (-- $j))");
    }

    #[test]
    fn negative_literals_are_folded_into_integers() {
        assert_eq!(dump_body("@x = -5"), "(= @x -5)");
        assert_eq!(dump_body("@x = -pid"), "(= @x (- pid))");
    }

    #[test]
    fn parses_maps_and_keys() {
        assert_eq!(dump_body("@ = count()"), "(= @ (call count))");
        assert_eq!(dump_body("@m[pid] = 1"), "(= (@m pid) 1)");
        assert_eq!(dump_body("@m[pid, comm] = 1"), "(= (@m (tuple pid comm)) 1)");
    }

    #[test]
    fn classifies_identifiers() {
        assert_eq!(
            dump_body("print(arg0, retval, kstack(perf), foo)"),
            "(expr (call print arg0 retval (call kstack perf) foo))"
        );
    }

    #[test]
    fn desugars_compound_assignment() {
        assert_eq!(dump_body("@x += 2"), "(= @x (+ @x 2))");
        assert_eq!(dump_body("$v <<= 1"), "(= $v (<< $v 1))");
        assert_eq!(dump_body("@m[pid] -= 1"), "(= (@m pid) (- (@m pid) 1))");
    }

    #[test]
    fn parses_declarations() {
        assert_eq!(dump_body("let $a; let $b: uint16"), "(let $a) (let $b uint16)");
        assert_eq!(dump_body("let $c = 1"), "(let= $c 1)");
        assert_eq!(
            dump_body("let $s: struct foo *"),
            "(let $s struct foo *)"
        );
        assert_eq!(dump_body("let $t: string[8]"), "(let $t string[8])");
    }

    #[test]
    fn parses_casts_and_type_operators() {
        assert_eq!(
            dump_body("@x = (struct task_struct *)curtask"),
            "(= @x (cast struct task_struct * curtask))"
        );
        assert_eq!(dump_body("@x = (uint8)pid"), "(= @x (cast uint8 pid))");
        assert_eq!(dump_body("@x = (pid)"), "(= @x pid)");
        assert_eq!(dump_body("@x = (1, \"a\")"), "(= @x (tuple 1 \"a\"))");
        assert_eq!(dump_body("@x = sizeof(uint32)"), "(= @x (sizeof uint32))");
        assert_eq!(dump_body("@x = sizeof(pid)"), "(= @x (sizeof pid))");
        assert_eq!(
            dump_body("@x = offsetof(struct foo, bar)"),
            "(= @x (offsetof struct foo bar))"
        );
    }

    #[test]
    fn parses_control_flow() {
        assert_eq!(
            dump_body("if (pid) { @a = 1 } else if (tid) { @b = 1 } else { @c = 1 }"),
            "(if pid (block (= @a 1)) (block (if tid (block (= @b 1)) (block (= @c 1)))))"
        );
        assert_eq!(
            dump_body("while ($i < 3) { $i++; break } unroll(2) { continue; }"),
            "(while (< $i 3) (block (expr (post++ $i)) (break))) (unroll 2 (block (continue)))"
        );
        assert_eq!(
            dump_body("for ($kv : @m) { print($kv.1) }"),
            "(for $kv @m (block (expr (call print (. $kv 1)))))"
        );
    }

    #[test]
    fn parses_functions_and_predicates() {
        assert_eq!(
            dump("fn add($a: int64, $b: int64): int64 { return $a + $b; } fn nop() {} BEGIN {}"),
            "(program (fn add int64 (($a int64) ($b int64)) (return (+ $a $b))) (fn nop void ()) (probe \"BEGIN\" (block)))"
        );
        assert_eq!(
            dump("kprobe:f /pid == (4 / 2)/ { }"),
            "(program (probe \"kprobe:f\" (pred (== pid (/ 4 2))) (block)))"
        );
    }

    #[test]
    fn merges_config_blocks() {
        assert_eq!(
            dump("config = { max_strlen = 16; stack_mode = raw } set on_stack_limit = 4; BEGIN {}"),
            "(program (probe \"BEGIN\" (block)) (config (set max_strlen 16) (set stack_mode raw) (set on_stack_limit 4)))"
        );
    }

    #[test]
    fn reads_multiple_attach_points() {
        let (ast, outcome) = parse_with(
            "kprobe:a,\n  uprobe:/bin/sh:main /* c */ , tracepoint:sched:* { }",
            &Params::default(),
        );
        let program = outcome.into_parts().0.unwrap();
        let probe = ast[program].probes[0];
        assert_eq!(
            ast[probe].name(&ast),
            "kprobe:a,uprobe:/bin/sh:main,tracepoint:sched:*"
        );
    }

    #[test]
    fn types_positional_parameters_from_values() {
        let params = Params::new(vec!["12".to_string(), "abc".to_string()]);
        let (ast, outcome) = parse_with("BEGIN { @a = $1; @b = $2; @c = $#; }", &params);
        let program = outcome.into_parts().0.unwrap();
        let block = ast[ast[program].probes[0]].block;
        let types: Vec<String> = ast[block]
            .stmts
            .iter()
            .map(|stmt| match *stmt {
                Statement::AssignMap(id) => ast.resolved_type(ast[id].expr).unwrap().to_string(),
                _ => panic!("unexpected statement"),
            })
            .collect();
        assert_eq!(types, vec!["int64", "string[4]", "int64"]);
    }

    #[test]
    fn reports_syntax_errors() {
        let reported = errors("BEGIN { @x = ; }");
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].code, "E0001");
        assert_eq!(messages(&reported), vec!["unexpected `;`, expected expression"]);

        assert_eq!(
            messages(&errors("BEGIN { @x = 1")),
            vec!["unexpected end of input, expected `;`"]
        );
        assert_eq!(
            messages(&errors("BEGIN { @x = 1 @y = 2 }")),
            vec!["unexpected map `@y`, expected `;`"]
        );
        assert_eq!(
            messages(&errors("BEGIN { 1 = 2; }")),
            vec!["only maps and variables can be assigned to"]
        );
        assert_eq!(
            messages(&errors("BEGIN { @x = 1 # 2; }")),
            vec!["unexpected `#`, expected `;`"]
        );
    }

    #[test]
    fn reports_every_invalid_attach_point() {
        let reported = errors("nosuch:a { } kprobe:f { } bogus { }");
        assert_eq!(reported.len(), 2);
        assert!(reported.iter().all(|d| d.code == "E0016"));
        assert_eq!(messages(&reported)[0], "invalid attach point `nosuch:a`");
    }
}
