//! Parser
//!
//! Recursive descent with a precedence ladder for expressions: assignment
//! (lowest, right-associative) down through logical, equality, relational,
//! additive, multiplicative, unary, and postfix (calls/indexing/property
//! access/post-increment, all left-associative).

use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        Ok(Program { stmts })
    }

    // -- token cursor -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected {} while parsing {}", describe(&kind), context),
                vec![describe(&kind)],
                self.peek(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Id(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::new("expected an identifier", vec!["identifier".into()], self.peek())),
        }
    }

    // -- statements -----------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match &self.peek().kind {
            TokenKind::Let => self.parse_let_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semic, "break statement")?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semic, "continue statement")?;
                Ok(Stmt::Continue)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semic) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semic, "return statement")?;
                Ok(Stmt::Return(value))
            }
            TokenKind::Func => {
                let def = self.parse_func_def()?;
                Ok(Stmt::FuncDef(def))
            }
            TokenKind::Class => self.parse_class_def(),
            TokenKind::Lcurly => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Print => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Semic, "print statement")?;
                Ok(Stmt::Print(value))
            }
            TokenKind::Import => self.parse_import_stmt(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semic, "expression statement")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::Lcurly, "block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Rcurly) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Rcurly, "block")?;
        Ok(stmts)
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let (path, name) = self.parse_let_target()?;
        self.expect(TokenKind::Assign, "let binding")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semic, "let binding")?;
        Ok(Stmt::Expr(Expr::NewAssign { path, name, value: Box::new(value) }))
    }

    /// A `let` target is a bare name, or a dotted path whose final
    /// segment becomes the binding name and whose prefix becomes the
    /// object the field is attached to (e.g. `let this.count = 0;`).
    fn parse_let_target(&mut self) -> Result<(Option<Box<Expr>>, String), ParseError> {
        let mut base = if self.check(&TokenKind::This) {
            self.advance();
            Expr::This
        } else {
            Expr::Symbol(self.expect_ident()?)
        };
        let mut segments = Vec::new();
        while self.check(&TokenKind::Dot) {
            self.advance();
            segments.push(self.expect_ident()?);
        }
        if segments.is_empty() {
            match base {
                Expr::Symbol(name) => Ok((None, name)),
                _ => Err(ParseError::new("cannot bind 'this' directly", vec![], self.peek())),
            }
        } else {
            let last = segments.pop().unwrap();
            for seg in segments {
                base = Expr::PropertyAccess { receiver: Box::new(base), name: seg };
            }
            Ok((Some(Box::new(base)), last))
        }
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let mut branches = Vec::new();
        self.expect(TokenKind::Lround, "if condition")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Rround, "if condition")?;
        let body = self.parse_block()?;
        branches.push((cond, body));
        while self.check(&TokenKind::Elif) {
            self.advance();
            self.expect(TokenKind::Lround, "elif condition")?;
            let cond = self.parse_expression()?;
            self.expect(TokenKind::Rround, "elif condition")?;
            let body = self.parse_block()?;
            branches.push((cond, body));
        }
        let else_block = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If { branches, else_block })
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(TokenKind::Lround, "while condition")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Rround, "while condition")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_do_while_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let body = self.parse_block()?;
        self.expect(TokenKind::While, "do-while statement")?;
        self.expect(TokenKind::Lround, "do-while condition")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Rround, "do-while condition")?;
        self.expect(TokenKind::Semic, "do-while statement")?;
        Ok(Stmt::DoWhile { cond, body })
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.expect(TokenKind::Lround, "switch scrutinee")?;
        let scrutinee = self.parse_expression()?;
        self.expect(TokenKind::Rround, "switch scrutinee")?;
        self.expect(TokenKind::Lcurly, "switch body")?;
        let mut cases = Vec::new();
        let mut default_block = None;
        while !self.check(&TokenKind::Rcurly) {
            if self.check(&TokenKind::Case) {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Colon, "case label")?;
                cases.push((value, self.parse_case_body()?));
            } else if self.check(&TokenKind::Default) {
                self.advance();
                self.expect(TokenKind::Colon, "default label")?;
                default_block = Some(self.parse_case_body()?);
            } else {
                return Err(ParseError::new("expected 'case' or 'default'", vec!["case".into(), "default".into()], self.peek()));
            }
        }
        self.expect(TokenKind::Rcurly, "switch body")?;
        if default_block.is_none() {
            return Err(ParseError::new("switch statement requires a default case", vec!["default".into()], self.peek()));
        }
        Ok(Stmt::Switch { scrutinee, cases, default_block })
    }

    fn parse_case_body(&mut self) -> Result<Block, ParseError> {
        let mut stmts = Vec::new();
        while !matches!(self.peek().kind, TokenKind::Case | TokenKind::Default | TokenKind::Rcurly) {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_func_def(&mut self) -> Result<FuncDef, ParseError> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(TokenKind::Lround, "function parameters")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::Rround) {
            loop {
                params.push(self.expect_ident()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Rround, "function parameters")?;
        let body = self.parse_block()?;
        Ok(FuncDef { name, params, body })
    }

    fn parse_class_def(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(TokenKind::Lcurly, "class body")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::Rcurly) {
            methods.push(self.parse_func_def()?);
        }
        self.expect(TokenKind::Rcurly, "class body")?;
        Ok(Stmt::ClassDef(ClassDef { name, methods }))
    }

    fn parse_import_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let module_name = match &self.peek().kind {
            TokenKind::Id(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            TokenKind::Str(name) => {
                let name = name.clone();
                self.advance();
                name
            }
            _ => return Err(ParseError::new("expected a module name", vec!["identifier".into(), "string".into()], self.peek())),
        };
        let alias = if self.check(&TokenKind::As) {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::Semic, "import statement")?;
        Ok(Stmt::Import { module_name, alias })
    }

    // -- expressions ------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_logic_or()?;
        if self.match_token(&TokenKind::Assign) {
            self.check_assignment_target(&target)?;
            let value = self.parse_assignment()?;
            return Ok(Expr::Reassign { target: Box::new(target), value: Box::new(value) });
        }
        if self.match_token(&TokenKind::Addassign) {
            self.check_assignment_target(&target)?;
            let value = self.parse_assignment()?;
            return Ok(Expr::CompoundAssign { op: CompoundOp::Add, target: Box::new(target), value: Box::new(value) });
        }
        if self.match_token(&TokenKind::Subassign) {
            self.check_assignment_target(&target)?;
            let value = self.parse_assignment()?;
            return Ok(Expr::CompoundAssign { op: CompoundOp::Sub, target: Box::new(target), value: Box::new(value) });
        }
        Ok(target)
    }

    /// Only a name, a property, or an array slot can receive a value.
    fn check_assignment_target(&self, target: &Expr) -> Result<(), ParseError> {
        match target {
            Expr::Symbol(_) | Expr::PropertyAccess { .. } | Expr::ArrayAccess { .. } => Ok(()),
            _ => Err(ParseError::new("invalid assignment target", vec![], self.peek())),
        }
    }

    fn parse_logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logic_and()?;
        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_logic_and()?;
            left = Expr::Logic { op: LogicOp::Or, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Logic { op: LogicOp::And, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let negate = if self.check(&TokenKind::Eq) {
                false
            } else if self.check(&TokenKind::Neq) {
                true
            } else {
                break;
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Eq { negate, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => RelOp::Lt,
                TokenKind::Lte => RelOp::Le,
                TokenKind::Gt => RelOp::Gt,
                TokenKind::Gte => RelOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Relop { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Arith { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Mul => ArithOp::Mul,
                TokenKind::Div => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arith { op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Minus) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Neg, operand: Box::new(operand) });
        }
        if self.check(&TokenKind::Bang) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand) });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                let name = self.expect_ident()?;
                expr = Expr::PropertyAccess { receiver: Box::new(expr), name };
            } else if self.check(&TokenKind::Lsquare) {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenKind::Rsquare, "array index")?;
                expr = Expr::ArrayAccess { receiver: Box::new(expr), index: Box::new(index) };
            } else if self.check(&TokenKind::Lround) {
                self.advance();
                let mut args = Vec::new();
                if !self.check(&TokenKind::Rround) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::Rround, "call arguments")?;
                expr = Expr::Call { callee: Box::new(expr), args };
            } else if self.check(&TokenKind::Incr) {
                self.advance();
                expr = Expr::Incr(Box::new(expr));
            } else if self.check(&TokenKind::Decr) {
                self.advance();
                expr = Expr::Decr(Box::new(expr));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Float(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil)
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::Id(name) => {
                self.advance();
                Ok(Expr::Symbol(name))
            }
            TokenKind::Lsquare => self.parse_array_literal(),
            TokenKind::Lround => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::Rround, "grouped expression")?;
                Ok(inner)
            }
            _ => Err(ParseError::new("unexpected token", vec!["expression".into()], &tok)),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        self.advance();
        let mut items = Vec::new();
        if !self.check(&TokenKind::Rsquare) {
            loop {
                items.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Rsquare, "array literal")?;
        Ok(Expr::ArrayLit(items))
    }
}

fn describe(kind: &TokenKind) -> String {
    format!("{:?}", kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Program {
        let tokens = tokenize(src).unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    #[test]
    fn let_binding() {
        let program = parse("let x = 1 + 2;");
        assert_eq!(program.stmts.len(), 1);
        match &program.stmts[0] {
            Stmt::Expr(Expr::NewAssign { path, name, .. }) => {
                assert!(path.is_none());
                assert_eq!(name, "x");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn let_binding_on_a_path() {
        let program = parse("let this.count = 0;");
        match &program.stmts[0] {
            Stmt::Expr(Expr::NewAssign { path, name, .. }) => {
                assert!(matches!(path.as_deref(), Some(Expr::This)));
                assert_eq!(name, "count");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn arithmetic_precedence_nests_multiplication_under_addition() {
        let program = parse("1 + 2 * 3;");
        match &program.stmts[0] {
            Stmt::Expr(Expr::Arith { op: ArithOp::Add, right, .. }) => {
                assert!(matches!(**right, Expr::Arith { op: ArithOp::Mul, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn left_associative_subtraction() {
        let program = parse("10 - 2 - 3;");
        match &program.stmts[0] {
            Stmt::Expr(Expr::Arith { op: ArithOp::Sub, left, .. }) => {
                assert!(matches!(**left, Expr::Arith { op: ArithOp::Sub, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn call_chain_and_property_access() {
        let program = parse("obj.method(1, 2).field;");
        match &program.stmts[0] {
            Stmt::Expr(Expr::PropertyAccess { receiver, name }) => {
                assert_eq!(name, "field");
                assert!(matches!(**receiver, Expr::Call { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn if_elif_else_chain() {
        let program = parse("if (a) { print a; } elif (b) { print b; } else { print c; }");
        match &program.stmts[0] {
            Stmt::If { branches, else_block } => {
                assert_eq!(branches.len(), 2);
                assert!(else_block.is_some());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn switch_requires_default() {
        let tokens = tokenize("switch (x) { case 1: break; }").unwrap();
        assert!(Parser::new(tokens).parse_program().is_err());
    }

    #[test]
    fn class_with_methods() {
        let program = parse("class Counter { func init() { let this.n = 0; } func bump() { this.n = this.n + 1; } }");
        match &program.stmts[0] {
            Stmt::ClassDef(def) => {
                assert_eq!(def.name, "Counter");
                assert_eq!(def.methods.len(), 2);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn import_with_alias() {
        let program = parse("import math as m;");
        match &program.stmts[0] {
            Stmt::Import { module_name, alias } => {
                assert_eq!(module_name, "math");
                assert_eq!(alias.as_deref(), Some("m"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn compound_assignment() {
        let program = parse("x += 1;");
        assert!(matches!(
            &program.stmts[0],
            Stmt::Expr(Expr::CompoundAssign { op: CompoundOp::Add, .. })
        ));
    }
}
