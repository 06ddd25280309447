//! Recursive-descent, Pratt-style parser turning a token stream into a
//! [`Block`] of [`Statement`]s.

use std::path::Path;

use crate::core::ast::{AssignOp, BinaryOp, Block, ConditionNode, Expr, Literal, Statement, UnaryOp};
use crate::core::lexer::{Lexer, Token, TokenKind};
use crate::util::errors::{DiagnosticError, Location, QuarryResult};

pub fn parse_file(file: &Path, source: &str) -> QuarryResult<Block> {
    let tokens = Lexer::new(file, source).tokenize()?;
    let mut parser = Parser {
        file,
        tokens,
        pos: 0,
    };
    let block = parser.parse_statements_until_eof()?;
    Ok(block)
}

struct Parser<'a> {
    file: &'a Path,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn location(&self) -> Location {
        self.tokens[self.pos].location
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn err(&self, location: Location, message: impl Into<String>) -> anyhow::Error {
        DiagnosticError::new(self.file.to_path_buf(), location, message).into()
    }

    fn expect(&mut self, kind: &TokenKind) -> QuarryResult<Token> {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(kind) {
            Ok(self.advance())
        } else {
            Err(self.err(
                self.location(),
                format!("expected {:?}, found {:?}", kind, self.peek()),
            ))
        }
    }

    fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn parse_statements_until_eof(&mut self) -> QuarryResult<Block> {
        let mut statements = Vec::new();
        while !matches!(self.peek(), TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Block { statements })
    }

    fn parse_block(&mut self) -> QuarryResult<Block> {
        self.expect(&TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if matches!(self.peek(), TokenKind::Eof) {
                return Err(self.err(self.location(), "unexpected end of file inside block"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Block { statements })
    }

    fn parse_statement(&mut self) -> QuarryResult<Statement> {
        match self.peek().clone() {
            TokenKind::If => self.parse_condition().map(Statement::Condition),
            TokenKind::Identifier(name) if name == "foreach" => self.parse_foreach(),
            TokenKind::Identifier(_) => self.parse_identifier_led_statement(),
            _ => self.parse_expr().map(Statement::Expression),
        }
    }

    fn parse_identifier_led_statement(&mut self) -> QuarryResult<Statement> {
        let start = self.location();
        let lhs = self.parse_postfix_expr()?;

        match self.peek() {
            TokenKind::Equals | TokenKind::PlusEquals | TokenKind::MinusEquals => {
                let op = match self.advance().kind {
                    TokenKind::Equals => AssignOp::Assign,
                    TokenKind::PlusEquals => AssignOp::AppendAssign,
                    TokenKind::MinusEquals => AssignOp::RemoveAssign,
                    _ => unreachable!(),
                };
                let value = self.parse_expr()?;
                Ok(Statement::Assignment {
                    target: lhs,
                    op,
                    value,
                    location: start,
                })
            }
            TokenKind::LBrace => {
                // `ident(args) { block }` or `ident { block }` (rare, no-arg calls).
                let block = self.parse_block()?;
                match lhs {
                    Expr::FunctionCall {
                        name, args, location, ..
                    } => Ok(Statement::Call {
                        name,
                        args,
                        block: Some(block),
                        location,
                    }),
                    Expr::Identifier(name, location) => Ok(Statement::Call {
                        name,
                        args: Vec::new(),
                        block: Some(block),
                        location,
                    }),
                    other => Err(self.err(other.location(), "unexpected block after expression")),
                }
            }
            _ => match lhs {
                Expr::FunctionCall {
                    name, args, location, ..
                } => Ok(Statement::Call {
                    name,
                    args,
                    block: None,
                    location,
                }),
                other => Ok(Statement::Expression(other)),
            },
        }
    }

    fn parse_condition(&mut self) -> QuarryResult<ConditionNode> {
        let location = self.location();
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let then_block = self.parse_block()?;
        let else_block = if self.at(&TokenKind::Else) {
            self.advance();
            if self.at(&TokenKind::If) {
                let nested = self.parse_condition()?;
                Some(Block {
                    statements: vec![Statement::Condition(nested)],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(ConditionNode {
            condition,
            then_block,
            else_block,
            location,
        })
    }

    fn parse_foreach(&mut self) -> QuarryResult<Statement> {
        let location = self.location();
        self.advance(); // `foreach`
        self.expect(&TokenKind::LParen)?;
        let variable = match self.advance().kind {
            TokenKind::Identifier(name) => name,
            other => return Err(self.err(location, format!("expected identifier, found {:?}", other))),
        };
        self.expect(&TokenKind::Comma)?;
        let list = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Statement::Foreach {
            variable,
            list,
            body,
            location,
        })
    }

    // --- expression grammar ---------------------------------------------
    //
    // expr := or_expr
    // or_expr := and_expr ( "||" and_expr )*
    // and_expr := equality ( "&&" equality )*
    // equality := relational ( ("==" | "!=") relational )*
    // relational := additive ( ("<"|"<="|">"|">=") additive )*
    // additive := unary ( ("+"|"-") unary )*
    // unary := ("!"|"-")? postfix
    // postfix := primary ( "." ident | "[" expr "]" )*
    // primary := literal | identifier | identifier "(" args ")" | "(" expr ")" | "[" list "]"

    fn parse_expr(&mut self) -> QuarryResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> QuarryResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at(&TokenKind::OrOr) {
            let location = self.location();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::BinaryOp {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location,
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> QuarryResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.at(&TokenKind::AndAnd) {
            let location = self.location();
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::BinaryOp {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location,
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> QuarryResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            let location = self.location();
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location,
            };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> QuarryResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                _ => break,
            };
            let location = self.location();
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Expr::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location,
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> QuarryResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let location = self.location();
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinaryOp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> QuarryResult<Expr> {
        let location = self.location();
        match self.peek() {
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                    location,
                })
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                    location,
                })
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) -> QuarryResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    let location = self.location();
                    self.advance();
                    let member = match self.advance().kind {
                        TokenKind::Identifier(name) => name,
                        other => {
                            return Err(self.err(location, format!("expected identifier after `.`, found {:?}", other)))
                        }
                    };
                    expr = Expr::MemberAccessor {
                        base: Box::new(expr),
                        member,
                        location,
                    };
                }
                TokenKind::LBracket => {
                    let location = self.location();
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::IndexAccessor {
                        base: Box::new(expr),
                        index: Box::new(index),
                        location,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> QuarryResult<Expr> {
        let location = self.location();
        match self.advance().kind {
            TokenKind::Integer(i) => Ok(Expr::Literal(Literal::Integer(i), location)),
            TokenKind::String(s) => Ok(Expr::Literal(Literal::String(s), location)),
            TokenKind::Identifier(name) => {
                if name == "true" || name == "false" {
                    return Ok(Expr::Literal(Literal::Bool(name == "true"), location));
                }
                if self.at(&TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    self.expect(&TokenKind::RParen)?;
                    return Ok(Expr::FunctionCall {
                        name,
                        args,
                        block: None,
                        location,
                    });
                }
                Ok(Expr::Identifier(name, location))
            }
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                let items = self.parse_list_items()?;
                self.expect(&TokenKind::RBracket)?;
                Ok(Expr::List(items, location))
            }
            other => Err(self.err(location, format!("unexpected token {:?}", other))),
        }
    }

    fn parse_args(&mut self) -> QuarryResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.at(&TokenKind::RParen) {
            return Ok(args);
        }
        args.push(self.parse_expr()?);
        while self.at(&TokenKind::Comma) {
            self.advance();
            if self.at(&TokenKind::RParen) {
                break; // trailing comma
            }
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    fn parse_list_items(&mut self) -> QuarryResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.at(&TokenKind::RBracket) {
            return Ok(items);
        }
        items.push(self.parse_expr()?);
        while self.at(&TokenKind::Comma) {
            self.advance();
            if self.at(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(src: &str) -> Block {
        parse_file(&PathBuf::from("//BUILD.gn"), src).unwrap()
    }

    #[test]
    fn parses_simple_assignment() {
        let block = parse("x = 1 + 2\n");
        assert_eq!(block.statements.len(), 1);
    }

    #[test]
    fn parses_target_call_with_block() {
        let block = parse(
            r#"
            executable("foo") {
              sources = [ "a.cc", "b.cc" ]
              deps = [ ":bar" ]
            }
            "#,
        );
        assert_eq!(block.statements.len(), 1);
        match &block.statements[0] {
            Statement::Call { name, args, block, .. } => {
                assert_eq!(name, "executable");
                assert_eq!(args.len(), 1);
                assert_eq!(block.as_ref().unwrap().statements.len(), 2);
            }
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn parses_condition_with_else() {
        let block = parse(
            r#"
            if (is_foo) {
              x = 1
            } else if (is_bar) {
              x = 2
            } else {
              x = 3
            }
            "#,
        );
        assert_eq!(block.statements.len(), 1);
        assert!(matches!(block.statements[0], Statement::Condition(_)));
    }

    #[test]
    fn parses_foreach() {
        let block = parse("foreach(f, sources) { print(f) }");
        assert!(matches!(block.statements[0], Statement::Foreach { .. }));
    }

    #[test]
    fn parses_accessors() {
        let block = parse("x = invoker.sources[0]");
        match &block.statements[0] {
            Statement::Assignment { value, .. } => {
                assert!(matches!(value, Expr::IndexAccessor { .. }));
            }
            other => panic!("expected Assignment, got {:?}", other),
        }
    }
}
