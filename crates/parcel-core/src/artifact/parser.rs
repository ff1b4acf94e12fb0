//! Recursive-descent parser for artifact sources

use super::ast::{Artifact, BinaryOp, Expr, FunctionDecl, Item};
use super::guards::DepthGuard;
use super::lexer::{tokenize, Span, Token};
use super::ParseError;
use crate::strategy::Strategy;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

pub use super::guards::MAX_PARSE_DEPTH;

/// Parse a complete artifact source.
pub fn parse(source: &str) -> Result<Artifact, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_artifact()
}

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    depth: Rc<Cell<usize>>,
    eof_span: Span,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        let eof_span = tokens
            .last()
            .map(|(_, span)| Span {
                start: span.end,
                end: span.end,
                line: span.line,
                column: span.column + (span.end - span.start) as u32,
            })
            .unwrap_or(Span {
                start: 0,
                end: 0,
                line: 1,
                column: 1,
            });
        Self {
            tokens,
            pos: 0,
            depth: Rc::new(Cell::new(0)),
            eof_span,
        }
    }

    fn enter_depth(&self) -> Result<DepthGuard, ParseError> {
        DepthGuard::new(&self.depth, self.current_span())
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| *span)
            .unwrap_or(self.eof_span)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.current() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, context: &str) -> Result<Span, ParseError> {
        let span = self.current_span();
        if self.eat(token) {
            Ok(span)
        } else {
            Err(self.unexpected(&format!("'{}' {}", token, context)))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        let span = self.current_span();
        match self.current() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok((name, span))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String, ParseError> {
        match self.current() {
            Some(Token::StringLiteral(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.current() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        };
        ParseError::new(
            format!("expected {}, found {}", expected, found),
            self.current_span(),
        )
    }

    pub fn parse_artifact(&mut self) -> Result<Artifact, ParseError> {
        let mut items = Vec::new();
        while !self.at_end() {
            items.push(self.parse_item()?);
        }
        Ok(Artifact::new(items))
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        match self.current() {
            Some(Token::Const) => self.parse_const(),
            Some(Token::Fn) => self.parse_function(),
            Some(Token::Import) => self.parse_import(),
            Some(Token::Load) => self.parse_load(),
            _ => Err(self.unexpected("'const', 'fn', 'import' or 'load'")),
        }
    }

    fn parse_const(&mut self) -> Result<Item, ParseError> {
        let span = self.current_span();
        self.advance();
        let (name, name_span) = self.expect_identifier("constant name")?;
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(ParseError::new(
                format!("constant name '{}' must start with an uppercase letter", name),
                name_span,
            ));
        }
        self.expect(&Token::Equal, "after constant name")?;
        let value = self.parse_expression()?;
        Ok(Item::Const { name, value, span })
    }

    fn parse_function(&mut self) -> Result<Item, ParseError> {
        let span = self.current_span();
        self.advance();
        let (name, _) = self.expect_identifier("function name")?;
        self.expect(&Token::LeftParen, "after function name")?;

        let mut params: Vec<String> = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                let (param, param_span) = self.expect_identifier("parameter name")?;
                if params.contains(&param) {
                    return Err(ParseError::new(
                        format!("duplicate parameter '{}' in function '{}'", param, name),
                        param_span,
                    ));
                }
                params.push(param);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RightParen, "to close parameter list")?;
        self.expect(&Token::Equal, "before function body")?;
        let body = self.parse_expression()?;

        Ok(Item::Function(Arc::new(FunctionDecl {
            name,
            params,
            body,
            span,
        })))
    }

    fn parse_import(&mut self) -> Result<Item, ParseError> {
        let span = self.current_span();
        self.advance();
        let namespace = self.expect_string("namespace string after 'import'")?;

        let alias = if self.eat(&Token::As) {
            Some(self.expect_identifier("alias after 'as'")?.0)
        } else {
            None
        };

        let strategy = if self.eat(&Token::To) {
            let strategy_span = self.current_span();
            let strategy = match self.advance() {
                Some(Token::Const) => Strategy::Constant,
                Some(Token::Identifier(word)) => word
                    .parse::<Strategy>()
                    .map_err(|e| ParseError::new(e.to_string(), strategy_span))?,
                _ => {
                    return Err(ParseError::new(
                        "expected binding strategy after 'to'",
                        strategy_span,
                    ))
                }
            };
            if strategy == Strategy::Local {
                return Err(ParseError::new(
                    "local bindings are not available inside artifacts",
                    strategy_span,
                ));
            }
            strategy
        } else {
            Strategy::Method
        };

        Ok(Item::Import {
            namespace,
            alias,
            strategy,
            span,
        })
    }

    fn parse_load(&mut self) -> Result<Item, ParseError> {
        let span = self.current_span();
        self.advance();
        let name = self.expect_string("file name after 'load'")?;
        Ok(Item::Load { name, span })
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let _guard = self.enter_depth()?;
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        let mut links = Vec::new();
        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            links.push(self.enter_depth()?);
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        let mut links = Vec::new();
        loop {
            let op = match self.current() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            links.push(self.enter_depth()?);
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            let _guard = self.enter_depth()?;
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let mut links = Vec::new();
        while self.check(&Token::Dot) {
            links.push(self.enter_depth()?);
            self.advance();
            let (name, _) = self.expect_identifier("member name after '.'")?;
            if self.check(&Token::LeftParen) {
                let args = self.parse_arguments()?;
                expr = Expr::MethodCall {
                    target: Box::new(expr),
                    name,
                    args,
                };
            } else {
                expr = Expr::Member {
                    target: Box::new(expr),
                    name,
                };
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&Token::LeftParen, "to open argument list")?;
        let mut args = Vec::new();
        if !self.check(&Token::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RightParen, "to close argument list")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current() {
            Some(Token::Nil) => {
                self.advance();
                Ok(Expr::Nil)
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Some(Token::IntLiteral(n)) => {
                let n = *n;
                self.advance();
                Ok(Expr::Int(n))
            }
            Some(Token::FloatLiteral(n)) => {
                let n = *n;
                self.advance();
                Ok(Expr::Float(n))
            }
            Some(Token::StringLiteral(s)) => {
                let s = s.clone();
                self.advance();
                Ok(Expr::Str(s))
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                if self.check(&Token::LeftParen) {
                    let args = self.parse_arguments()?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(Token::LeftParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen, "to close parenthesized expression")?;
                Ok(expr)
            }
            Some(Token::LeftBracket) => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RightBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&Token::RightBracket, "to close list")?;
                Ok(Expr::List(elements))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}
