use crate::ast::{BinaryOp, CmpOp, Expr, Func, UnaryOp};
use crate::error::ExprError;
use crate::lexer::{lex, Token, TokenKind};

pub(crate) fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.parse_conditional()?;
    p.expect(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn offset(&self) -> usize {
        self.peek().offset
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(ExprError::syntax(
                self.offset(),
                format!("expected {kind:?}, found {:?}", self.peek().kind),
            ))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    // conditional := or ('if' or 'else' conditional)?
    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        let then = self.parse_or()?;
        if !self.consume(TokenKind::If) {
            return Ok(then);
        }
        let cond = self.parse_or()?;
        self.expect(TokenKind::Else)?;
        let otherwise = self.parse_conditional()?;
        Ok(Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_and()?;
        while self.consume(TokenKind::Or) {
            let r = self.parse_and()?;
            e = Expr::Or(Box::new(e), Box::new(r));
        }
        Ok(e)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_not()?;
        while self.consume(TokenKind::And) {
            let r = self.parse_not()?;
            e = Expr::And(Box::new(e), Box::new(r));
        }
        Ok(e)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.consume(TokenKind::Not) {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(inner),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::Ne => CmpOp::Ne,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                _ => break,
            };
            self.bump();
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let offset = self.bump().offset;
            let r = self.parse_term()?;
            e = Expr::Binary {
                op,
                left: Box::new(e),
                right: Box::new(r),
                offset,
            };
        }
        Ok(e)
    }

    fn parse_term(&mut self) -> Result<Expr, ExprError> {
        let mut e = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let offset = self.bump().offset;
            let r = self.parse_unary()?;
            e = Expr::Binary {
                op,
                left: Box::new(e),
                right: Box::new(r),
                offset,
            };
        }
        Ok(e)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.bump();
        let inner = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(inner),
        })
    }

    // power := primary ('**' unary)?   (right associative, binds tighter than a left unary minus)
    fn parse_power(&mut self) -> Result<Expr, ExprError> {
        let base = self.parse_primary()?;
        if self.peek().kind == TokenKind::StarStar {
            let offset = self.bump().offset;
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exp),
                offset,
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::Number(v) => Ok(Expr::Num(v)),
            TokenKind::True => Ok(Expr::Num(1.0)),
            TokenKind::False => Ok(Expr::Num(0.0)),
            TokenKind::LParen => {
                let e = self.parse_conditional()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::Ident(name) => {
                if self.consume(TokenKind::LParen) {
                    self.parse_call(name, tok.offset)
                } else {
                    Ok(Expr::Name {
                        name,
                        offset: tok.offset,
                    })
                }
            }
            other => Err(ExprError::syntax(
                tok.offset,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    fn parse_call(&mut self, name: String, offset: usize) -> Result<Expr, ExprError> {
        let func = Func::lookup(&name).ok_or_else(|| ExprError::UnknownFunction {
            offset,
            name: name.clone(),
        })?;

        let mut args = Vec::new();
        if !self.consume(TokenKind::RParen) {
            loop {
                args.push(self.parse_conditional()?);
                if self.consume(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }

        let arity = func.arity();
        let too_many = arity.max.is_some_and(|max| args.len() > max);
        if args.len() < arity.min || too_many {
            return Err(ExprError::Arity {
                offset,
                name,
                expected: arity.min,
                got: args.len(),
            });
        }

        Ok(Expr::Call { func, args, offset })
    }
}
