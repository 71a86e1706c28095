use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(f64),
    True,
    False,

    And,
    Or,
    Not,
    If,
    Else,

    LParen,
    RParen,
    Comma,

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,

    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Eof,
}

pub(crate) fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        // Number: [0-9]+(.[0-9]*)?([eE][+-]?[0-9]+)? or .[0-9]+(...)
        if c.is_ascii_digit()
            || (c == '.' && i + 1 < bytes.len() && (bytes[i + 1] as char).is_ascii_digit())
        {
            while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
            if i < bytes.len() && bytes[i] as char == '.' {
                i += 1;
                while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                    i += 1;
                }
            }
            if i < bytes.len() && matches!(bytes[i] as char, 'e' | 'E') {
                let e_pos = i;
                i += 1;
                if i < bytes.len() && matches!(bytes[i] as char, '+' | '-') {
                    i += 1;
                }
                let exp_start = i;
                while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                    i += 1;
                }
                if exp_start == i {
                    return Err(ExprError::syntax(
                        e_pos,
                        "invalid number exponent (expected digits)",
                    ));
                }
            }

            let v: f64 = input[start..i]
                .parse()
                .map_err(|_| ExprError::syntax(start, "invalid number"))?;
            out.push(Token {
                kind: TokenKind::Number(v),
                offset: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            i += 1;
            while i < bytes.len() {
                let ch = bytes[i] as char;
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    i += 1;
                } else {
                    break;
                }
            }
            let kind = match &input[start..i] {
                "True" => TokenKind::True,
                "False" => TokenKind::False,
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                "not" => TokenKind::Not,
                "if" => TokenKind::If,
                "else" => TokenKind::Else,
                s => TokenKind::Ident(s.to_owned()),
            };
            out.push(Token {
                kind,
                offset: start,
            });
            continue;
        }

        if i + 1 < bytes.len() {
            let kind = match &input[i..i + 2] {
                "**" => Some(TokenKind::StarStar),
                "==" => Some(TokenKind::EqEq),
                "!=" => Some(TokenKind::Ne),
                "<=" => Some(TokenKind::Le),
                ">=" => Some(TokenKind::Ge),
                _ => None,
            };
            if let Some(kind) = kind {
                i += 2;
                out.push(Token {
                    kind,
                    offset: start,
                });
                continue;
            }
        }

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            _ => {
                return Err(ExprError::syntax(
                    start,
                    format!("unexpected character '{c}'"),
                ));
            }
        };
        i += 1;
        out.push(Token {
            kind,
            offset: start,
        });
    }

    out.push(Token {
        kind: TokenKind::Eof,
        offset: input.len(),
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_power_and_keywords() {
        assert_eq!(
            kinds("a ** 2 if not b else 1.5e1"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::StarStar,
                TokenKind::Number(2.0),
                TokenKind::If,
                TokenKind::Not,
                TokenKind::Ident("b".into()),
                TokenKind::Else,
                TokenKind::Number(15.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn trailing_dot_number() {
        assert_eq!(kinds("2."), vec![TokenKind::Number(2.0), TokenKind::Eof]);
    }

    #[test]
    fn rejects_bad_exponent() {
        let err = lex("1e+").unwrap_err();
        assert_eq!(err.offset(), 1);
    }

    #[test]
    fn rejects_unknown_character() {
        assert!(matches!(lex("a $ b"), Err(ExprError::Syntax { offset: 2, .. })));
    }
}
