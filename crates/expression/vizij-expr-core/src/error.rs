use thiserror::Error;

/// Errors raised while compiling or evaluating an expression.
///
/// Every variant carries the byte offset into the source it refers to, so callers
/// can point at the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown name '{name}' at byte {offset}")]
    UnknownName { offset: usize, name: String },

    #[error("unknown function '{name}' at byte {offset}")]
    UnknownFunction { offset: usize, name: String },

    #[error("function '{name}' expects {expected} argument(s), got {got} (byte {offset})")]
    Arity {
        offset: usize,
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("math domain error in {op} at byte {offset}")]
    Domain { offset: usize, op: &'static str },

    #[error("division by zero at byte {offset}")]
    DivisionByZero { offset: usize },
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Byte offset into the expression source.
    pub fn offset(&self) -> usize {
        match self {
            Self::Syntax { offset, .. }
            | Self::UnknownName { offset, .. }
            | Self::UnknownFunction { offset, .. }
            | Self::Arity { offset, .. }
            | Self::Domain { offset, .. }
            | Self::DivisionByZero { offset } => *offset,
        }
    }

    /// True when the error is detected before any variable is read.
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. } | Self::UnknownFunction { .. } | Self::Arity { .. }
        )
    }
}
