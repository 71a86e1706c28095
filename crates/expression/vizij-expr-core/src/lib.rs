//! Vizij expression core.
//!
//! A small, Python-flavoured arithmetic language for driver expressions such as
//! `var * 2 + sin(frame / 10)` or `1 if a > b else 0`. Values are `f64`; booleans are
//! `1.0`/`0.0`. Names are looked up through a [`Scope`] at evaluation time, so a
//! compiled [`Program`] can be evaluated repeatedly with different variable values.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;

use std::collections::{BTreeMap, HashMap};

pub use error::ExprError;

/// Variable lookup used during evaluation.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<f64>;
}

impl Scope for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for hashbrown::HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for [(&str, f64)] {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

/// A parsed expression, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    source: String,
    root: ast::Expr,
}

impl Program {
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let root = parser::parse_expr(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, scope: &dyn Scope) -> Result<f64, ExprError> {
        eval::eval(&self.root, scope)
    }
}

/// Compile and evaluate in one step.
pub fn evaluate(source: &str, scope: &dyn Scope) -> Result<f64, ExprError> {
    Program::compile(source)?.eval(scope)
}

/// Memoises compiled programs per source string.
///
/// Compile failures are cached too, so a broken expression is parsed only once.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: hashbrown::HashMap<String, Result<Program, ExprError>>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&mut self, source: &str) -> Result<&Program, ExprError> {
        let entry = self
            .programs
            .entry_ref(source)
            .or_insert_with(|| Program::compile(source));
        match entry {
            Ok(program) => Ok(program),
            Err(err) => Err(err.clone()),
        }
    }

    /// Drop one cached entry, e.g. after the expression text was edited.
    pub fn invalidate(&mut self, source: &str) {
        self.programs.remove(source);
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
