//! Drivers: curves whose evaluation time comes from other properties.
//!
//! A driver reads its variables through the [`PropertyAccessor`], combines them (or
//! hands them to an [`ExpressionBackend`]) and the result becomes the time its curve
//! is evaluated at.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vizij_expr_core::ProgramCache;

use crate::accessor::{resolve_handle, PropertyAccessor};
use crate::curve::Curve;
use crate::ids::OwnerId;

/// `name -> value` handed to an expression backend.
pub type VariableMap = HashMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Average,
    Sum,
    Min,
    Max,
    Scripted { expression: String },
}

/// One property read by a variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub owner: OwnerId,
    pub path: String,
    /// Array component; `None` reads component 0.
    #[serde(default)]
    pub index: Option<usize>,
}

impl Target {
    pub fn new(owner: OwnerId, path: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            owner,
            path: path.into(),
            index,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    SingleProperty(Target),
    /// Euclidean distance between two 3-component properties.
    LocationDistance(Target, Target),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    /// Set when a target failed to resolve during the last evaluation.
    #[serde(skip)]
    pub invalid_target: bool,
}

impl Variable {
    pub fn single(name: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::SingleProperty(target),
            invalid_target: false,
        }
    }

    pub fn distance(name: impl Into<String>, a: Target, b: Target) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::LocationDistance(a, b),
            invalid_target: false,
        }
    }

    fn evaluate(&mut self, accessor: &mut dyn PropertyAccessor) -> f64 {
        let value = match &self.kind {
            VariableKind::SingleProperty(target) => {
                read_component(accessor, target, target.index.unwrap_or(0))
            }
            VariableKind::LocationDistance(a, b) => read_vec3(accessor, a)
                .zip(read_vec3(accessor, b))
                .map(|(a, b)| {
                    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
                    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
                }),
        };
        self.invalid_target = value.is_none();
        value.unwrap_or(0.0)
    }
}

fn read_component(accessor: &mut dyn PropertyAccessor, target: &Target, index: usize) -> Option<f64> {
    let Some(handle) = resolve_handle(accessor, None, target.owner, &target.path) else {
        warn!(path = %target.path, owner = ?target.owner, "driver target did not resolve");
        return None;
    };
    let len = accessor.array_len(handle);
    if index >= len {
        warn!(path = %target.path, index, len, "driver target index out of range");
        return None;
    }
    Some(
        accessor
            .get(handle, index)
            .unwrap_or_else(|| accessor.get_default(handle, index)),
    )
}

fn read_vec3(accessor: &mut dyn PropertyAccessor, target: &Target) -> Option<[f64; 3]> {
    Some([
        read_component(accessor, target, 0)?,
        read_component(accessor, target, 1)?,
        read_component(accessor, target, 2)?,
    ])
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub kind: DriverKind,
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Sticky: set when the expression fails, cleared only by [`Driver::revalidate`].
    #[serde(default)]
    pub invalid: bool,
    #[serde(skip)]
    pub last_value: f32,
}

impl Driver {
    pub fn new(kind: DriverKind) -> Self {
        Self {
            kind,
            variables: Vec::new(),
            invalid: false,
            last_value: 0.0,
        }
    }

    pub fn scripted(expression: impl Into<String>) -> Self {
        Self::new(DriverKind::Scripted {
            expression: expression.into(),
        })
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Clear the invalid flags so the driver is tried again.
    pub fn revalidate(&mut self) {
        self.invalid = false;
        for v in &mut self.variables {
            v.invalid_target = false;
        }
    }

    /// Any variable whose target failed on the last evaluation.
    pub fn has_invalid_targets(&self) -> bool {
        self.variables.iter().any(|v| v.invalid_target)
    }

    /// Compute the driver value. Never fails: unresolved targets read as `0.0`, a
    /// failing expression marks the driver invalid and yields `0.0`.
    pub fn evaluate(
        &mut self,
        accessor: &mut dyn PropertyAccessor,
        backend: &mut dyn ExpressionBackend,
    ) -> f32 {
        let value = match &self.kind {
            DriverKind::Scripted { expression } => {
                if self.invalid || expression.trim().is_empty() {
                    0.0
                } else {
                    let mut vars = VariableMap::with_capacity(self.variables.len());
                    for var in &mut self.variables {
                        let v = var.evaluate(accessor);
                        vars.insert(var.name.clone(), v);
                    }
                    match backend.evaluate(expression, &vars) {
                        Ok(v) => v as f32,
                        Err(err) => {
                            warn!(%expression, error = %err, "driver expression failed; marking invalid");
                            self.invalid = true;
                            0.0
                        }
                    }
                }
            }
            kind => {
                let values: Vec<f64> = self
                    .variables
                    .iter_mut()
                    .map(|var| var.evaluate(accessor))
                    .collect();
                combine(kind, &values) as f32
            }
        };
        self.last_value = value;
        value
    }
}

fn combine(kind: &DriverKind, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    match kind {
        DriverKind::Average => values.iter().sum::<f64>() / values.len() as f64,
        DriverKind::Sum => values.iter().sum(),
        DriverKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        DriverKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        DriverKind::Scripted { .. } => 0.0,
    }
}

/// Failure reported by an expression backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ExpressionError {
    pub message: String,
}

impl ExpressionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Evaluates scripted driver expressions.
pub trait ExpressionBackend {
    fn evaluate(&mut self, expression: &str, variables: &VariableMap) -> Result<f64, ExpressionError>;

    /// Drop any cached compilation of `expression`.
    fn invalidate(&mut self, _expression: &str) {}
}

/// Backend built on `vizij-expr-core`, memoising compiled programs per expression.
#[derive(Debug, Default)]
pub struct SimpleExpressionBackend {
    cache: ProgramCache,
}

impl SimpleExpressionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_programs(&self) -> usize {
        self.cache.len()
    }
}

impl ExpressionBackend for SimpleExpressionBackend {
    fn evaluate(&mut self, expression: &str, variables: &VariableMap) -> Result<f64, ExpressionError> {
        let program = self
            .cache
            .get_or_compile(expression)
            .map_err(|e| ExpressionError::new(e.to_string()))?;
        program
            .eval(variables)
            .map_err(|e| ExpressionError::new(e.to_string()))
    }

    fn invalidate(&mut self, expression: &str) {
        self.cache.invalidate(expression);
    }
}

impl Curve {
    /// Evaluate the driver, then the curve at the driver's value, and remember the
    /// result. A curve without a driver is calculated at time `0.0`, with `0.0`
    /// when it is also empty.
    pub fn calculate_driven(
        &mut self,
        accessor: &mut dyn PropertyAccessor,
        backend: &mut dyn ExpressionBackend,
    ) -> f32 {
        let Some(driver) = self.driver.as_mut() else {
            return self.calculate(0.0, 0.0);
        };
        let driver_time = driver.evaluate(accessor, backend);
        let value = self.evaluate_driven(driver_time);
        self.last_value = value;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_kinds() {
        let v = [1.0, 4.0, -2.0];
        assert_eq!(combine(&DriverKind::Average, &v), 1.0);
        assert_eq!(combine(&DriverKind::Sum, &v), 3.0);
        assert_eq!(combine(&DriverKind::Min, &v), -2.0);
        assert_eq!(combine(&DriverKind::Max, &v), 4.0);
        assert_eq!(combine(&DriverKind::Max, &[]), 0.0);
    }

    #[test]
    fn simple_backend_caches_programs() {
        let mut backend = SimpleExpressionBackend::new();
        let mut vars = VariableMap::new();
        vars.insert("a".into(), 2.0);
        assert_eq!(backend.evaluate("a * 3", &vars).unwrap(), 6.0);
        assert_eq!(backend.evaluate("a * 3", &vars).unwrap(), 6.0);
        assert_eq!(backend.cached_programs(), 1);
        assert!(backend.evaluate("a +", &vars).is_err());
        backend.invalidate("a +");
        assert_eq!(backend.cached_programs(), 1);
    }
}
