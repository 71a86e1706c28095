use std::collections::HashMap;

use vizij_expr_core::{evaluate, ExprError, Program, ProgramCache};

fn approx(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn vars(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// it should respect arithmetic precedence and associativity
#[test]
fn arithmetic_precedence() {
    let scope = vars(&[]);
    approx(evaluate("1 + 2 * 3", &scope).unwrap(), 7.0, 0.0);
    approx(evaluate("(1 + 2) * 3", &scope).unwrap(), 9.0, 0.0);
    approx(evaluate("2 ** 3 ** 2", &scope).unwrap(), 512.0, 0.0);
    approx(evaluate("-2 ** 2", &scope).unwrap(), -4.0, 0.0);
    approx(evaluate("10 - 4 - 3", &scope).unwrap(), 3.0, 0.0);
    approx(evaluate("-7 % 3", &scope).unwrap(), 2.0, 0.0);
}

/// it should read variables from the scope on every evaluation
#[test]
fn variables_are_late_bound() {
    let program = Program::compile("var * 2 + offset").unwrap();
    approx(
        program.eval(&vars(&[("var", 1.5), ("offset", 1.0)])).unwrap(),
        4.0,
        1e-12,
    );
    approx(
        program.eval(&vars(&[("var", -1.0), ("offset", 0.0)])).unwrap(),
        -2.0,
        1e-12,
    );
}

/// it should evaluate the Python conditional expression lazily
#[test]
fn conditional_expression() {
    let scope = vars(&[("a", 3.0), ("b", 2.0)]);
    approx(evaluate("1 if a > b else 0", &scope).unwrap(), 1.0, 0.0);
    approx(evaluate("1 if a < b else 0", &scope).unwrap(), 0.0, 0.0);
    // the untaken branch would divide by zero
    approx(evaluate("a if True else 1 / 0", &scope).unwrap(), 3.0, 0.0);
}

/// it should implement boolean operators with Python operand semantics
#[test]
fn boolean_operators() {
    let scope = vars(&[("x", 0.0), ("y", 5.0)]);
    approx(evaluate("x or y", &scope).unwrap(), 5.0, 0.0);
    approx(evaluate("x and y", &scope).unwrap(), 0.0, 0.0);
    approx(evaluate("not x", &scope).unwrap(), 1.0, 0.0);
    approx(evaluate("0 < y <= 5", &scope).unwrap(), 1.0, 0.0);
    approx(evaluate("0 < y < 5", &scope).unwrap(), 0.0, 0.0);
}

/// it should provide the common math functions and pi
#[test]
fn builtin_functions() {
    let scope = vars(&[("frame", 90.0)]);
    approx(evaluate("sin(radians(frame))", &scope).unwrap(), 1.0, 1e-12);
    approx(evaluate("degrees(pi)", &scope).unwrap(), 180.0, 1e-9);
    approx(evaluate("min(3, 1, 2)", &scope).unwrap(), 1.0, 0.0);
    approx(evaluate("max(3, 1, 2)", &scope).unwrap(), 3.0, 0.0);
    approx(evaluate("clamp(1.5)", &scope).unwrap(), 1.0, 0.0);
    approx(evaluate("clamp(5, 0, 10)", &scope).unwrap(), 5.0, 0.0);
    approx(evaluate("lerp(0, 10, 0.25)", &scope).unwrap(), 2.5, 0.0);
    approx(evaluate("smoothstep(0, 1, 0.5)", &scope).unwrap(), 0.5, 1e-12);
    approx(evaluate("log(8, 2)", &scope).unwrap(), 3.0, 1e-12);
    approx(evaluate("fmod(-7, 3)", &scope).unwrap(), -1.0, 0.0);
}

/// it should surface runtime failures as errors rather than NaN
#[test]
fn runtime_errors() {
    let scope = vars(&[("z", 0.0)]);
    assert!(matches!(
        evaluate("1 / z", &scope),
        Err(ExprError::DivisionByZero { offset: 2 })
    ));
    assert!(matches!(
        evaluate("sqrt(-1)", &scope),
        Err(ExprError::Domain { op: "sqrt", .. })
    ));
    assert!(matches!(
        evaluate("missing + 1", &scope),
        Err(ExprError::UnknownName { offset: 0, .. })
    ));
}

/// it should cache compile results, including failures
#[test]
fn program_cache_memoises() {
    let mut cache = ProgramCache::new();
    let scope = vars(&[("a", 2.0)]);
    let v = cache.get_or_compile("a * a").unwrap().eval(&scope).unwrap();
    approx(v, 4.0, 0.0);
    assert!(cache.get_or_compile("a *").is_err());
    assert!(cache.get_or_compile("a *").unwrap_err().is_compile_time());
    assert_eq!(cache.len(), 2);
    cache.invalidate("a *");
    assert_eq!(cache.len(), 1);
}
