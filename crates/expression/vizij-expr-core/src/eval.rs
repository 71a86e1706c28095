use std::f64::consts::PI;

use crate::ast::{BinaryOp, CmpOp, Expr, Func, UnaryOp};
use crate::error::ExprError;
use crate::Scope;

#[inline]
fn truth(v: f64) -> bool {
    v != 0.0
}

#[inline]
fn from_bool(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Python `%`: result takes the sign of the divisor.
fn py_mod(a: f64, b: f64) -> f64 {
    let m = a % b;
    if m != 0.0 && ((m < 0.0) != (b < 0.0)) {
        m + b
    } else {
        m
    }
}

pub(crate) fn eval(expr: &Expr, scope: &dyn Scope) -> Result<f64, ExprError> {
    match expr {
        Expr::Num(v) => Ok(*v),
        Expr::Name { name, offset } => match scope.lookup(name) {
            Some(v) => Ok(v),
            None if name == "pi" => Ok(PI),
            None => Err(ExprError::UnknownName {
                offset: *offset,
                name: name.clone(),
            }),
        },
        Expr::Unary { op, expr } => {
            let v = eval(expr, scope)?;
            Ok(match op {
                UnaryOp::Neg => -v,
                UnaryOp::Pos => v,
                UnaryOp::Not => from_bool(!truth(v)),
            })
        }
        Expr::Binary {
            op,
            left,
            right,
            offset,
        } => {
            let a = eval(left, scope)?;
            let b = eval(right, scope)?;
            match op {
                BinaryOp::Add => Ok(a + b),
                BinaryOp::Sub => Ok(a - b),
                BinaryOp::Mul => Ok(a * b),
                BinaryOp::Div => {
                    if b == 0.0 {
                        Err(ExprError::DivisionByZero { offset: *offset })
                    } else {
                        Ok(a / b)
                    }
                }
                BinaryOp::Mod => {
                    if b == 0.0 {
                        Err(ExprError::DivisionByZero { offset: *offset })
                    } else {
                        Ok(py_mod(a, b))
                    }
                }
                BinaryOp::Pow => {
                    if a == 0.0 && b < 0.0 {
                        return Err(ExprError::DivisionByZero { offset: *offset });
                    }
                    let r = a.powf(b);
                    if r.is_nan() && !a.is_nan() && !b.is_nan() {
                        return Err(ExprError::Domain {
                            offset: *offset,
                            op: "**",
                        });
                    }
                    Ok(r)
                }
            }
        }
        Expr::Compare { first, rest } => {
            let mut lhs = eval(first, scope)?;
            for (op, rhs_expr) in rest {
                let rhs = eval(rhs_expr, scope)?;
                let ok = match op {
                    CmpOp::Eq => lhs == rhs,
                    CmpOp::Ne => lhs != rhs,
                    CmpOp::Lt => lhs < rhs,
                    CmpOp::Le => lhs <= rhs,
                    CmpOp::Gt => lhs > rhs,
                    CmpOp::Ge => lhs >= rhs,
                };
                if !ok {
                    return Ok(0.0);
                }
                lhs = rhs;
            }
            Ok(1.0)
        }
        // Python semantics: `and`/`or` yield an operand, not a bool.
        Expr::And(l, r) => {
            let a = eval(l, scope)?;
            if truth(a) {
                eval(r, scope)
            } else {
                Ok(a)
            }
        }
        Expr::Or(l, r) => {
            let a = eval(l, scope)?;
            if truth(a) {
                Ok(a)
            } else {
                eval(r, scope)
            }
        }
        Expr::Cond {
            cond,
            then,
            otherwise,
        } => {
            if truth(eval(cond, scope)?) {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Call { func, args, offset } => {
            let mut vals = Vec::with_capacity(args.len());
            for a in args {
                vals.push(eval(a, scope)?);
            }
            call(*func, &vals, *offset)
        }
    }
}

fn call(func: Func, a: &[f64], offset: usize) -> Result<f64, ExprError> {
    let domain = |ok: bool, v: f64| {
        if ok {
            Ok(v)
        } else {
            Err(ExprError::Domain {
                offset,
                op: func.name(),
            })
        }
    };
    match func {
        Func::Sin => Ok(a[0].sin()),
        Func::Cos => Ok(a[0].cos()),
        Func::Tan => Ok(a[0].tan()),
        Func::Asin => domain((-1.0..=1.0).contains(&a[0]), a[0].asin()),
        Func::Acos => domain((-1.0..=1.0).contains(&a[0]), a[0].acos()),
        Func::Atan => Ok(a[0].atan()),
        Func::Atan2 => Ok(a[0].atan2(a[1])),
        Func::Sqrt => domain(a[0] >= 0.0, a[0].sqrt()),
        Func::Pow => {
            let r = a[0].powf(a[1]);
            domain(!r.is_nan() || a[0].is_nan() || a[1].is_nan(), r)
        }
        Func::Exp => Ok(a[0].exp()),
        Func::Log => {
            if a.len() == 2 {
                domain(a[0] > 0.0 && a[1] > 0.0 && a[1] != 1.0, a[0].ln() / a[1].ln())
            } else {
                domain(a[0] > 0.0, a[0].ln())
            }
        }
        Func::Log10 => domain(a[0] > 0.0, a[0].log10()),
        Func::Floor => Ok(a[0].floor()),
        Func::Ceil => Ok(a[0].ceil()),
        Func::Trunc => Ok(a[0].trunc()),
        // Python rounds half to even.
        Func::Round => {
            let r = a[0].round();
            if (a[0] - a[0].trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
                Ok(r - a[0].signum())
            } else {
                Ok(r)
            }
        }
        Func::Abs => Ok(a[0].abs()),
        Func::Min => Ok(a.iter().copied().fold(f64::INFINITY, f64::min)),
        Func::Max => Ok(a.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        Func::Fmod => {
            if a[1] == 0.0 {
                Err(ExprError::Domain {
                    offset,
                    op: func.name(),
                })
            } else {
                Ok(a[0] % a[1])
            }
        }
        Func::Radians => Ok(a[0].to_radians()),
        Func::Degrees => Ok(a[0].to_degrees()),
        Func::Clamp => {
            let lo = a.get(1).copied().unwrap_or(0.0);
            let hi = a.get(2).copied().unwrap_or(1.0);
            Ok(a[0].max(lo).min(hi))
        }
        Func::Lerp => Ok(a[0] + (a[1] - a[0]) * a[2]),
        Func::Smoothstep => {
            let (e0, e1, x) = (a[0], a[1], a[2]);
            if e0 == e1 {
                return Ok(if x < e0 { 0.0 } else { 1.0 });
            }
            let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
            Ok(t * t * (3.0 - 2.0 * t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_modulo_follows_divisor_sign() {
        assert_eq!(py_mod(-1.0, 3.0), 2.0);
        assert_eq!(py_mod(1.0, -3.0), -2.0);
        assert_eq!(py_mod(4.0, 2.0), 0.0);
    }

    #[test]
    fn round_half_to_even() {
        assert_eq!(call(Func::Round, &[2.5], 0).unwrap(), 2.0);
        assert_eq!(call(Func::Round, &[3.5], 0).unwrap(), 4.0);
        assert_eq!(call(Func::Round, &[-2.5], 0).unwrap(), -2.0);
        assert_eq!(call(Func::Round, &[1.4], 0).unwrap(), 1.0);
    }
}
