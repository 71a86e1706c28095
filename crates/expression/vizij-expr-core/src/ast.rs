#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Num(f64),
    /// Variable lookup, resolved against the scope at evaluation time.
    Name {
        name: String,
        offset: usize,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        offset: usize,
    },
    /// Python-style chained comparison: `a < b <= c` means `a < b and b <= c`.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// `then if cond else otherwise`
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
        offset: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sqrt,
    Pow,
    Exp,
    Log,
    Log10,
    Floor,
    Ceil,
    Trunc,
    Round,
    Abs,
    Min,
    Max,
    Fmod,
    Radians,
    Degrees,
    Clamp,
    Lerp,
    Smoothstep,
}

/// Accepted argument counts, inclusive.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Arity {
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
}

impl Func {
    pub(crate) fn lookup(name: &str) -> Option<Func> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "atan2" => Func::Atan2,
            "sqrt" => Func::Sqrt,
            "pow" => Func::Pow,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "trunc" | "int" => Func::Trunc,
            "round" => Func::Round,
            "abs" => Func::Abs,
            "min" => Func::Min,
            "max" => Func::Max,
            "fmod" => Func::Fmod,
            "radians" => Func::Radians,
            "degrees" => Func::Degrees,
            "clamp" => Func::Clamp,
            "lerp" => Func::Lerp,
            "smoothstep" => Func::Smoothstep,
            _ => return None,
        })
    }

    pub(crate) fn arity(self) -> Arity {
        let exact = |n| Arity {
            min: n,
            max: Some(n),
        };
        match self {
            Func::Atan2 | Func::Pow | Func::Fmod => exact(2),
            Func::Lerp | Func::Smoothstep => exact(3),
            Func::Log => Arity {
                min: 1,
                max: Some(2),
            },
            Func::Clamp => Arity {
                min: 1,
                max: Some(3),
            },
            Func::Min | Func::Max => Arity { min: 1, max: None },
            _ => exact(1),
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Atan2 => "atan2",
            Func::Sqrt => "sqrt",
            Func::Pow => "pow",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Log10 => "log10",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Trunc => "trunc",
            Func::Round => "round",
            Func::Abs => "abs",
            Func::Min => "min",
            Func::Max => "max",
            Func::Fmod => "fmod",
            Func::Radians => "radians",
            Func::Degrees => "degrees",
            Func::Clamp => "clamp",
            Func::Lerp => "lerp",
            Func::Smoothstep => "smoothstep",
        }
    }
}
