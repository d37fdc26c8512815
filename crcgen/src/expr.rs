// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A tiny arithmetic/bitwise expression tree with a constant-folding
//! `simplify()` pass, used by the code generator to collapse a C
//! expression into a single literal whenever every operand is known at
//! generate time, while leaving it as readable C source when an operand is
//! a runtime `cfg->field` reference.

use std::fmt;

/// A binary operator. `Display` renders it as the matching C token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

impl BinOp {
    fn token(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
        }
    }

    fn apply(self, a: u64, b: u64) -> u64 {
        match self {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Shl => a.wrapping_shl(b as u32),
            BinOp::Shr => a.wrapping_shr(b as u32),
            BinOp::And => a & b,
            BinOp::Or => a | b,
            BinOp::Xor => a ^ b,
        }
    }
}

/// A leaf: either a known integer (carrying both the numeric value and its
/// pre-rendered display form, e.g. zero-padded hex) or an opaque string
/// such as a `cfg->field` reference or a bare identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Int { value: u64, display: String },
    Str(String),
}

impl Terminal {
    pub fn int(value: u64, display: impl Into<String>) -> Self {
        Terminal::Int {
            value,
            display: display.into(),
        }
    }

    pub fn str(s: impl Into<String>) -> Self {
        Terminal::Str(s.into())
    }

    fn as_int(&self) -> Option<u64> {
        match self {
            Terminal::Int { value, .. } => Some(*value),
            Terminal::Str(_) => None,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Int { display, .. } => f.write_str(display),
            Terminal::Str(s) => f.write_str(s),
        }
    }
}

/// The expression tree. `Expr::Terminal` and `Expr::FunctionCall` are
/// leaves for the purposes of precedence (they never need outer
/// parentheses); every binary node and `Parenthesis` may need them
/// depending on context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Terminal(Terminal),
    Parenthesis(Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    FunctionCall(String, Vec<Expr>),
}

impl Expr {
    pub fn int(value: u64, display: impl Into<String>) -> Self {
        Expr::Terminal(Terminal::int(value, display))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Terminal(Terminal::str(s))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::FunctionCall(name.into(), args)
    }

    fn bin(op: BinOp, a: Expr, b: Expr) -> Self {
        Expr::BinOp(op, Box::new(a), Box::new(b))
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Add, a, b)
    }
    pub fn sub(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Sub, a, b)
    }
    pub fn mul(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Mul, a, b)
    }
    pub fn shl(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Shl, a, b)
    }
    pub fn shr(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Shr, a, b)
    }
    pub fn and(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::And, a, b)
    }
    pub fn or(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Or, a, b)
    }
    pub fn xor(a: Expr, b: Expr) -> Self {
        Self::bin(BinOp::Xor, a, b)
    }

    /// The integer value of this node, if it is (or folds to) a constant.
    pub fn const_value(&self) -> Option<u64> {
        match self {
            Expr::Terminal(t) => t.as_int(),
            Expr::Parenthesis(inner) => inner.const_value(),
            Expr::FunctionCall(..) => None,
            Expr::BinOp(op, a, b) => {
                let a = a.const_value()?;
                let b = b.const_value()?;
                Some(op.apply(a, b))
            }
        }
    }

    /// Whether this node renders without needing outer parentheses when
    /// nested under another operator (a leaf, or already-parenthesised).
    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Expr::Terminal(_) | Expr::FunctionCall(..) | Expr::Parenthesis(_)
        )
    }

    /// Fold constant subtrees and apply the algebraic identities from spec
    /// section 4.2. Consumes `self` since simplification rebuilds the tree
    /// bottom-up.
    pub fn simplify(self) -> Expr {
        self.simplify_for_width(None)
    }

    /// As [`Expr::simplify`], but also applies `x AND allones(width) = x`
    /// when `width` is known — the one identity in spec section 4.2 that
    /// needs context beyond the two operands themselves.
    pub fn simplify_for_width(self, width: Option<u32>) -> Expr {
        match self {
            Expr::Terminal(t) => Expr::Terminal(t),
            Expr::FunctionCall(name, args) => Expr::FunctionCall(
                name,
                args.into_iter().map(|a| a.simplify_for_width(width)).collect(),
            ),
            Expr::Parenthesis(inner) => {
                let inner = inner.simplify_for_width(width);
                if inner.is_atomic() {
                    inner
                } else {
                    Expr::Parenthesis(Box::new(inner))
                }
            }
            Expr::BinOp(op, a, b) => {
                let a = a.simplify_for_width(width);
                let b = b.simplify_for_width(width);
                simplify_binop(op, a, b, width)
            }
        }
    }
}

fn allones(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

fn simplify_binop(op: BinOp, a: Expr, b: Expr, width: Option<u32>) -> Expr {
    if let (Some(av), Some(bv)) = (a.const_value(), b.const_value()) {
        let folded = op.apply(av, bv);
        return Expr::int(folded, format!("{folded:#x}"));
    }
    let mask = width.map(allones);
    match (op, &a, &b) {
        (BinOp::And, _, _) if b.const_value() == Some(0) => Expr::int(0, "0x0"),
        (BinOp::And, _, _) if a.const_value() == Some(0) => Expr::int(0, "0x0"),
        (BinOp::And, _, _) if mask.is_some() && b.const_value() == mask => a,
        (BinOp::And, _, _) if mask.is_some() && a.const_value() == mask => b,
        (BinOp::Or, _, _) if b.const_value() == Some(0) => a,
        (BinOp::Or, _, _) if a.const_value() == Some(0) => b,
        (BinOp::Xor, _, _) if b.const_value() == Some(0) => a,
        (BinOp::Xor, _, _) if a.const_value() == Some(0) => b,
        (BinOp::Shl, _, _) if b.const_value() == Some(0) => a,
        (BinOp::Shr, _, _) if b.const_value() == Some(0) => a,
        (BinOp::Add, _, _) if b.const_value() == Some(0) => a,
        (BinOp::Add, _, _) if a.const_value() == Some(0) => b,
        (BinOp::Sub, _, _) if b.const_value() == Some(0) => a,
        (BinOp::Mul, _, _) if b.const_value() == Some(1) => a,
        (BinOp::Mul, _, _) if a.const_value() == Some(1) => b,
        (BinOp::Mul, _, _) if b.const_value() == Some(0) || a.const_value() == Some(0) => {
            Expr::int(0, "0x0")
        }
        _ => Expr::BinOp(op, Box::new(a), Box::new(b)),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Terminal(t) => write!(f, "{t}"),
            Expr::Parenthesis(inner) => write!(f, "({inner})"),
            Expr::FunctionCall(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::BinOp(op, a, b) => {
                write_operand(f, a)?;
                write!(f, " {} ", op.token())?;
                write_operand(f, b)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr) -> fmt::Result {
    if operand.is_atomic() {
        write!(f, "{operand}")
    } else {
        write!(f, "({operand})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_subtrees_fold() {
        let e = Expr::add(Expr::int(2, "0x2"), Expr::int(3, "0x3")).simplify();
        assert_eq!(e.const_value(), Some(5));
    }

    #[test]
    fn and_zero_is_zero() {
        let e = Expr::and(Expr::str("cfg->width"), Expr::int(0, "0x0")).simplify();
        assert_eq!(e.const_value(), Some(0));
    }

    #[test]
    fn and_allones_is_identity_when_width_known() {
        let e = Expr::and(Expr::str("crc"), Expr::int(0xff, "0xff")).simplify_for_width(Some(8));
        assert_eq!(format!("{e}"), "crc");
    }

    #[test]
    fn and_allones_is_not_simplified_without_width_context() {
        let e = Expr::and(Expr::str("crc"), Expr::int(0xff, "0xff")).simplify();
        assert_eq!(format!("{e}"), "crc & 0xff");
    }

    #[test]
    fn or_zero_is_identity() {
        let e = Expr::or(Expr::str("cfg->width"), Expr::int(0, "0x0")).simplify();
        assert_eq!(format!("{e}"), "cfg->width");
    }

    #[test]
    fn xor_zero_is_identity() {
        let e = Expr::xor(Expr::str("crc"), Expr::int(0, "0x0")).simplify();
        assert_eq!(format!("{e}"), "crc");
    }

    #[test]
    fn shift_by_zero_is_identity() {
        let e = Expr::shl(Expr::str("crc"), Expr::int(0, "0x0")).simplify();
        assert_eq!(format!("{e}"), "crc");
    }

    #[test]
    fn mul_by_one_and_zero() {
        assert_eq!(
            format!("{}", Expr::mul(Expr::str("x"), Expr::int(1, "0x1")).simplify()),
            "x"
        );
        assert_eq!(
            Expr::mul(Expr::str("x"), Expr::int(0, "0x0"))
                .simplify()
                .const_value(),
            Some(0)
        );
    }

    #[test]
    fn parenthesis_unwraps_atomic_child() {
        let e = Expr::Parenthesis(Box::new(Expr::str("cfg->width"))).simplify();
        assert_eq!(format!("{e}"), "cfg->width");
    }

    #[test]
    fn non_constant_expression_preserves_precedence() {
        let e = Expr::shr(
            Expr::add(Expr::str("crc"), Expr::str("cfg->xor_in")),
            Expr::int(8, "0x8"),
        );
        assert_eq!(format!("{e}"), "(crc + cfg->xor_in) >> 0x8");
    }

    #[test]
    fn function_call_renders_args() {
        let e = Expr::call("crc_reflect", vec![Expr::str("crc"), Expr::int(32, "0x20")]);
        assert_eq!(format!("{e}"), "crc_reflect(crc, 0x20)");
    }
}
