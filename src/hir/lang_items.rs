//! Well-known paths the expansion passes have to name explicitly.
//!
//! Upstream stages resolve these once; the passes only ever spell them out.

use crate::hir::hir_nodes::{HirBinOp, HirUniOp};

pub const OWNED_BOX: &str = "alloc::boxed::Box";
pub const BOX_NEW: &str = "new";

pub const COPY_TRAIT: &str = "core::marker::Copy";

pub const FN_TRAIT: &str = "core::ops::Fn";
pub const FN_MUT_TRAIT: &str = "core::ops::FnMut";
pub const FN_ONCE_TRAIT: &str = "core::ops::FnOnce";
pub const FN_ONCE_OUTPUT: &str = "Output";

pub const DEREF_TRAIT: &str = "core::ops::Deref";
pub const DEREF_MUT_TRAIT: &str = "core::ops::DerefMut";
pub const INDEX_TRAIT: &str = "core::ops::Index";
pub const INDEX_MUT_TRAIT: &str = "core::ops::IndexMut";

pub const PARTIAL_EQ_TRAIT: &str = "core::cmp::PartialEq";
pub const PARTIAL_ORD_TRAIT: &str = "core::cmp::PartialOrd";

/// Call-trait method names, indexed the same way as `CallTrait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallTrait {
    Fn,
    FnMut,
    FnOnce,
}

impl CallTrait {
    pub fn path(self) -> &'static str {
        match self {
            CallTrait::Fn => FN_TRAIT,
            CallTrait::FnMut => FN_MUT_TRAIT,
            CallTrait::FnOnce => FN_ONCE_TRAIT,
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            CallTrait::Fn => "call",
            CallTrait::FnMut => "call_mut",
            CallTrait::FnOnce => "call_once",
        }
    }

    pub fn from_path(path: &crate::hir::hir_datatypes::SimplePath) -> Option<CallTrait> {
        if path.is(FN_TRAIT) {
            Some(CallTrait::Fn)
        } else if path.is(FN_MUT_TRAIT) {
            Some(CallTrait::FnMut)
        } else if path.is(FN_ONCE_TRAIT) {
            Some(CallTrait::FnOnce)
        } else {
            None
        }
    }
}

/// Operator trait and method for an overloadable binary operator.
/// `&&` and `||` can't be overloaded.
pub fn binop_trait(op: HirBinOp) -> Option<(&'static str, &'static str)> {
    let pair = match op {
        HirBinOp::Add => ("core::ops::Add", "add"),
        HirBinOp::Sub => ("core::ops::Sub", "sub"),
        HirBinOp::Mul => ("core::ops::Mul", "mul"),
        HirBinOp::Div => ("core::ops::Div", "div"),
        HirBinOp::Rem => ("core::ops::Rem", "rem"),
        HirBinOp::BitAnd => ("core::ops::BitAnd", "bitand"),
        HirBinOp::BitOr => ("core::ops::BitOr", "bitor"),
        HirBinOp::BitXor => ("core::ops::BitXor", "bitxor"),
        HirBinOp::Shl => ("core::ops::Shl", "shl"),
        HirBinOp::Shr => ("core::ops::Shr", "shr"),
        HirBinOp::Eq => (PARTIAL_EQ_TRAIT, "eq"),
        HirBinOp::Ne => (PARTIAL_EQ_TRAIT, "ne"),
        HirBinOp::Lt => (PARTIAL_ORD_TRAIT, "lt"),
        HirBinOp::Le => (PARTIAL_ORD_TRAIT, "le"),
        HirBinOp::Gt => (PARTIAL_ORD_TRAIT, "gt"),
        HirBinOp::Ge => (PARTIAL_ORD_TRAIT, "ge"),
        HirBinOp::And | HirBinOp::Or => return None,
    };

    Some(pair)
}

/// Compound assignment trait and method, e.g. `+=` -> `AddAssign::add_assign`.
pub fn assign_op_trait(op: HirBinOp) -> Option<(&'static str, &'static str)> {
    let pair = match op {
        HirBinOp::Add => ("core::ops::AddAssign", "add_assign"),
        HirBinOp::Sub => ("core::ops::SubAssign", "sub_assign"),
        HirBinOp::Mul => ("core::ops::MulAssign", "mul_assign"),
        HirBinOp::Div => ("core::ops::DivAssign", "div_assign"),
        HirBinOp::Rem => ("core::ops::RemAssign", "rem_assign"),
        HirBinOp::BitAnd => ("core::ops::BitAndAssign", "bitand_assign"),
        HirBinOp::BitOr => ("core::ops::BitOrAssign", "bitor_assign"),
        HirBinOp::BitXor => ("core::ops::BitXorAssign", "bitxor_assign"),
        HirBinOp::Shl => ("core::ops::ShlAssign", "shl_assign"),
        HirBinOp::Shr => ("core::ops::ShrAssign", "shr_assign"),
        _ => return None,
    };

    Some(pair)
}

pub fn uniop_trait(op: HirUniOp) -> (&'static str, &'static str) {
    match op {
        HirUniOp::Neg => ("core::ops::Neg", "neg"),
        HirUniOp::Not => ("core::ops::Not", "not"),
    }
}
