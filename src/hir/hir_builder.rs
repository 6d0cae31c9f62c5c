//! HIR Builder
//!
//! Small constructors for typed HIR, for callers that build crates by hand
//! (tests, tools feeding the expansion stage without a frontend).
//!
//! Every constructor fills in the node's type from its operands where the
//! type is obvious, so hand-built trees keep the "every node is typed"
//! contract without repeating types everywhere.

use crate::hir::hir_datatypes::{BorrowKind, CoreType, GenericPath, HirType, SimplePath};
use crate::hir::hir_nodes::{
    Binding, BindingId, CallPath, ClosureId, Expr, ExprKind, Function, FunctionArg,
    FunctionBody, FunctionReceiver, HirBinOp, Item, ItemKind, Literal, LocalUse,
    MethodResolution, Pattern, PatternBindingMode, PatternKind, TextLocation,
};

pub fn location(line: i32) -> TextLocation {
    TextLocation::new_just_line(line)
}

pub fn i32_ty() -> HirType {
    HirType::Primitive(CoreType::I32)
}

pub fn bool_ty() -> HirType {
    HirType::Primitive(CoreType::Bool)
}

pub fn path_ty(path: &str, params: Vec<HirType>) -> HirType {
    HirType::Path(GenericPath::lang(path, params))
}

// ============================================================
// Bodies
// ============================================================

/// Owns the locals of one function body while its expressions are built.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    locals: Vec<Binding>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binding(&mut self, name: &str, ty: HirType, mutable: bool) -> BindingId {
        let id = BindingId(self.locals.len() as u32);
        self.locals.push(Binding::new(name, ty, mutable));
        id
    }

    /// Declares a function argument bound to a fresh local.
    pub fn arg(&mut self, name: &str, ty: HirType, line: i32) -> (BindingId, FunctionArg) {
        let id = self.binding(name, ty.clone(), false);
        let arg = FunctionArg {
            pattern: Pattern::binding(id, location(line)),
            ty,
        };
        (id, arg)
    }

    pub fn ty(&self, id: BindingId) -> HirType {
        self.locals
            .get(id.0 as usize)
            .map(|binding| binding.ty.clone())
            .unwrap_or(HirType::Infer)
    }

    /// A read of a local, typed as the local.
    pub fn local(&self, id: BindingId, line: i32) -> Expr {
        Expr::new(
            ExprKind::Local(LocalUse::new(id)),
            self.ty(id),
            location(line),
        )
    }

    /// `let [mut] name = value;` Returns the new binding and the statement.
    pub fn let_binding(
        &mut self,
        name: &str,
        mutable: bool,
        value: Expr,
        line: i32,
    ) -> (BindingId, Expr) {
        let id = self.binding(name, value.ty.clone(), mutable);
        let statement = Expr::new(
            ExprKind::Let {
                pattern: Pattern::binding(id, location(line)),
                value: Some(Box::new(value)),
            },
            HirType::unit(),
            location(line),
        );
        (id, statement)
    }

    pub fn finish(self, root: Expr) -> FunctionBody {
        FunctionBody {
            locals: self.locals,
            root,
        }
    }

    pub fn locals(&self) -> &[Binding] {
        &self.locals
    }
}

// ============================================================
// Expressions
// ============================================================

pub fn int(value: i64, line: i32) -> Expr {
    Expr::new(
        ExprKind::Literal(Literal::Integer(value)),
        i32_ty(),
        location(line),
    )
}

pub fn unit(line: i32) -> Expr {
    Expr::new(ExprKind::Tuple(Vec::new()), HirType::unit(), location(line))
}

pub fn block(statements: Vec<Expr>, tail: Option<Expr>, line: i32) -> Expr {
    let ty = match &tail {
        Some(tail) => tail.ty.clone(),
        None => HirType::unit(),
    };

    Expr::new(
        ExprKind::Block {
            statements,
            tail: tail.map(Box::new),
        },
        ty,
        location(line),
    )
}

pub fn borrow(kind: BorrowKind, value: Expr, line: i32) -> Expr {
    let ty = HirType::borrow(kind, value.ty.clone());
    Expr::new(
        ExprKind::Borrow {
            kind,
            value: Box::new(value),
        },
        ty,
        location(line),
    )
}

/// Builtin dereference of a reference or a box.
pub fn deref(value: Expr, line: i32) -> Expr {
    let ty = value
        .ty
        .builtin_deref_target()
        .cloned()
        .unwrap_or(HirType::Infer);

    Expr::new(
        ExprKind::Deref {
            value: Box::new(value),
            resolution: None,
        },
        ty,
        location(line),
    )
}

pub fn field(value: Expr, name: &str, ty: HirType, line: i32) -> Expr {
    Expr::new(
        ExprKind::Field {
            value: Box::new(value),
            field: name.to_owned(),
        },
        ty,
        location(line),
    )
}

pub fn assign(target: Expr, value: Expr, line: i32) -> Expr {
    Expr::new(
        ExprKind::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
            resolution: None,
        },
        HirType::unit(),
        location(line),
    )
}

pub fn compound_assign(
    op: HirBinOp,
    target: Expr,
    value: Expr,
    resolution: Option<MethodResolution>,
    line: i32,
) -> Expr {
    Expr::new(
        ExprKind::Assign {
            op: Some(op),
            target: Box::new(target),
            value: Box::new(value),
            resolution,
        },
        HirType::unit(),
        location(line),
    )
}

pub fn binop(
    op: HirBinOp,
    left: Expr,
    right: Expr,
    resolution: Option<MethodResolution>,
    line: i32,
) -> Expr {
    let ty = if op.is_comparison() || matches!(op, HirBinOp::And | HirBinOp::Or) {
        bool_ty()
    } else {
        left.ty.clone()
    };

    Expr::new(
        ExprKind::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            resolution,
        },
        ty,
        location(line),
    )
}

/// Call of a free function by path.
pub fn call(path: &str, args: Vec<Expr>, ret: HirType, line: i32) -> Expr {
    Expr::new(
        ExprKind::CallPath {
            path: CallPath::Function(GenericPath::lang(path, Vec::new())),
            args,
        },
        ret,
        location(line),
    )
}

pub fn call_value(callee: Expr, args: Vec<Expr>, ret: HirType, line: i32) -> Expr {
    Expr::new(
        ExprKind::CallValue {
            callee: Box::new(callee),
            args,
            resolution: None,
        },
        ret,
        location(line),
    )
}

pub fn method_call(
    receiver: Expr,
    method: &str,
    args: Vec<Expr>,
    resolution: MethodResolution,
    ret: HirType,
    line: i32,
) -> Expr {
    Expr::new(
        ExprKind::CallMethod {
            receiver: Box::new(receiver),
            method: method.to_owned(),
            args,
            resolution: Some(resolution),
        },
        ret,
        location(line),
    )
}

pub fn closure(id: ClosureId, args: Vec<FunctionArg>, body: Expr, is_move: bool, line: i32) -> Expr {
    let ty = HirType::Closure {
        id,
        args: args.iter().map(|arg| arg.ty.clone()).collect(),
        ret: Box::new(body.ty.clone()),
    };

    Expr::new(
        ExprKind::Closure {
            id,
            args,
            ret: body.ty.clone(),
            body: Box::new(body),
            is_move,
        },
        ty,
        location(line),
    )
}

pub fn struct_literal(path: &str, fields: Vec<(&str, Expr)>, line: i32) -> Expr {
    let path = GenericPath::lang(path, Vec::new());
    Expr::new(
        ExprKind::StructLiteral {
            path: path.clone(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        },
        HirType::Path(path),
        location(line),
    )
}

pub fn ref_pattern(id: BindingId, mutable: bool, line: i32) -> Pattern {
    Pattern {
        kind: PatternKind::Binding {
            binding: id,
            mode: if mutable {
                PatternBindingMode::MutRef
            } else {
                PatternBindingMode::Ref
            },
            sub: None,
        },
        location: location(line),
    }
}

// ============================================================
// Items
// ============================================================

pub fn function(args: Vec<FunctionArg>, ret: HirType, body: FunctionBody) -> Function {
    Function {
        generics: Vec::new(),
        receiver: FunctionReceiver::Free,
        args,
        ret,
        body: Some(body),
    }
}

pub fn function_item(path: &str, function: Function, line: i32) -> Item {
    Item {
        path: SimplePath::new(path),
        location: location(line),
        kind: ItemKind::Function(function),
    }
}
