//! ============================================================
//!                     UFCS Normalization
//! ============================================================
//! Turns every implicit dispatch site into an explicit path call:
//!  - `a.m(b)`        -> `<T as Trait>::m(adjust(a), b)` / `<T>::m(adjust(a), b)`
//!  - `a + b`         -> `<A as Add<B>>::add(a, b)`   (comparisons borrow both sides)
//!  - `a += b`        -> `<A as AddAssign<B>>::add_assign(&mut a, b)`
//!  - `-a`            -> `<A as Neg>::neg(a)`
//!  - `v[i]`          -> `*<V as Index<I>>::index(&v, i)`  (`IndexMut` when written)
//!  - `*x`            -> `*<X as Deref>::deref(&x)`         (`DerefMut` when written)
//!  - `f(a, b)`       -> `<F as Fn<(A, B)>>::call(&f, (a, b))`
//!
//! Operators on primitives and derefs of references and boxes stay builtin.
//! Calls through function pointers stay value calls.
//!
//! Rewritten sites carry no resolution, so running the pass again is a no-op.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_datatypes::{BorrowKind, GenericPath, HirType};
use crate::hir::hir_nodes::{
    CallPath, Crate, DerefStep, Expr, ExprKind, Function, ImplSource, MethodResolution,
    ReceiverAdjust, TextLocation,
};
use crate::hir::hir_traits::TraitTable;
use crate::hir::hir_visitor::{FunctionScope, HirVisitorMut, for_each_function_mut, walk_expr_mut};
use crate::hir::lang_items::{self, CallTrait};
use crate::hir_expand::{ExpansionReport, PassOptions};
use crate::{return_hir_transformation_error, ufcs_log};

pub(crate) fn run(
    krate: &mut Crate,
    options: &PassOptions,
    report: &mut ExpansionReport,
) -> Result<(), CompilerError> {
    let table = TraitTable::build(krate);

    let counts = for_each_function_mut(krate, options.parallel, |scope, function| {
        normalize_function(&table, options.verify_dispatch, scope, function)
    })?;

    report.dispatch_sites_normalized += counts.iter().sum::<usize>();

    Ok(())
}

/// Normalizes one function body, returning how many sites were rewritten.
pub(crate) fn normalize_function(
    table: &TraitTable,
    verify_dispatch: bool,
    scope: &FunctionScope,
    function: &mut Function,
) -> Result<usize, CompilerError> {
    let Some(body) = &mut function.body else {
        return Ok(0);
    };

    let mut normalizer = UfcsNormalizer {
        table,
        verify_dispatch,
        normalized: 0,
        written: false,
    };
    normalizer.visit_expr(&mut body.root)?;

    if normalizer.normalized > 0 {
        ufcs_log!(
            Green "Normalized ", normalizer.normalized, " dispatch sites in ",
            Bright scope.function_path().components.join("::")
        );
    }

    Ok(normalizer.normalized)
}

struct UfcsNormalizer<'a> {
    table: &'a TraitTable,
    verify_dispatch: bool,
    normalized: usize,

    /// The expression about to be visited is a place written through.
    written: bool,
}

impl HirVisitorMut for UfcsNormalizer<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        let written = std::mem::take(&mut self.written);

        // Children first, so rewritten operands are already explicit
        self.visit_children(expr, written)?;

        let location = expr.location.to_owned();
        let placeholder = ExprKind::Tuple(Vec::new());
        let kind = std::mem::replace(&mut expr.kind, placeholder);

        let (kind, rewritten) = self.rewrite(kind, &expr.ty, &location, written)?;
        expr.kind = kind;

        if rewritten {
            self.normalized += 1;
            if self.verify_dispatch {
                self.verify(expr)?;
            }
        }

        Ok(())
    }
}

impl UfcsNormalizer<'_> {
    /// Visits the children of `expr`, telling each place whether it is written.
    /// `written` is the context of `expr` itself.
    fn visit_children(&mut self, expr: &mut Expr, written: bool) -> Result<(), CompilerError> {
        match &mut expr.kind {
            ExprKind::Assign { target, value, .. } => {
                self.visit_expr(value)?;
                self.visit_place(target, true)
            }

            ExprKind::Borrow { kind, value } => {
                let unique = *kind == BorrowKind::Unique;
                self.visit_place(value, unique)
            }

            ExprKind::Field { value, .. } => self.visit_place(value, written),

            ExprKind::Index { value, index, .. } => {
                self.visit_place(value, written)?;
                self.visit_expr(index)
            }

            // Writing through `&T` never needs unique access to the reference
            ExprKind::Deref { value, .. } => {
                let through_shared = matches!(value.ty.as_reference(), Some((BorrowKind::Shared, _)));
                self.visit_place(value, written && !through_shared)
            }

            ExprKind::CallMethod {
                receiver,
                args,
                resolution,
                ..
            } => {
                let autoref = resolution.as_ref().and_then(|resolution| resolution.adjust.autoref);
                self.visit_place(receiver, autoref == Some(BorrowKind::Unique))?;
                for arg in args {
                    self.visit_expr(arg)?;
                }
                Ok(())
            }

            _ => walk_expr_mut(self, expr),
        }
    }

    fn visit_place(&mut self, place: &mut Expr, written: bool) -> Result<(), CompilerError> {
        self.written = written;
        self.visit_expr(place)
    }

    /// Returns the new kind and whether it changed.
    fn rewrite(
        &self,
        kind: ExprKind,
        ty: &HirType,
        location: &TextLocation,
        written: bool,
    ) -> Result<(ExprKind, bool), CompilerError> {
        match kind {
            ExprKind::CallMethod {
                receiver,
                method,
                args,
                resolution,
            } => {
                let Some(resolution) = resolution else {
                    return_hir_transformation_error!(
                        format!("Method call '{method}' reached UFCS normalization without a resolution"),
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };

                let receiver = apply_adjust(*receiver, &resolution.adjust, location)?;
                let path = match resolution.trait_path {
                    Some(trait_path) => CallPath::UfcsKnown {
                        self_ty: resolution.self_ty,
                        trait_path,
                        method,
                        params: resolution.method_params,
                    },
                    None => CallPath::UfcsInherent {
                        self_ty: resolution.self_ty,
                        method,
                        params: resolution.method_params,
                    },
                };

                let mut call_args = Vec::with_capacity(args.len() + 1);
                call_args.push(receiver);
                call_args.extend(args);

                Ok((ExprKind::CallPath { path, args: call_args }, true))
            }

            ExprKind::BinOp {
                op,
                left,
                right,
                resolution,
            } => {
                let Some((trait_name, method)) = lang_items::binop_trait(op) else {
                    return Ok((ExprKind::BinOp { op, left, right, resolution }, false));
                };

                let Some(resolution) =
                    self.overloaded(resolution, &[&left.ty, &right.ty], location)?
                else {
                    return Ok((ExprKind::BinOp { op, left, right, resolution: None }, false));
                };

                let trait_path = resolution
                    .trait_path
                    .clone()
                    .unwrap_or_else(|| GenericPath::lang(trait_name, vec![right.ty.to_owned()]));

                let args = if op.is_comparison() {
                    vec![
                        borrow_expr(BorrowKind::Shared, *left),
                        borrow_expr(BorrowKind::Shared, *right),
                    ]
                } else {
                    vec![*left, *right]
                };

                Ok((trait_call(resolution, trait_path, method, args), true))
            }

            ExprKind::UniOp {
                op,
                operand,
                resolution,
            } => {
                let Some(resolution) = self.overloaded(resolution, &[&operand.ty], location)?
                else {
                    return Ok((ExprKind::UniOp { op, operand, resolution: None }, false));
                };

                let (trait_name, method) = lang_items::uniop_trait(op);
                let trait_path = resolution
                    .trait_path
                    .clone()
                    .unwrap_or_else(|| GenericPath::lang(trait_name, Vec::new()));

                Ok((trait_call(resolution, trait_path, method, vec![*operand]), true))
            }

            ExprKind::Assign {
                op: Some(op),
                target,
                value,
                resolution,
            } => {
                let Some((trait_name, method)) = lang_items::assign_op_trait(op) else {
                    return_hir_transformation_error!(
                        format!("'{op:?}' can't be used as a compound assignment"),
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };

                let Some(resolution) =
                    self.overloaded(resolution, &[&target.ty, &value.ty], location)?
                else {
                    return Ok((
                        ExprKind::Assign {
                            op: Some(op),
                            target,
                            value,
                            resolution: None,
                        },
                        false,
                    ));
                };

                let trait_path = resolution
                    .trait_path
                    .clone()
                    .unwrap_or_else(|| GenericPath::lang(trait_name, vec![value.ty.to_owned()]));

                let args = vec![borrow_expr(BorrowKind::Unique, *target), *value];
                Ok((trait_call(resolution, trait_path, method, args), true))
            }

            ExprKind::Index {
                value,
                index,
                resolution,
            } => {
                let Some(resolution) = self.overloaded(resolution, &[&value.ty], location)? else {
                    return Ok((ExprKind::Index { value, index, resolution: None }, false));
                };

                let (trait_name, method, kind) = if written {
                    (lang_items::INDEX_MUT_TRAIT, "index_mut", BorrowKind::Unique)
                } else {
                    (lang_items::INDEX_TRAIT, "index", BorrowKind::Shared)
                };

                let params = match &resolution.trait_path {
                    Some(path) => path.params.to_owned(),
                    None => vec![index.ty.to_owned()],
                };
                let trait_path = GenericPath::lang(trait_name, params);

                let call = Expr::new(
                    trait_call(
                        resolution,
                        trait_path,
                        method,
                        vec![borrow_expr(kind, *value), *index],
                    ),
                    HirType::borrow(kind, ty.to_owned()),
                    location.to_owned(),
                );

                Ok((builtin_deref_kind(call), true))
            }

            ExprKind::Deref { value, resolution } => {
                if value.ty.builtin_deref_target().is_some() {
                    return Ok((ExprKind::Deref { value, resolution: None }, false));
                }

                let Some(resolution) = resolution else {
                    return_hir_transformation_error!(
                        format!("Dereference of '{:?}' has no Deref resolution", value.ty),
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };

                let kind = if written {
                    BorrowKind::Unique
                } else {
                    BorrowKind::Shared
                };

                let call = overloaded_deref(*value, ty, kind, location);
                Ok((builtin_deref_kind(call), true))
            }

            ExprKind::CallValue {
                callee,
                args,
                resolution,
            } => {
                if is_function_pointer(&callee.ty) {
                    return Ok((ExprKind::CallValue { callee, args, resolution: None }, false));
                }

                let Some(resolution) = resolution else {
                    return_hir_transformation_error!(
                        format!("Call of a '{:?}' value has no call trait resolution", callee.ty),
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };

                let Some(trait_path) = resolution.trait_path.clone() else {
                    return_hir_transformation_error!(
                        "Value call resolved to an inherent method",
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };

                let Some(call_trait) = CallTrait::from_path(&trait_path.path) else {
                    return_hir_transformation_error!(
                        format!("Value call resolved to '{}', which is not a call trait", trait_path.path),
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };

                let autoref = resolution.adjust.autoref.or(match call_trait {
                    CallTrait::Fn => Some(BorrowKind::Shared),
                    CallTrait::FnMut => Some(BorrowKind::Unique),
                    CallTrait::FnOnce => None,
                });
                let adjust = ReceiverAdjust {
                    derefs: resolution.adjust.derefs.to_owned(),
                    autoref,
                };

                let receiver = apply_adjust(*callee, &adjust, location)?;
                let args_ty = HirType::Tuple(args.iter().map(|arg| arg.ty.to_owned()).collect());
                let packed = Expr::new(ExprKind::Tuple(args), args_ty, location.to_owned());

                Ok((
                    trait_call(resolution, trait_path, call_trait.method(), vec![receiver, packed]),
                    true,
                ))
            }

            other => Ok((other, false)),
        }
    }

    /// The resolution to dispatch through, or None when the operation stays builtin.
    fn overloaded(
        &self,
        resolution: Option<MethodResolution>,
        operands: &[&HirType],
        location: &TextLocation,
    ) -> Result<Option<MethodResolution>, CompilerError> {
        let primitive = operands.iter().all(|ty| is_primitive_operand(ty));

        match resolution {
            Some(resolution) if primitive && resolution.source == ImplSource::Builtin => Ok(None),
            Some(resolution) => Ok(Some(resolution)),
            None if primitive => Ok(None),
            None => {
                return_hir_transformation_error!(
                    format!(
                        "Operation on '{:?}' has no operator trait resolution",
                        operands.first().map(|ty| (*ty).to_owned()).unwrap_or(HirType::Infer)
                    ),
                    location.to_owned(),
                    { CompilationStage => "UFCS Normalization" }
                );
            }
        }
    }

    /// Explicit trait calls on concrete types must name an impl that exists.
    fn verify(&self, expr: &Expr) -> Result<(), CompilerError> {
        // Index and Deref rewrites wrap the call in a builtin deref
        let expr = match &expr.kind {
            ExprKind::Deref { value, .. } => value,
            _ => expr,
        };

        let ExprKind::CallPath {
            path:
                CallPath::UfcsKnown {
                    self_ty,
                    trait_path,
                    method,
                    ..
                },
            ..
        } = &expr.kind
        else {
            return Ok(());
        };

        if !self.table.is_declared_trait(&trait_path.path) || !is_concrete(self_ty) {
            return Ok(());
        }

        if self.table.find_impl(trait_path, self_ty).is_none() {
            return_hir_transformation_error!(
                format!(
                    "No impl of '{}' for '{self_ty:?}' provides '{method}'",
                    trait_path.path
                ),
                expr.location.to_owned(),
                {
                    CompilationStage => "UFCS Normalization",
                    TraitName => "explicit trait call",
                }
            );
        }

        Ok(())
    }
}

// ============================================================
// Builders
// ============================================================

fn borrow_expr(kind: BorrowKind, value: Expr) -> Expr {
    let location = value.location.to_owned();
    let ty = HirType::borrow(kind, value.ty.to_owned());
    Expr::new(
        ExprKind::Borrow {
            kind,
            value: Box::new(value),
        },
        ty,
        location,
    )
}

/// `*value` where `value` is a reference produced by a trait call.
fn builtin_deref_kind(value: Expr) -> ExprKind {
    ExprKind::Deref {
        value: Box::new(value),
        resolution: None,
    }
}

fn trait_call(
    resolution: MethodResolution,
    trait_path: GenericPath,
    method: &str,
    args: Vec<Expr>,
) -> ExprKind {
    ExprKind::CallPath {
        path: CallPath::UfcsKnown {
            self_ty: resolution.self_ty,
            trait_path,
            method: method.to_owned(),
            params: resolution.method_params,
        },
        args,
    }
}

/// `<T as Deref>::deref(&value)`, typed `&target`.
fn overloaded_deref(
    value: Expr,
    target: &HirType,
    kind: BorrowKind,
    location: &TextLocation,
) -> Expr {
    let (trait_name, method) = match kind {
        BorrowKind::Shared => (lang_items::DEREF_TRAIT, "deref"),
        BorrowKind::Unique => (lang_items::DEREF_MUT_TRAIT, "deref_mut"),
    };

    let self_ty = value.ty.to_owned();
    Expr::new(
        ExprKind::CallPath {
            path: CallPath::UfcsKnown {
                self_ty,
                trait_path: GenericPath::lang(trait_name, Vec::new()),
                method: method.to_owned(),
                params: Vec::new(),
            },
            args: vec![borrow_expr(kind, value)],
        },
        HirType::borrow(kind, target.to_owned()),
        location.to_owned(),
    )
}

/// Applies a receiver's auto-deref steps and auto-ref.
/// Overloaded steps use `DerefMut` when the receiver ends up borrowed mutably.
fn apply_adjust(
    receiver: Expr,
    adjust: &ReceiverAdjust,
    location: &TextLocation,
) -> Result<Expr, CompilerError> {
    let deref_kind = match adjust.autoref {
        Some(BorrowKind::Unique) => BorrowKind::Unique,
        _ => BorrowKind::Shared,
    };

    let mut current = receiver;
    for step in &adjust.derefs {
        current = match step {
            DerefStep::Builtin => {
                let Some(target) = current.ty.builtin_deref_target().cloned() else {
                    return_hir_transformation_error!(
                        format!("Builtin auto-deref of '{:?}', which is not a pointer", current.ty),
                        location.to_owned(),
                        { CompilationStage => "UFCS Normalization" }
                    );
                };
                Expr::new(builtin_deref_kind(current), target, location.to_owned())
            }

            DerefStep::Overloaded { target, .. } => {
                let call = overloaded_deref(current, target, deref_kind, location);
                Expr::new(builtin_deref_kind(call), target.to_owned(), location.to_owned())
            }
        };
    }

    Ok(match adjust.autoref {
        Some(kind) => borrow_expr(kind, current),
        None => current,
    })
}

// ============================================================
// Type queries
// ============================================================

/// Operands builtin operators work on: primitives, and references to them.
pub(crate) fn is_primitive_operand(ty: &HirType) -> bool {
    match ty {
        HirType::Primitive(_) | HirType::Diverge => true,
        HirType::Borrow { inner, .. } => is_primitive_operand(inner),
        _ => false,
    }
}

pub(crate) fn is_function_pointer(ty: &HirType) -> bool {
    match ty {
        HirType::Function { .. } => true,
        HirType::Borrow { inner, .. } => is_function_pointer(inner),
        _ => false,
    }
}

/// No generics, inference holes or erased types anywhere inside.
fn is_concrete(ty: &HirType) -> bool {
    let mut concrete = true;
    let mut check = |inner: &HirType| {
        if matches!(
            inner,
            HirType::Generic { .. }
                | HirType::Infer
                | HirType::ErasedType { .. }
                | HirType::TraitObject { .. }
        ) {
            concrete = false;
        }
    };
    check(ty);
    ty.for_each_type(&mut check);
    concrete
}
