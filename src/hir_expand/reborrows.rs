//! ============================================================
//!                     Reborrow Insertion
//! ============================================================
//! Passing a reference held in a place moves the reference. When the same
//! binding is used again afterwards, the move is replaced by a reborrow:
//! `f(r)` -> `f(&mut *r)`, `x = r` -> `x = &*r`, `let y = r` -> `let y = &*r`.
//!
//! A reborrow is inserted when
//!  - the value is a place (not a fresh `&..` expression or a call result),
//!  - its type is a reference at least as strong as the slot it goes into,
//!  - the place's root binding is used again later (usage annotation's
//!    `last_use` is past this use).
//!
//! Closure expansion and UFCS normalization both create new call sites,
//! so every body is re-annotated here before the rewrite.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_datatypes::HirType;
use crate::hir::hir_nodes::{
    Binding, CallPath, Crate, Expr, ExprKind, Function, FunctionBody, PatternBindingMode,
    PatternKind,
};
use crate::hir::hir_traits::{SignatureTable, TraitTable};
use crate::hir::hir_visitor::{FunctionScope, HirVisitorMut, for_each_function_mut, walk_expr_mut};
use crate::hir_expand::annotate_usage::{AnnotationMode, annotate_function};
use crate::hir_expand::{ExpansionReport, PassOptions};
use crate::reborrow_log;

pub(crate) fn run(
    krate: &mut Crate,
    options: &PassOptions,
    report: &mut ExpansionReport,
) -> Result<(), CompilerError> {
    let table = TraitTable::build(krate);
    let signatures = SignatureTable::build(krate);

    let counts = for_each_function_mut(krate, options.parallel, |scope, function| {
        annotate_function(&table, scope, function, AnnotationMode::Refresh)?;
        insert_function_reborrows(&signatures, scope, function)
    })?;

    report.reborrows_inserted += counts.iter().sum::<usize>();

    Ok(())
}

/// Expects fresh usage annotations on `function`.
pub(crate) fn insert_function_reborrows(
    signatures: &SignatureTable,
    scope: &FunctionScope,
    function: &mut Function,
) -> Result<usize, CompilerError> {
    let Some(FunctionBody { locals, root }) = &mut function.body else {
        return Ok(0);
    };

    let mut inserter = ReborrowInserter {
        signatures,
        locals: &locals[..],
        inserted: 0,
    };
    inserter.visit_expr(root)?;

    if inserter.inserted > 0 {
        reborrow_log!(
            Green "Inserted ", inserter.inserted, " reborrows in ",
            Bright scope.function_path().components.join("::")
        );
    }

    Ok(inserter.inserted)
}

struct ReborrowInserter<'a> {
    signatures: &'a SignatureTable,
    locals: &'a [Binding],
    inserted: usize,
}

impl HirVisitorMut for ReborrowInserter<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        walk_expr_mut(self, expr)?;

        match &mut expr.kind {
            ExprKind::CallPath { path, args } => {
                let slots = self.call_path_slots(path);
                for (index, arg) in args.iter_mut().enumerate() {
                    let slot = slots.as_ref().and_then(|slots| slots.get(index)).cloned();
                    self.reborrow(arg, slot.as_ref());
                }
            }

            ExprKind::CallValue { callee, args, .. } => {
                let slots = function_pointer_args(&callee.ty).map(<[HirType]>::to_vec);
                for (index, arg) in args.iter_mut().enumerate() {
                    let slot = slots.as_ref().and_then(|slots| slots.get(index)).cloned();
                    self.reborrow(arg, slot.as_ref());
                }
            }

            ExprKind::Assign {
                op: None,
                target,
                value,
                ..
            } => {
                let slot = target.ty.to_owned();
                self.reborrow(value, Some(&slot));
            }

            ExprKind::Let {
                pattern,
                value: Some(value),
            } => {
                // Only plain `let name = ..` has a single slot type
                let slot = match &pattern.kind {
                    PatternKind::Binding {
                        binding,
                        mode: PatternBindingMode::Move,
                        sub: None,
                    } => self
                        .locals
                        .get(binding.0 as usize)
                        .map(|local| local.ty.to_owned()),
                    _ => None,
                };

                if let Some(slot) = slot {
                    self.reborrow(value, Some(&slot));
                }
            }

            _ => {}
        }

        Ok(())
    }
}

impl ReborrowInserter<'_> {
    /// Declared argument types of the callee, when the callee is known.
    fn call_path_slots(&self, path: &CallPath) -> Option<Vec<HirType>> {
        match path {
            CallPath::Function(callee) => self.signatures.function(&callee.path).map(|slots| {
                slots
                    .iter()
                    .map(|slot| slot.substitute(&callee.params))
                    .collect()
            }),

            CallPath::UfcsKnown {
                trait_path, method, ..
            } => self
                .signatures
                .trait_method(&trait_path.path, method)
                .map(<[HirType]>::to_vec),

            CallPath::UfcsInherent { .. } => None,
        }
    }

    /// Rewrites `value` into `&[mut] *value` when it qualifies.
    /// Without a known slot the value's own reference kind is kept.
    fn reborrow(&mut self, value: &mut Expr, slot: Option<&HirType>) {
        let Some((kind, _)) = value.ty.as_reference() else {
            return;
        };

        let reborrow_kind = match slot {
            Some(slot) => match slot.as_reference() {
                Some((slot_kind, _)) => slot_kind,
                // Generic or by-value slots take the reference as it is
                None => return,
            },
            None => kind,
        };

        // Shared references are never upgraded, unique ones may be weakened
        if kind < reborrow_kind || !value.is_place() || !self.used_later(value) {
            return;
        }

        let location = value.location.to_owned();
        let reference_ty = value.ty.to_owned();
        let Some(target) = reference_ty.builtin_deref_target().cloned() else {
            return;
        };

        let placeholder = Expr::new(ExprKind::Tuple(Vec::new()), HirType::unit(), location.to_owned());
        let original = std::mem::replace(value, placeholder);

        let deref = Expr::new(
            ExprKind::Deref {
                value: Box::new(original),
                resolution: None,
            },
            target.to_owned(),
            location.to_owned(),
        );

        *value = Expr::new(
            ExprKind::Borrow {
                kind: reborrow_kind,
                value: Box::new(deref),
            },
            HirType::borrow(reborrow_kind, target),
            location,
        );

        self.inserted += 1;
    }

    fn used_later(&self, place: &Expr) -> bool {
        let Some(root) = place.place_root() else {
            return false;
        };

        self.locals
            .get(root.binding.0 as usize)
            .and_then(|binding| binding.last_use)
            .is_some_and(|last_use| last_use > root.seq)
    }
}

fn function_pointer_args(ty: &HirType) -> Option<&[HirType]> {
    match ty {
        HirType::Function { args, .. } => Some(args),
        HirType::Borrow { inner, .. } => function_pointer_args(inner),
        _ => None,
    }
}
