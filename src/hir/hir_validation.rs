//! HIR Validation
//!
//! Structural contract checks around the expansion passes.
//! `check_upstream` enforces what the type checker promised (every node typed),
//! `validate_after` enforces what the passes completed so far promise to
//! later stages. Checks are cumulative: after UFCS normalization the closure
//! contract still has to hold.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_datatypes::HirType;
use crate::hir::hir_nodes::{Crate, Expr, ExprKind, HirBinOp, TextLocation};
use crate::hir::hir_visitor::{HirVisitor, walk_expr, walk_item, walk_type};
use crate::hir_expand::ExpansionPass;
use crate::hir_expand::ufcs_everything::{is_function_pointer, is_primitive_operand};
use crate::return_hir_transformation_error;

const UPSTREAM_STAGE: &str = "Upstream Contract";

/// Every expression and declared type must be fully inferred.
pub fn check_upstream(krate: &Crate) -> Result<(), CompilerError> {
    ContractValidator::new(None).validate(krate)
}

/// Checks the contracts of `pass` and of every pass before it.
pub fn validate_after(krate: &Crate, pass: ExpansionPass) -> Result<(), CompilerError> {
    ContractValidator::new(Some(pass)).validate(krate)
}

struct ContractValidator {
    /// Last completed pass. `None` means no pass has run yet.
    completed: Option<ExpansionPass>,
    stage: &'static str,
    location: TextLocation,
}

impl ContractValidator {
    fn new(completed: Option<ExpansionPass>) -> Self {
        Self {
            completed,
            stage: completed.map(ExpansionPass::name).unwrap_or(UPSTREAM_STAGE),
            location: TextLocation::default(),
        }
    }

    fn validate(&mut self, krate: &Crate) -> Result<(), CompilerError> {
        for item in &krate.items {
            self.location = item.location.to_owned();
            walk_item(self, item)?;
        }

        for vtable in &krate.vtables {
            self.visit_type(&vtable.concrete)?;
        }

        Ok(())
    }

    fn after(&self, pass: ExpansionPass) -> bool {
        self.completed >= Some(pass)
    }

    fn check_expr(&self, expr: &Expr) -> Result<(), CompilerError> {
        let stage = self.stage;

        if self.after(ExpansionPass::Closures) && matches!(expr.kind, ExprKind::Closure { .. }) {
            return_hir_transformation_error!(
                "Closure literal survived closure expansion",
                expr.location.to_owned(),
                { CompilationStage => stage }
            );
        }

        if !self.after(ExpansionPass::Ufcs) {
            return Ok(());
        }

        match &expr.kind {
            ExprKind::CallMethod { method, .. } => {
                return_hir_transformation_error!(
                    format!("Method call '{method}' survived UFCS normalization"),
                    expr.location.to_owned(),
                    { CompilationStage => stage }
                );
            }

            ExprKind::BinOp { op, left, right, .. } => {
                let logical = matches!(op, HirBinOp::And | HirBinOp::Or);
                if !logical && !(is_primitive_operand(&left.ty) && is_primitive_operand(&right.ty)) {
                    return_hir_transformation_error!(
                        format!("Operator '{op:?}' on '{}' is still implicit", left.ty),
                        expr.location.to_owned(),
                        { CompilationStage => stage }
                    );
                }
            }

            ExprKind::UniOp { op, operand, .. } => {
                if !is_primitive_operand(&operand.ty) {
                    return_hir_transformation_error!(
                        format!("Operator '{op:?}' on '{}' is still implicit", operand.ty),
                        expr.location.to_owned(),
                        { CompilationStage => stage }
                    );
                }
            }

            ExprKind::Assign {
                op: Some(op),
                target,
                ..
            } => {
                if !is_primitive_operand(&target.ty) {
                    return_hir_transformation_error!(
                        format!("Compound assignment '{op:?}' on '{}' is still implicit", target.ty),
                        expr.location.to_owned(),
                        { CompilationStage => stage }
                    );
                }
            }

            ExprKind::Index { value, .. } => {
                if !is_primitive_operand(&value.ty) {
                    return_hir_transformation_error!(
                        format!("Indexing '{}' is still implicit", value.ty),
                        expr.location.to_owned(),
                        { CompilationStage => stage }
                    );
                }
            }

            ExprKind::Deref { value, .. } => {
                if value.ty.builtin_deref_target().is_none() {
                    return_hir_transformation_error!(
                        format!("Dereference of '{}' is still overloaded", value.ty),
                        expr.location.to_owned(),
                        { CompilationStage => stage }
                    );
                }
            }

            ExprKind::CallValue { callee, .. } => {
                if !is_function_pointer(&callee.ty) {
                    return_hir_transformation_error!(
                        format!("Call of a '{}' value is still implicit", callee.ty),
                        expr.location.to_owned(),
                        { CompilationStage => stage }
                    );
                }
            }

            _ => {}
        }

        Ok(())
    }

    fn check_type(&self, ty: &HirType) -> Result<(), CompilerError> {
        let stage = self.stage;

        match ty {
            HirType::Infer => {
                return_hir_transformation_error!(
                    "Found an uninferred type",
                    self.location.to_owned(),
                    { CompilationStage => stage }
                );
            }

            HirType::Closure { id, .. } if self.after(ExpansionPass::Closures) => {
                return_hir_transformation_error!(
                    format!("Type of {id} survived closure expansion"),
                    self.location.to_owned(),
                    { CompilationStage => stage }
                );
            }

            HirType::ErasedType { origin, index, .. } if self.after(ExpansionPass::ErasedType) => {
                return_hir_transformation_error!(
                    format!("Erased type #{index} of '{}' was never lowered", origin.path),
                    self.location.to_owned(),
                    { CompilationStage => stage }
                );
            }

            _ => Ok(()),
        }
    }
}

impl HirVisitor for ContractValidator {
    fn visit_expr(&mut self, expr: &Expr) -> Result<(), CompilerError> {
        self.location = expr.location.to_owned();
        self.check_expr(expr)?;
        walk_expr(self, expr)
    }

    fn visit_type(&mut self, ty: &HirType) -> Result<(), CompilerError> {
        self.check_type(ty)?;
        walk_type(self, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_messages::compiler_errors::{ErrorMetaDataKey, ErrorType};
    use crate::hir::hir_builder::{BodyBuilder, block, closure, function, function_item, int};
    use crate::hir::hir_nodes::ClosureId;

    fn crate_with_root(build: impl FnOnce(&mut BodyBuilder) -> Expr) -> Crate {
        let mut body = BodyBuilder::new();
        let root = build(&mut body);
        let ret = root.ty.to_owned();

        let mut krate = Crate::new("demo");
        krate.push_item(function_item("demo::main", function(Vec::new(), ret, body.finish(root)), 1));
        krate
    }

    #[test]
    fn upstream_check_rejects_uninferred_expressions() {
        let krate = crate_with_root(|_| {
            let mut hole = int(1, 2);
            hole.ty = HirType::Infer;
            block(vec![hole], None, 1)
        });

        let error = check_upstream(&krate).expect_err("an Infer type must be rejected");
        assert_eq!(error.error_type, ErrorType::HirTransformation);
        assert_eq!(error.location.start_pos.line_number, 2);
        assert_eq!(
            error.metadata.get(&ErrorMetaDataKey::CompilationStage),
            Some(&UPSTREAM_STAGE)
        );
    }

    #[test]
    fn closure_contract_only_applies_after_closure_expansion() {
        let krate = crate_with_root(|_| {
            let literal = closure(ClosureId(0), Vec::new(), int(1, 3), false, 3);
            block(vec![literal], None, 1)
        });

        assert!(validate_after(&krate, ExpansionPass::AnnotateUsage).is_ok());

        let error = validate_after(&krate, ExpansionPass::Closures)
            .expect_err("closure literal must not survive");
        assert!(error.msg.contains("closure expansion"));

        // Later stages keep checking earlier contracts
        assert!(validate_after(&krate, ExpansionPass::Reborrows).is_err());
    }
}
