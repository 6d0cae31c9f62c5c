//! ============================================================
//!                     Usage Annotation
//! ============================================================
//! Classifies how every local binding is used:
//! `Unused < ByValue < Shared < Mutable`.
//!
//! Each use site gets the category its syntactic position demands
//! (`&x` is Shared, `x = ..` is Mutable, passing `x` is ByValue, ...)
//! and an evaluation sequence number. The binding keeps the strictest
//! category over all of its uses, whether it was ever moved, and the
//! sequence number of its last use.
//!
//! Closure expansion reads these to pick capture modes, reborrow
//! insertion reads them to decide whether a reference is still live.
//!
//! A use that follows an unconditional move of the same binding means an
//! upstream check is broken, and is reported as a transformation error.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::compiler_messages::compiler_warnings::{CompilerWarning, WarningKind};
use crate::hir::hir_datatypes::{BorrowKind, GenericParam, HirType};
use crate::hir::hir_nodes::{
    Binding, BindingId, ClosureId, Crate, DerefStep, Expr, ExprKind, Function, FunctionArg, HirBinOp,
    LocalUse, MethodResolution, Pattern, PatternBindingMode, PatternKind, TextLocation, Usage,
};
use crate::hir::hir_traits::TraitTable;
use crate::hir::hir_visitor::{FunctionScope, for_each_child_expr, for_each_function_mut};
use crate::hir::lang_items::CallTrait;
use crate::hir_expand::{ExpansionReport, PassOptions};
use crate::{return_hir_transformation_error, usage_log};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnnotationMode {
    /// First run: checks moves and reports unused bindings.
    Full,

    /// Later runs only refresh the annotations for rewritten bodies.
    Refresh,
}

#[derive(Debug, Default)]
pub(crate) struct BodyUsage {
    pub bindings: usize,
    pub warnings: Vec<CompilerWarning>,
}

pub(crate) fn run(
    krate: &mut Crate,
    options: &PassOptions,
    report: &mut ExpansionReport,
) -> Result<(), CompilerError> {
    let table = TraitTable::build(krate);

    let results = for_each_function_mut(krate, options.parallel, |scope, function| {
        annotate_function(&table, scope, function, AnnotationMode::Full)
    })?;

    for result in results {
        report.bindings_annotated += result.bindings;
        report.warnings.extend(result.warnings);
    }

    Ok(())
}

pub(crate) fn annotate_function(
    table: &TraitTable,
    scope: &FunctionScope,
    function: &mut Function,
    mode: AnnotationMode,
) -> Result<BodyUsage, CompilerError> {
    let Some(body) = &mut function.body else {
        return Ok(BodyUsage::default());
    };

    for local in &mut body.locals {
        local.usage = Usage::Unused;
        local.moved = false;
        local.last_use = None;
    }

    let mut annotator = UsageAnnotator::new(table, &scope.generics, &mut body.locals, mode);

    for arg in &function.args {
        annotator.declare(&arg.pattern)?;
    }

    annotator.visit(&mut body.root, Usage::ByValue)?;

    usage_log!(Green "Annotated ", Bright scope.function_path().components.join("::"));

    Ok(annotator.finish())
}

// ============================================================
// Captures (shared with closure expansion)
// ============================================================

/// A variable a closure body uses from its enclosing function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Capture {
    pub binding: BindingId,

    /// Strictest use inside the closure body.
    pub usage: Usage,

    /// At least one use inside the closure moves the value out.
    pub consumed: bool,
}

/// Whether moving a value of this type consumes it.
/// References are never counted: moving one is a copy or an implicit reborrow.
pub(crate) fn consumes(table: &TraitTable, generics: &[GenericParam], ty: &HirType) -> bool {
    ty.as_reference().is_none() && !table.is_copy(ty, generics)
}

/// Free variables of a closure, in order of first use.
pub(crate) fn closure_captures(
    table: &TraitTable,
    generics: &[GenericParam],
    locals: &[Binding],
    args: &[FunctionArg],
    body: &Expr,
) -> Vec<Capture> {
    let mut declared = Vec::new();
    for arg in args {
        arg.pattern.bindings(&mut declared);
    }
    collect_declared(body, &mut declared);

    let declared: FxHashSet<BindingId> = declared.into_iter().map(|(id, _)| id).collect();
    let mut captures: Vec<Capture> = Vec::new();

    for_each_local_use(body, &mut |local| {
        if declared.contains(&local.binding) {
            return;
        }

        let consumed = local.usage == Usage::ByValue
            && locals
                .get(local.binding.0 as usize)
                .is_some_and(|binding| consumes(table, generics, &binding.ty));

        match captures
            .iter_mut()
            .find(|capture| capture.binding == local.binding)
        {
            Some(capture) => {
                capture.usage = capture.usage.max(local.usage);
                capture.consumed |= consumed;
            }
            None => captures.push(Capture {
                binding: local.binding,
                usage: local.usage,
                consumed,
            }),
        }
    });

    captures
}

/// The strongest call trait a closure with these captures can implement.
pub(crate) fn closure_class(captures: &[Capture]) -> CallTrait {
    if captures.iter().any(|capture| capture.consumed) {
        CallTrait::FnOnce
    } else if captures
        .iter()
        .any(|capture| capture.usage == Usage::Mutable)
    {
        CallTrait::FnMut
    } else {
        CallTrait::Fn
    }
}

/// Every binding declared by a pattern anywhere inside `expr`.
pub(crate) fn collect_declared(expr: &Expr, out: &mut Vec<(BindingId, PatternBindingMode)>) {
    match &expr.kind {
        ExprKind::Let { pattern, .. } => pattern.bindings(out),
        ExprKind::Match { arms, .. } => {
            for arm in arms {
                arm.pattern.bindings(out);
            }
        }
        ExprKind::Closure { args, .. } => {
            for arg in args {
                arg.pattern.bindings(out);
            }
        }
        _ => {}
    }

    for_each_child_expr(expr, |child| collect_declared(child, out));
}

pub(crate) fn for_each_local_use(expr: &Expr, f: &mut impl FnMut(&LocalUse)) {
    if let ExprKind::Local(local) = &expr.kind {
        f(local);
    }

    for_each_child_expr(expr, |child| for_each_local_use(child, f));
}

// ============================================================
// Annotator
// ============================================================
struct UsageAnnotator<'a> {
    table: &'a TraitTable,
    generics: &'a [GenericParam],
    locals: &'a mut [Binding],
    mode: AnnotationMode,

    seq: u32,

    // Moves inside branches, loops and closure bodies may not happen,
    // so only moves at depth 0 are tracked for the use-after-move check.
    conditional_depth: u32,

    // Non-zero while visiting the base of a partial move (`s.field`).
    projection_depth: u32,

    // Loop nesting at each binding's declaration
    decl_loop_depth: Vec<u32>,
    decl_location: Vec<Option<TextLocation>>,

    // Bindings declared outside each open loop and used inside it
    loops: Vec<Vec<BindingId>>,

    closure_classes: FxHashMap<ClosureId, CallTrait>,
    moved_at: FxHashMap<BindingId, TextLocation>,
}

impl<'a> UsageAnnotator<'a> {
    fn new(
        table: &'a TraitTable,
        generics: &'a [GenericParam],
        locals: &'a mut [Binding],
        mode: AnnotationMode,
    ) -> Self {
        let count = locals.len();

        Self {
            table,
            generics,
            locals,
            mode,
            seq: 0,
            conditional_depth: 0,
            projection_depth: 0,
            decl_loop_depth: vec![0; count],
            decl_location: vec![None; count],
            loops: Vec::new(),
            closure_classes: FxHashMap::default(),
            moved_at: FxHashMap::default(),
        }
    }

    fn finish(self) -> BodyUsage {
        let mut warnings = Vec::new();

        if self.mode == AnnotationMode::Full {
            for (index, binding) in self.locals.iter().enumerate() {
                if binding.usage != Usage::Unused
                    || binding.name.starts_with('_')
                    || binding.name == "self"
                {
                    continue;
                }

                // Only bindings a pattern actually declared can be reported
                if let Some(Some(location)) = self.decl_location.get(index) {
                    warnings.push(CompilerWarning::new(
                        &binding.name,
                        location.to_owned(),
                        WarningKind::UnusedBinding,
                    ));
                }
            }
        }

        BodyUsage {
            bindings: self.locals.len(),
            warnings,
        }
    }

    fn consumes(&self, ty: &HirType) -> bool {
        consumes(self.table, self.generics, ty)
    }

    fn is_copy(&self, ty: &HirType) -> bool {
        self.table.is_copy(ty, self.generics)
    }

    fn declare(&mut self, pattern: &Pattern) -> Result<(), CompilerError> {
        match &pattern.kind {
            PatternKind::Any | PatternKind::Literal(_) => Ok(()),

            PatternKind::Binding { binding, sub, .. } => {
                let index = binding.0 as usize;
                if index >= self.locals.len() {
                    return_hir_transformation_error!(
                        format!("Pattern declares unknown local {binding}"),
                        pattern.location.to_owned(),
                        { CompilationStage => "Usage Annotation" }
                    );
                }

                self.decl_loop_depth[index] = self.loops.len() as u32;
                self.decl_location[index] = Some(pattern.location.to_owned());

                match sub {
                    Some(sub) => self.declare(sub),
                    None => Ok(()),
                }
            }

            PatternKind::Tuple(elements) => {
                for element in elements {
                    self.declare(element)?;
                }
                Ok(())
            }

            PatternKind::Struct { fields, .. } => {
                for (_, field) in fields {
                    self.declare(field)?;
                }
                Ok(())
            }
        }
    }

    /// What a pattern does to the value it is matched against.
    fn pattern_usage(&self, pattern: &Pattern) -> Usage {
        let mut usage = Usage::Shared;
        let mut consumed = false;
        self.fold_pattern(pattern, &mut usage, &mut consumed);

        if consumed { Usage::ByValue } else { usage }
    }

    fn fold_pattern(&self, pattern: &Pattern, usage: &mut Usage, consumed: &mut bool) {
        match &pattern.kind {
            PatternKind::Any | PatternKind::Literal(_) => {}

            PatternKind::Binding { binding, mode, sub } => {
                match mode {
                    PatternBindingMode::Move => {
                        if let Some(local) = self.locals.get(binding.0 as usize) {
                            *consumed |= self.consumes(&local.ty);
                        }
                    }
                    PatternBindingMode::Ref => {}
                    PatternBindingMode::MutRef => *usage = Usage::Mutable,
                }

                if let Some(sub) = sub {
                    self.fold_pattern(sub, usage, consumed);
                }
            }

            PatternKind::Tuple(elements) => {
                for element in elements {
                    self.fold_pattern(element, usage, consumed);
                }
            }

            PatternKind::Struct { fields, .. } => {
                for (_, field) in fields {
                    self.fold_pattern(field, usage, consumed);
                }
            }
        }
    }

    fn record_use(
        &mut self,
        local: &mut LocalUse,
        usage: Usage,
        location: &TextLocation,
    ) -> Result<(), CompilerError> {
        let index = local.binding.0 as usize;
        let Some(binding) = self.locals.get(index) else {
            return_hir_transformation_error!(
                format!("Use of unknown local {}", local.binding),
                location.to_owned(),
                { CompilationStage => "Usage Annotation" }
            );
        };

        if self.mode == AnnotationMode::Full
            && let Some(moved_at) = self.moved_at.get(&local.binding)
        {
            return_hir_transformation_error!(
                format!(
                    "'{}' is used after being moved on line {}",
                    binding.name,
                    moved_at.start_pos.line_number + 1
                ),
                location.to_owned(),
                {
                    CompilationStage => "Usage Annotation",
                    PrimarySuggestion => "Borrow checking should have rejected this use",
                }
            );
        }

        let consumed = usage == Usage::ByValue && self.consumes(&binding.ty);

        self.seq += 1;
        local.usage = usage;
        local.seq = self.seq;

        let binding = &mut self.locals[index];
        binding.usage = binding.usage.max(usage);
        binding.last_use = Some(self.seq);

        if consumed {
            binding.moved = true;

            if self.mode == AnnotationMode::Full
                && self.conditional_depth == 0
                && self.projection_depth == 0
            {
                self.moved_at.insert(local.binding, location.to_owned());
            }
        }

        let declared_at = self.decl_loop_depth[index] as usize;
        for frame in self.loops.iter_mut().skip(declared_at) {
            frame.push(local.binding);
        }

        Ok(())
    }

    /// Usage demanded of the operand of a dereference.
    fn deref_usage(
        &self,
        source: &HirType,
        overloaded: bool,
        usage: Usage,
        target: &HirType,
    ) -> Usage {
        if overloaded {
            return if usage == Usage::Mutable {
                Usage::Mutable
            } else {
                Usage::Shared
            };
        }

        match source {
            HirType::Borrow {
                kind: BorrowKind::Unique,
                ..
            } if usage == Usage::Mutable => Usage::Mutable,

            HirType::Borrow { .. } => Usage::Shared,

            _ if source.is_box() => {
                if usage == Usage::ByValue && self.is_copy(target) {
                    Usage::Shared
                } else {
                    usage
                }
            }

            _ => Usage::Shared,
        }
    }

    /// Usage of a method receiver after its auto-deref steps and auto-ref.
    fn receiver_usage(&self, receiver_ty: &HirType, resolution: Option<&MethodResolution>) -> Usage {
        let Some(resolution) = resolution else {
            return Usage::Shared;
        };

        let mut types = vec![receiver_ty];
        for step in &resolution.adjust.derefs {
            let current = types[types.len() - 1];
            let next = match step {
                DerefStep::Builtin => match current.builtin_deref_target() {
                    Some(target) => target,
                    None => return Usage::Shared,
                },
                DerefStep::Overloaded { target, .. } => target,
            };
            types.push(next);
        }

        let mut usage = match resolution.adjust.autoref {
            Some(kind) => Usage::from(kind),
            None => Usage::ByValue,
        };

        for (index, step) in resolution.adjust.derefs.iter().enumerate().rev() {
            let overloaded = matches!(step, DerefStep::Overloaded { .. });
            usage = self.deref_usage(types[index], overloaded, usage, types[index + 1]);
        }

        usage
    }

    fn callee_usage(&self, callee_ty: &HirType, resolution: Option<&MethodResolution>) -> Usage {
        let by_trait = |call_trait: CallTrait| match call_trait {
            CallTrait::Fn => Usage::Shared,
            CallTrait::FnMut => Usage::Mutable,
            CallTrait::FnOnce => Usage::ByValue,
        };

        match callee_ty {
            HirType::Function { .. } => Usage::ByValue,

            HirType::Closure { id, .. } => match self.closure_classes.get(id) {
                Some(class) => by_trait(*class),
                None => Usage::Shared,
            },

            HirType::Borrow { kind, .. } => Usage::from(*kind),

            _ => resolution
                .and_then(|resolution| resolution.trait_path.as_ref())
                .and_then(|trait_path| CallTrait::from_path(&trait_path.path))
                .map(by_trait)
                .unwrap_or(Usage::Shared),
        }
    }

    fn visit_conditional(&mut self, expr: &mut Expr, usage: Usage) -> Result<(), CompilerError> {
        self.conditional_depth += 1;
        let result = self.visit(expr, usage);
        self.conditional_depth -= 1;
        result
    }

    fn visit(&mut self, expr: &mut Expr, usage: Usage) -> Result<(), CompilerError> {
        let Expr { kind, ty, location } = expr;

        match kind {
            ExprKind::Local(local) => self.record_use(local, usage, location)?,

            ExprKind::Literal(_) | ExprKind::ItemPath(_) => {}

            // ----------------------------
            // Control flow
            // ----------------------------
            ExprKind::Block { statements, tail } => {
                for statement in statements {
                    self.visit(statement, Usage::ByValue)?;
                }
                if let Some(tail) = tail {
                    self.visit(tail, Usage::ByValue)?;
                }
            }

            ExprKind::Let { pattern, value } => {
                if let Some(value) = value {
                    let value_usage = self.pattern_usage(pattern);
                    self.visit(value, value_usage)?;
                }
                self.declare(pattern)?;
            }

            ExprKind::Return(value) | ExprKind::Break(value) => {
                if let Some(value) = value {
                    self.visit(value, Usage::ByValue)?;
                }
            }

            ExprKind::Loop { body } => {
                self.loops.push(Vec::new());
                self.visit_conditional(body, Usage::ByValue)?;

                // Anything used in the loop is live until the loop is left
                self.seq += 1;
                let end = self.seq;
                for binding in self.loops.pop().unwrap_or_default() {
                    let local = &mut self.locals[binding.0 as usize];
                    local.last_use = local.last_use.max(Some(end));
                }
            }

            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit(condition, Usage::ByValue)?;
                self.visit_conditional(then_branch, Usage::ByValue)?;
                if let Some(else_branch) = else_branch {
                    self.visit_conditional(else_branch, Usage::ByValue)?;
                }
            }

            ExprKind::Match { scrutinee, arms } => {
                let mut scrutinee_usage = Usage::Shared;
                for arm in arms.iter() {
                    let arm_usage = self.pattern_usage(&arm.pattern);
                    scrutinee_usage = match (scrutinee_usage, arm_usage) {
                        (Usage::ByValue, _) | (_, Usage::ByValue) => Usage::ByValue,
                        (a, b) => a.max(b),
                    };
                }

                self.visit(scrutinee, scrutinee_usage)?;

                for arm in arms {
                    self.declare(&arm.pattern)?;
                    self.conditional_depth += 1;
                    if let Some(guard) = &mut arm.guard {
                        self.visit(guard, Usage::ByValue)?;
                    }
                    let result = self.visit(&mut arm.body, Usage::ByValue);
                    self.conditional_depth -= 1;
                    result?;
                }
            }

            // ----------------------------
            // Operations
            // ----------------------------
            ExprKind::Assign { op, target, value, .. } => {
                self.visit(value, Usage::ByValue)?;

                // A plain assignment to a local re-initialises it
                if op.is_none()
                    && let ExprKind::Local(local) = &target.kind
                {
                    self.moved_at.remove(&local.binding);
                }

                self.visit(target, Usage::Mutable)?;
            }

            ExprKind::BinOp {
                op, left, right, ..
            } => match op {
                HirBinOp::And | HirBinOp::Or => {
                    self.visit(left, Usage::ByValue)?;
                    self.visit_conditional(right, Usage::ByValue)?;
                }
                _ if op.is_comparison() => {
                    self.visit(left, Usage::Shared)?;
                    self.visit(right, Usage::Shared)?;
                }
                _ => {
                    self.visit(left, Usage::ByValue)?;
                    self.visit(right, Usage::ByValue)?;
                }
            },

            ExprKind::UniOp { operand, .. } => self.visit(operand, Usage::ByValue)?,

            // ----------------------------
            // Places
            // ----------------------------
            ExprKind::Borrow { kind, value } => self.visit(value, Usage::from(*kind))?,

            ExprKind::Deref { value, resolution } => {
                let inner = self.deref_usage(&value.ty, resolution.is_some(), usage, ty);
                self.visit(value, inner)?;
            }

            ExprKind::Index { value, index, .. } => {
                let inner = if usage == Usage::Mutable {
                    Usage::Mutable
                } else {
                    Usage::Shared
                };
                self.visit(value, inner)?;
                self.visit(index, Usage::ByValue)?;
            }

            ExprKind::Field { value, .. } => {
                if usage == Usage::ByValue {
                    if self.is_copy(ty) {
                        self.visit(value, Usage::Shared)?;
                    } else {
                        self.projection_depth += 1;
                        let result = self.visit(value, Usage::ByValue);
                        self.projection_depth -= 1;
                        result?;
                    }
                } else {
                    self.visit(value, usage)?;
                }
            }

            // ----------------------------
            // Calls
            // ----------------------------
            ExprKind::CallPath { args, .. } => {
                for arg in args {
                    self.visit(arg, Usage::ByValue)?;
                }
            }

            ExprKind::CallValue {
                callee,
                args,
                resolution,
            } => {
                let callee_usage = self.callee_usage(&callee.ty, resolution.as_ref());
                self.visit(callee, callee_usage)?;
                for arg in args {
                    self.visit(arg, Usage::ByValue)?;
                }
            }

            ExprKind::CallMethod {
                receiver,
                args,
                resolution,
                ..
            } => {
                let receiver_usage = self.receiver_usage(&receiver.ty, resolution.as_ref());
                self.visit(receiver, receiver_usage)?;
                for arg in args {
                    self.visit(arg, Usage::ByValue)?;
                }
            }

            // ----------------------------
            // Construction
            // ----------------------------
            ExprKind::Closure {
                id,
                args,
                body,
                is_move,
                ..
            } => {
                for arg in args.iter() {
                    self.declare(&arg.pattern)?;
                }

                // The body runs when the closure is called, not here
                self.visit_conditional(body, Usage::ByValue)?;

                let captures =
                    closure_captures(self.table, self.generics, &*self.locals, &args[..], &**body);

                if *is_move {
                    self.seq += 1;
                    for capture in &captures {
                        let index = capture.binding.0 as usize;
                        let consumed = self.consumes(&self.locals[index].ty);

                        let binding = &mut self.locals[index];
                        binding.usage = binding.usage.max(Usage::ByValue);
                        binding.last_use = Some(self.seq);

                        if consumed {
                            binding.moved = true;
                            if self.mode == AnnotationMode::Full && self.conditional_depth == 0 {
                                self.moved_at.insert(capture.binding, location.to_owned());
                            }
                        }
                    }
                }

                let class = closure_class(&captures);
                usage_log!("Closure ", id.to_string(), " is ", Bright format!("{class:?}"));
                self.closure_classes.insert(*id, class);
            }

            ExprKind::StructLiteral { fields, .. } => {
                for (_, value) in fields {
                    self.visit(value, Usage::ByValue)?;
                }
            }

            ExprKind::Tuple(elements) => {
                for element in elements {
                    self.visit(element, Usage::ByValue)?;
                }
            }

            ExprKind::Unsize { value, .. } => self.visit(value, Usage::ByValue)?,
        }

        Ok(())
    }
}
