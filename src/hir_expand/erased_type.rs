//! ============================================================
//!                     Erased Type Lowering
//! ============================================================
//! Replaces every `impl Trait` placeholder with a concrete type.
//!
//! For each placeholder `(origin function, index)` the values the origin
//! function can return are collected (tail expressions and `return`s):
//!  - one producer type      -> that type, substituted at every mention
//!  - several producer types -> `Box<dyn Bounds>`; every producing
//!    expression is boxed and coerced (`Unsize`) with a vtable per bound
//!  - no producer            -> `!`, with a warning
//!
//! A resolution already filled in upstream is used as it is.
//!
//! Explicit trait calls on a boxed erased value go through the trait
//! object: `<Erased as T>::m(&x)` -> `<dyn T as T>::m(&*x)`.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::compiler_messages::compiler_warnings::{CompilerWarning, WarningKind};
use crate::hir::hir_datatypes::{GenericPath, HirType, SimplePath};
use crate::hir::hir_nodes::{
    CallPath, Crate, Expr, ExprKind, Function, ImplSource, ItemId, ItemKind, TextLocation,
    VTable, VTableEntry, VTableId,
};
use crate::hir::hir_traits::TraitTable;
use crate::hir::hir_visitor::{
    FunctionScope, HirVisitorMut, for_each_child_expr, for_each_function,
    visit_item_functions_mut, walk_crate_mut, walk_expr_mut, walk_type_mut,
};
use crate::hir::lang_items;
use crate::hir_expand::{ExpansionReport, PassOptions};
use crate::{erased_log, return_hir_transformation_error, return_rule_error};
use rustc_hash::FxHashMap;

/// Erased types resolving through more placeholders than this are cyclic.
const MAX_RESOLUTION_DEPTH: usize = 64;

type ErasedKey = (SimplePath, u32);

/// What a placeholder becomes, in terms of its origin function's generics.
#[derive(Debug, Clone, PartialEq)]
enum ErasedResolution {
    Static(HirType),

    /// `Box<dyn bounds>`
    Dynamic {
        boxed: HirType,
        bounds: Vec<GenericPath>,
    },

    Dead,
}

impl ErasedResolution {
    fn resolved_type(&self) -> HirType {
        match self {
            ErasedResolution::Static(ty) => ty.to_owned(),
            ErasedResolution::Dynamic { boxed, .. } => boxed.to_owned(),
            ErasedResolution::Dead => HirType::Diverge,
        }
    }
}

/// One placeholder in the return type of its origin function.
#[derive(Debug, Clone)]
struct ErasedSite {
    key: ErasedKey,
    bounds: Vec<GenericPath>,
    upstream: Option<HirType>,

    /// The placeholder is the whole return type, so producers can be boxed.
    top_level: bool,
    producers: Vec<HirType>,
    location: TextLocation,
}

pub(crate) fn run(
    krate: &mut Crate,
    options: &PassOptions,
    report: &mut ExpansionReport,
) -> Result<(), CompilerError> {
    let table = TraitTable::build(krate);

    let sites: Vec<ErasedSite> = for_each_function(krate, options.parallel, collect_sites)?
        .into_iter()
        .flatten()
        .collect();

    // ----------------------------
    // Decide
    // ----------------------------
    let mut resolutions: FxHashMap<ErasedKey, ErasedResolution> = FxHashMap::default();
    for site in &sites {
        let resolution = decide(site)?;

        match &resolution {
            ErasedResolution::Static(_) => report.erased_static += 1,
            ErasedResolution::Dynamic { .. } => report.erased_dynamic += 1,
            ErasedResolution::Dead => {
                report.erased_dropped += 1;
                report.warnings.push(CompilerWarning::new(
                    &format!("{} (#{})", site.key.0, site.key.1),
                    site.location.to_owned(),
                    WarningKind::DeadErasedType,
                ));
            }
        }

        erased_log!(
            Green "Erased ", Bright site.key.0.to_string(), " #", site.key.1,
            " -> ", format!("{resolution:?}")
        );

        resolutions.insert(site.key.to_owned(), resolution);
    }

    // ----------------------------
    // Box the producers of dynamic placeholders
    // ----------------------------
    let trait_items: FxHashMap<SimplePath, ItemId> = krate
        .items
        .iter()
        .enumerate()
        .filter(|(_, item)| matches!(item.kind, ItemKind::Trait(_)))
        .map(|(index, item)| (item.path.to_owned(), ItemId(index as u32)))
        .collect();

    let mut registry = VTableRegistry {
        table: &table,
        trait_items: &trait_items,
        first_id: krate.vtables.len(),
        vtables: Vec::new(),
    };

    let Crate { items, vtables, .. } = &mut *krate;
    for (index, item) in items.iter_mut().enumerate() {
        visit_item_functions_mut(
            ItemId(index as u32),
            item,
            &mut |scope: &FunctionScope<'_>, function: &mut Function| {
                box_function_producers(&resolutions, &mut registry, scope, function)
            },
        )?;
    }
    vtables.extend(registry.vtables);

    // ----------------------------
    // Replace every placeholder
    // ----------------------------
    walk_crate_mut(
        &mut ErasedRetyper {
            resolutions: &resolutions,
            depth: 0,
        },
        krate,
    )
}

// ============================================================
// Producer collection
// ============================================================

fn collect_sites(scope: &FunctionScope, function: &Function) -> Result<Vec<ErasedSite>, CompilerError> {
    let Some(body) = &function.body else {
        return Ok(Vec::new());
    };

    let origin = scope.function_path();
    let mut sites: Vec<ErasedSite> = Vec::new();

    function.ret.for_each_type(&mut |ty| {
        if let HirType::ErasedType {
            origin: placeholder_origin,
            index,
            bounds,
            resolved,
        } = ty
            && placeholder_origin.path == origin
            && !sites.iter().any(|site| site.key.1 == *index)
        {
            sites.push(ErasedSite {
                key: (origin.to_owned(), *index),
                bounds: bounds.to_owned(),
                upstream: resolved.as_deref().cloned(),
                top_level: std::ptr::eq(ty, &function.ret),
                producers: Vec::new(),
                location: scope.location.to_owned(),
            });
        }
    });

    if sites.is_empty() {
        return Ok(sites);
    }

    let mut leaves = Vec::new();
    tail_leaves(&body.root, &mut leaves);
    return_leaves(&body.root, &mut leaves);

    let mut extracted: FxHashMap<u32, Vec<HirType>> = FxHashMap::default();
    for leaf in leaves {
        extract_producers(&function.ret, &leaf.ty, &origin, &mut extracted);
    }

    for site in &mut sites {
        site.producers = extracted.remove(&site.key.1).unwrap_or_default();
    }

    Ok(sites)
}

/// Expressions whose value becomes the value of `expr`.
fn tail_leaves<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if expr.ty == HirType::Diverge {
        return;
    }

    match &expr.kind {
        ExprKind::Block {
            tail: Some(tail), ..
        } => tail_leaves(tail, out),

        ExprKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => {
            tail_leaves(then_branch, out);
            tail_leaves(else_branch, out);
        }

        ExprKind::Match { arms, .. } => {
            for arm in arms {
                tail_leaves(&arm.body, out);
            }
        }

        ExprKind::Loop { body } => break_leaves(body, out),

        _ => out.push(expr),
    }
}

/// Values of `break`s leaving this loop (not nested ones).
fn break_leaves<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match &expr.kind {
        ExprKind::Loop { .. } => {}
        ExprKind::Break(Some(value)) => tail_leaves(value, out),
        _ => for_each_child_expr(expr, |child| break_leaves(child, out)),
    }
}

fn return_leaves<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    if let ExprKind::Return(Some(value)) = &expr.kind {
        tail_leaves(value, out);
    }
    for_each_child_expr(expr, |child| return_leaves(child, out));
}

/// Matches a produced type against the declared return type and records
/// what sits in the position of each of the function's own placeholders.
fn extract_producers(
    declared: &HirType,
    produced: &HirType,
    origin: &SimplePath,
    out: &mut FxHashMap<u32, Vec<HirType>>,
) {
    match (declared, produced) {
        (HirType::ErasedType { origin: o, index, .. }, _) if o.path == *origin => {
            if produced == declared || *produced == HirType::Diverge {
                return;
            }

            let producers = out.entry(*index).or_default();
            if !producers.contains(produced) {
                producers.push(produced.to_owned());
            }
        }

        (HirType::Tuple(a), HirType::Tuple(b)) if a.len() == b.len() => {
            for (a, b) in a.iter().zip(b) {
                extract_producers(a, b, origin, out);
            }
        }

        (HirType::Path(a), HirType::Path(b)) if a.path == b.path && a.params.len() == b.params.len() => {
            for (a, b) in a.params.iter().zip(&b.params) {
                extract_producers(a, b, origin, out);
            }
        }

        (HirType::Borrow { inner: a, .. }, HirType::Borrow { inner: b, .. }) => {
            extract_producers(a, b, origin, out);
        }

        _ => {}
    }
}

fn decide(site: &ErasedSite) -> Result<ErasedResolution, CompilerError> {
    if let Some(upstream) = &site.upstream {
        return Ok(ErasedResolution::Static(upstream.to_owned()));
    }

    match site.producers.as_slice() {
        [] => Ok(ErasedResolution::Dead),
        [single] => Ok(ErasedResolution::Static(single.to_owned())),
        _ => {
            if !site.top_level {
                return_rule_error!(
                    format!(
                        "'{}' returns different types for the same 'impl' type, but it sits inside another type so it can't be boxed",
                        site.key.0
                    ),
                    site.location.to_owned(),
                    {
                        CompilationStage => "Erased Type Lowering",
                        PrimarySuggestion => "Return the same type from every branch, or return a Box<dyn Trait> explicitly",
                    }
                );
            }

            if site.bounds.is_empty() {
                return_rule_error!(
                    format!(
                        "'{}' returns different types for an 'impl' type without trait bounds",
                        site.key.0
                    ),
                    site.location.to_owned(),
                    { CompilationStage => "Erased Type Lowering" }
                );
            }

            Ok(ErasedResolution::Dynamic {
                boxed: HirType::boxed(HirType::TraitObject {
                    traits: site.bounds.to_owned(),
                }),
                bounds: site.bounds.to_owned(),
            })
        }
    }
}

// ============================================================
// Boxing
// ============================================================
struct VTableRegistry<'a> {
    table: &'a TraitTable,
    trait_items: &'a FxHashMap<SimplePath, ItemId>,
    first_id: usize,
    vtables: Vec<VTable>,
}

impl VTableRegistry<'_> {
    fn intern(
        &mut self,
        bound: &GenericPath,
        concrete: &HirType,
        location: &TextLocation,
    ) -> Result<VTableId, CompilerError> {
        if let Some(existing) = self
            .vtables
            .iter()
            .position(|vtable| vtable.trait_path == *bound && vtable.concrete == *concrete)
        {
            return Ok(VTableId((self.first_id + existing) as u32));
        }

        let mut methods = Vec::new();

        // Traits from outside the crate have no method list to fill in
        if let Some(method_names) = self.table.trait_methods(&bound.path) {
            let source = match self.table.find_impl(bound, concrete) {
                Some(impl_item) => ImplSource::Impl(impl_item),
                None if concrete.is_primitive() => ImplSource::Builtin,
                None if matches!(concrete, HirType::Generic { .. }) => ImplSource::Bound,
                None => {
                    return_rule_error!(
                        format!("'{concrete:?}' is returned as 'impl {}' but does not implement it", bound.path),
                        location.to_owned(),
                        { CompilationStage => "Erased Type Lowering" }
                    );
                }
            };

            for name in method_names {
                // Methods the impl leaves out come from the trait's default body
                let entry_source = match (source, self.trait_items.get(&bound.path)) {
                    (ImplSource::Impl(impl_item), Some(trait_item))
                        if !self.table.impl_defines_method(impl_item, name) =>
                    {
                        ImplSource::Impl(*trait_item)
                    }
                    _ => source,
                };

                methods.push(VTableEntry {
                    name: name.to_owned(),
                    source: entry_source,
                });
            }
        }

        self.vtables.push(VTable {
            trait_path: bound.to_owned(),
            concrete: concrete.to_owned(),
            methods,
        });

        Ok(VTableId((self.first_id + self.vtables.len() - 1) as u32))
    }
}

fn box_function_producers(
    resolutions: &FxHashMap<ErasedKey, ErasedResolution>,
    registry: &mut VTableRegistry,
    scope: &FunctionScope,
    function: &mut Function,
) -> Result<(), CompilerError> {
    let HirType::ErasedType { origin, index, .. } = &function.ret else {
        return Ok(());
    };

    let key = (scope.function_path(), *index);
    if origin.path != key.0 {
        return Ok(());
    }

    let Some(ErasedResolution::Dynamic { boxed, bounds }) = resolutions.get(&key) else {
        return Ok(());
    };

    let Some(body) = &mut function.body else {
        return Ok(());
    };

    let placeholder = function.ret.to_owned();
    let mut boxer = |leaf: &mut Expr| -> Result<(), CompilerError> {
        box_leaf(leaf, &placeholder, boxed, bounds, registry)
    };

    for_each_leaf_mut(&mut body.root, &mut boxer)?;
    ReturnBoxer { f: &mut boxer }.visit_expr(&mut body.root)
}

/// `leaf` -> `Unsize(<Box<T>>::new(leaf))`
fn box_leaf(
    leaf: &mut Expr,
    placeholder: &HirType,
    boxed: &HirType,
    bounds: &[GenericPath],
    registry: &mut VTableRegistry,
) -> Result<(), CompilerError> {
    let concrete = leaf.ty.to_owned();
    if concrete == *placeholder || concrete == HirType::Diverge {
        return Ok(());
    }

    let location = leaf.location.to_owned();
    let mut vtables = Vec::with_capacity(bounds.len());
    for bound in bounds {
        vtables.push(registry.intern(bound, &concrete, &location)?);
    }

    let value = std::mem::replace(
        leaf,
        Expr::new(ExprKind::Tuple(Vec::new()), HirType::unit(), location.to_owned()),
    );

    let box_ty = HirType::boxed(concrete);
    let allocation = Expr::new(
        ExprKind::CallPath {
            path: CallPath::UfcsInherent {
                self_ty: box_ty.to_owned(),
                method: lang_items::BOX_NEW.to_owned(),
                params: Vec::new(),
            },
            args: vec![value],
        },
        box_ty,
        location.to_owned(),
    );

    *leaf = Expr::new(
        ExprKind::Unsize {
            value: Box::new(allocation),
            vtables,
        },
        boxed.to_owned(),
        location,
    );

    Ok(())
}

/// Mutable counterpart of `tail_leaves`.
fn for_each_leaf_mut<F>(expr: &mut Expr, f: &mut F) -> Result<(), CompilerError>
where
    F: FnMut(&mut Expr) -> Result<(), CompilerError>,
{
    if expr.ty == HirType::Diverge {
        return Ok(());
    }

    let branching = matches!(
        expr.kind,
        ExprKind::Block { tail: Some(_), .. }
            | ExprKind::If {
                else_branch: Some(_),
                ..
            }
            | ExprKind::Match { .. }
            | ExprKind::Loop { .. }
    );
    if !branching {
        return f(expr);
    }

    match &mut expr.kind {
        ExprKind::Block {
            tail: Some(tail), ..
        } => for_each_leaf_mut(tail, f),

        ExprKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => {
            for_each_leaf_mut(then_branch, f)?;
            for_each_leaf_mut(else_branch, f)
        }

        ExprKind::Match { arms, .. } => {
            for arm in arms {
                for_each_leaf_mut(&mut arm.body, f)?;
            }
            Ok(())
        }

        ExprKind::Loop { body } => BreakBoxer { f }.visit_expr(body),

        _ => Ok(()),
    }
}

/// Boxes the values of `break`s leaving one loop.
struct BreakBoxer<'f, F> {
    f: &'f mut F,
}

impl<F> HirVisitorMut for BreakBoxer<'_, F>
where
    F: FnMut(&mut Expr) -> Result<(), CompilerError>,
{
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        match &mut expr.kind {
            ExprKind::Loop { .. } => Ok(()),
            ExprKind::Break(Some(value)) => for_each_leaf_mut(value, self.f),
            _ => walk_expr_mut(self, expr),
        }
    }
}

/// Boxes the values of every `return`.
struct ReturnBoxer<'f, F> {
    f: &'f mut F,
}

impl<F> HirVisitorMut for ReturnBoxer<'_, F>
where
    F: FnMut(&mut Expr) -> Result<(), CompilerError>,
{
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        walk_expr_mut(self, expr)?;

        if let ExprKind::Return(Some(value)) = &mut expr.kind {
            for_each_leaf_mut(value, self.f)?;
        }

        Ok(())
    }
}

// ============================================================
// Retyping
// ============================================================
struct ErasedRetyper<'a> {
    resolutions: &'a FxHashMap<ErasedKey, ErasedResolution>,
    depth: usize,
}

impl ErasedRetyper<'_> {
    fn resolution_of(&self, ty: &HirType) -> Option<&ErasedResolution> {
        match ty {
            HirType::ErasedType { origin, index, .. } => {
                self.resolutions.get(&(origin.path.to_owned(), *index))
            }
            _ => None,
        }
    }

    /// `<dyn T as T>::m(&*x)` for a call whose self type was a boxed erased type.
    fn dispatch_through_object(&self, expr: &mut Expr) -> Result<(), CompilerError> {
        let location = expr.location.to_owned();
        let ExprKind::CallPath {
            path: CallPath::UfcsKnown {
                self_ty, method, ..
            },
            args,
        } = &mut expr.kind
        else {
            return Ok(());
        };

        // After retyping, self_ty is `Box<dyn ..>`
        let Some(object) = self_ty.builtin_deref_target().cloned() else {
            return_hir_transformation_error!(
                format!("Boxed erased type resolved to '{self_ty:?}'"),
                location,
                { CompilationStage => "Erased Type Lowering" }
            );
        };

        let Some(receiver) = args.first_mut() else {
            return_hir_transformation_error!(
                format!("Call of '{method}' on an erased type has no receiver"),
                location,
                { CompilationStage => "Erased Type Lowering" }
            );
        };

        let Some((kind, pointee)) = receiver.ty.as_reference() else {
            return_rule_error!(
                format!("'{method}' takes 'self' by value, so it can't be called on a boxed 'impl' type"),
                location,
                {
                    CompilationStage => "Erased Type Lowering",
                    MethodName => "by-value receiver",
                }
            );
        };

        if !pointee.is_box() {
            return Ok(());
        }

        let taken = std::mem::replace(
            receiver,
            Expr::new(ExprKind::Tuple(Vec::new()), HirType::unit(), location.to_owned()),
        );

        // `&x` -> `&*x`, any other `&Box` place -> `&**place`
        let boxed_place = match taken.kind {
            ExprKind::Borrow { value, .. } => *value,
            other => {
                let boxed_ty = taken.ty.builtin_deref_target().cloned().unwrap_or(HirType::Infer);
                Expr::new(
                    ExprKind::Deref {
                        value: Box::new(Expr::new(other, taken.ty, taken.location)),
                        resolution: None,
                    },
                    boxed_ty,
                    location.to_owned(),
                )
            }
        };

        let object_place = Expr::new(
            ExprKind::Deref {
                value: Box::new(boxed_place),
                resolution: None,
            },
            object.to_owned(),
            location.to_owned(),
        );

        *receiver = Expr::new(
            ExprKind::Borrow {
                kind,
                value: Box::new(object_place),
            },
            HirType::borrow(kind, object.to_owned()),
            location,
        );
        *self_ty = object;

        Ok(())
    }
}

impl HirVisitorMut for ErasedRetyper<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        let dynamic_call = match &expr.kind {
            ExprKind::CallPath {
                path: CallPath::UfcsKnown { self_ty, .. },
                ..
            } => matches!(
                self.resolution_of(self_ty),
                Some(ErasedResolution::Dynamic { .. })
            ),
            _ => false,
        };

        walk_expr_mut(self, expr)?;

        if dynamic_call {
            self.dispatch_through_object(expr)?;
        }

        Ok(())
    }

    fn visit_type(&mut self, ty: &mut HirType) -> Result<(), CompilerError> {
        if !matches!(ty, HirType::ErasedType { .. }) {
            return walk_type_mut(self, ty);
        }

        let HirType::ErasedType {
            origin,
            index,
            resolved,
            ..
        } = &*ty
        else {
            return Ok(());
        };

        let replacement = match self.resolutions.get(&(origin.path.to_owned(), *index)) {
            Some(resolution) => resolution.resolved_type().substitute(&origin.params),
            None => match resolved {
                Some(resolved) => (**resolved).to_owned(),
                None => {
                    return_hir_transformation_error!(
                        format!("Erased type from '{}' has no producing function", origin.path),
                        TextLocation::default(),
                        { CompilationStage => "Erased Type Lowering" }
                    );
                }
            },
        };

        self.depth += 1;
        if self.depth > MAX_RESOLUTION_DEPTH {
            return_hir_transformation_error!(
                "Erased types resolve to each other in a cycle",
                TextLocation::default(),
                { CompilationStage => "Erased Type Lowering" }
            );
        }

        *ty = replacement;
        let result = self.visit_type(ty);
        self.depth -= 1;

        result
    }
}
