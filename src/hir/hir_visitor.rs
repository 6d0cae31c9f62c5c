//! ============================================================
//!                     HIR Traversal
//! ============================================================
//! One walk over items, expressions, patterns and types, shared by every pass.
//!
//! A pass implements `HirVisitorMut` (or `HirVisitor` for read-only
//! analysis), overrides the hooks it cares about and calls the matching
//! `walk_*` function to continue into children. Children are visited in
//! evaluation order.
//!
//! `for_each_function_mut` hands out every function body in the crate
//! together with its `FunctionScope`. Bodies are independent, so the work
//! can be spread over rayon's pool; results and the first error come back
//! in crate order either way.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_datatypes::{GenericParam, GenericPath, HirType, SimplePath};
use crate::hir::hir_nodes::{
    CallPath, Crate, DerefStep, Expr, ExprKind, Function, Item, ItemId, ItemKind,
    MethodResolution, Pattern, PatternKind, TextLocation,
};
use rayon::prelude::*;

// ============================================================
// Function scopes
// ============================================================

/// Where a function body lives, and the generics visible inside it.
#[derive(Debug, Clone)]
pub struct FunctionScope<'a> {
    pub item: ItemId,
    pub item_path: &'a SimplePath,
    pub method: Option<&'a str>,
    pub location: &'a TextLocation,

    /// Combined list: impl/trait level parameters first, then the function's own.
    pub generics: Vec<GenericParam>,
}

impl FunctionScope<'_> {
    /// Path used to name this function from elsewhere (e.g. as an erased type origin).
    pub fn function_path(&self) -> SimplePath {
        match self.method {
            Some(method) => self.item_path.join(method),
            None => self.item_path.clone(),
        }
    }
}

fn combined_generics(outer: &[GenericParam], own: &[GenericParam]) -> Vec<GenericParam> {
    outer.iter().chain(own).cloned().collect()
}

fn trait_self_param() -> GenericParam {
    GenericParam {
        name: String::from("Self"),
        bounds: Vec::new(),
    }
}

fn function_scope<'a>(
    item: ItemId,
    item_path: &'a SimplePath,
    location: &'a TextLocation,
    method: Option<&'a str>,
    generics: Vec<GenericParam>,
) -> FunctionScope<'a> {
    FunctionScope {
        item,
        item_path,
        method,
        location,
        generics,
    }
}

pub fn visit_item_functions_mut<T>(
    id: ItemId,
    item: &mut Item,
    f: &mut impl FnMut(&FunctionScope, &mut Function) -> Result<T, CompilerError>,
) -> Result<Vec<T>, CompilerError> {
    let Item {
        path,
        location,
        kind,
    } = item;
    let path: &SimplePath = path;
    let location: &TextLocation = location;

    let mut results = Vec::new();

    match kind {
        ItemKind::Function(function) => {
            let scope = function_scope(id, path, location, None, function.generics.clone());
            results.push(f(&scope, function)?);
        }

        ItemKind::Trait(declaration) => {
            let mut outer = vec![trait_self_param()];
            outer.extend(declaration.generics.iter().cloned());

            for method in &mut declaration.methods {
                let generics = combined_generics(&outer, &method.function.generics);
                let scope = function_scope(id, path, location, Some(&method.name), generics);
                results.push(f(&scope, &mut method.function)?);
            }
        }

        ItemKind::TraitImpl(imp) => {
            for method in &mut imp.methods {
                let generics = combined_generics(&imp.generics, &method.function.generics);
                let scope = function_scope(id, path, location, Some(&method.name), generics);
                results.push(f(&scope, &mut method.function)?);
            }
        }

        ItemKind::TypeImpl(imp) => {
            for method in &mut imp.methods {
                let generics = combined_generics(&imp.generics, &method.function.generics);
                let scope = function_scope(id, path, location, Some(&method.name), generics);
                results.push(f(&scope, &mut method.function)?);
            }
        }

        ItemKind::Struct(_) => {}
    }

    Ok(results)
}

pub fn visit_item_functions<T>(
    id: ItemId,
    item: &Item,
    f: &mut impl FnMut(&FunctionScope, &Function) -> Result<T, CompilerError>,
) -> Result<Vec<T>, CompilerError> {
    let (path, location) = (&item.path, &item.location);
    let mut results = Vec::new();

    match &item.kind {
        ItemKind::Function(function) => {
            let scope = function_scope(id, path, location, None, function.generics.clone());
            results.push(f(&scope, function)?);
        }

        ItemKind::Trait(declaration) => {
            let mut outer = vec![trait_self_param()];
            outer.extend(declaration.generics.iter().cloned());

            for method in &declaration.methods {
                let generics = combined_generics(&outer, &method.function.generics);
                let scope = function_scope(id, path, location, Some(&method.name), generics);
                results.push(f(&scope, &method.function)?);
            }
        }

        ItemKind::TraitImpl(imp) => {
            for method in &imp.methods {
                let generics = combined_generics(&imp.generics, &method.function.generics);
                let scope = function_scope(id, path, location, Some(&method.name), generics);
                results.push(f(&scope, &method.function)?);
            }
        }

        ItemKind::TypeImpl(imp) => {
            for method in &imp.methods {
                let generics = combined_generics(&imp.generics, &method.function.generics);
                let scope = function_scope(id, path, location, Some(&method.name), generics);
                results.push(f(&scope, &method.function)?);
            }
        }

        ItemKind::Struct(_) => {}
    }

    Ok(results)
}

/// Runs `f` over every function in the crate, in parallel when asked.
pub fn for_each_function_mut<T, F>(
    krate: &mut Crate,
    parallel: bool,
    f: F,
) -> Result<Vec<T>, CompilerError>
where
    T: Send,
    F: Fn(&FunctionScope, &mut Function) -> Result<T, CompilerError> + Sync,
{
    let per_item = |(index, item): (usize, &mut Item)| {
        visit_item_functions_mut(
            ItemId(index as u32),
            item,
            &mut |scope: &FunctionScope<'_>, function: &mut Function| f(scope, function),
        )
    };

    let results: Vec<Result<Vec<T>, CompilerError>> = if parallel {
        krate.items.par_iter_mut().enumerate().map(per_item).collect()
    } else {
        krate.items.iter_mut().enumerate().map(per_item).collect()
    };

    let mut collected = Vec::new();
    for result in results {
        collected.extend(result?);
    }

    Ok(collected)
}

/// Read-only counterpart of `for_each_function_mut`.
pub fn for_each_function<T, F>(krate: &Crate, parallel: bool, f: F) -> Result<Vec<T>, CompilerError>
where
    T: Send,
    F: Fn(&FunctionScope, &Function) -> Result<T, CompilerError> + Sync,
{
    let per_item = |(index, item): (usize, &Item)| {
        visit_item_functions(
            ItemId(index as u32),
            item,
            &mut |scope: &FunctionScope<'_>, function: &Function| f(scope, function),
        )
    };

    let results: Vec<Result<Vec<T>, CompilerError>> = if parallel {
        krate.items.par_iter().enumerate().map(per_item).collect()
    } else {
        krate.items.iter().enumerate().map(per_item).collect()
    };

    let mut collected = Vec::new();
    for result in results {
        collected.extend(result?);
    }

    Ok(collected)
}

// ============================================================
// Mutable visitor
// ============================================================
pub trait HirVisitorMut {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        walk_expr_mut(self, expr)
    }

    fn visit_pattern(&mut self, pattern: &mut Pattern) -> Result<(), CompilerError> {
        walk_pattern_mut(self, pattern)
    }

    fn visit_type(&mut self, ty: &mut HirType) -> Result<(), CompilerError> {
        walk_type_mut(self, ty)
    }

    fn visit_generic_path(&mut self, path: &mut GenericPath) -> Result<(), CompilerError> {
        walk_generic_path_mut(self, path)
    }
}

pub fn walk_crate_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    krate: &mut Crate,
) -> Result<(), CompilerError> {
    for item in &mut krate.items {
        walk_item_mut(visitor, item)?;
    }

    for vtable in &mut krate.vtables {
        visitor.visit_generic_path(&mut vtable.trait_path)?;
        visitor.visit_type(&mut vtable.concrete)?;
    }

    Ok(())
}

fn walk_generics_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    generics: &mut [GenericParam],
) -> Result<(), CompilerError> {
    for param in generics {
        for bound in &mut param.bounds {
            visitor.visit_generic_path(bound)?;
        }
    }
    Ok(())
}

pub fn walk_item_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    item: &mut Item,
) -> Result<(), CompilerError> {
    match &mut item.kind {
        ItemKind::Function(function) => walk_function_mut(visitor, function),

        ItemKind::Struct(definition) => {
            walk_generics_mut(visitor, &mut definition.generics)?;
            for field in &mut definition.fields {
                visitor.visit_type(&mut field.ty)?;
            }
            Ok(())
        }

        ItemKind::Trait(declaration) => {
            walk_generics_mut(visitor, &mut declaration.generics)?;
            for method in &mut declaration.methods {
                walk_function_mut(visitor, &mut method.function)?;
            }
            Ok(())
        }

        ItemKind::TraitImpl(imp) => {
            walk_generics_mut(visitor, &mut imp.generics)?;
            visitor.visit_generic_path(&mut imp.trait_path)?;
            visitor.visit_type(&mut imp.self_ty)?;
            for (_, ty) in &mut imp.types {
                visitor.visit_type(ty)?;
            }
            for method in &mut imp.methods {
                walk_function_mut(visitor, &mut method.function)?;
            }
            Ok(())
        }

        ItemKind::TypeImpl(imp) => {
            walk_generics_mut(visitor, &mut imp.generics)?;
            visitor.visit_type(&mut imp.self_ty)?;
            for method in &mut imp.methods {
                walk_function_mut(visitor, &mut method.function)?;
            }
            Ok(())
        }
    }
}

pub fn walk_function_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    function: &mut Function,
) -> Result<(), CompilerError> {
    walk_generics_mut(visitor, &mut function.generics)?;

    for arg in &mut function.args {
        visitor.visit_pattern(&mut arg.pattern)?;
        visitor.visit_type(&mut arg.ty)?;
    }
    visitor.visit_type(&mut function.ret)?;

    if let Some(body) = &mut function.body {
        for local in &mut body.locals {
            visitor.visit_type(&mut local.ty)?;
        }
        visitor.visit_expr(&mut body.root)?;
    }

    Ok(())
}

fn walk_resolution_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    resolution: &mut Option<MethodResolution>,
) -> Result<(), CompilerError> {
    let Some(resolution) = resolution else {
        return Ok(());
    };

    if let Some(trait_path) = &mut resolution.trait_path {
        visitor.visit_generic_path(trait_path)?;
    }
    visitor.visit_type(&mut resolution.self_ty)?;
    for param in &mut resolution.method_params {
        visitor.visit_type(param)?;
    }
    for step in &mut resolution.adjust.derefs {
        if let DerefStep::Overloaded { target, .. } = step {
            visitor.visit_type(target)?;
        }
    }

    Ok(())
}

fn walk_call_path_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    path: &mut CallPath,
) -> Result<(), CompilerError> {
    match path {
        CallPath::Function(path) => visitor.visit_generic_path(path),

        CallPath::UfcsKnown {
            self_ty,
            trait_path,
            params,
            ..
        } => {
            visitor.visit_type(self_ty)?;
            visitor.visit_generic_path(trait_path)?;
            for param in params {
                visitor.visit_type(param)?;
            }
            Ok(())
        }

        CallPath::UfcsInherent {
            self_ty, params, ..
        } => {
            visitor.visit_type(self_ty)?;
            for param in params {
                visitor.visit_type(param)?;
            }
            Ok(())
        }
    }
}

pub fn walk_expr_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    expr: &mut Expr,
) -> Result<(), CompilerError> {
    visitor.visit_type(&mut expr.ty)?;

    match &mut expr.kind {
        ExprKind::Block { statements, tail } => {
            for statement in statements {
                visitor.visit_expr(statement)?;
            }
            if let Some(tail) = tail {
                visitor.visit_expr(tail)?;
            }
        }

        ExprKind::Let { pattern, value } => {
            if let Some(value) = value {
                visitor.visit_expr(value)?;
            }
            visitor.visit_pattern(pattern)?;
        }

        ExprKind::Return(value) | ExprKind::Break(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value)?;
            }
        }

        ExprKind::Loop { body } => visitor.visit_expr(body)?,

        ExprKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(condition)?;
            visitor.visit_expr(then_branch)?;
            if let Some(else_branch) = else_branch {
                visitor.visit_expr(else_branch)?;
            }
        }

        ExprKind::Match { scrutinee, arms } => {
            visitor.visit_expr(scrutinee)?;
            for arm in arms {
                visitor.visit_pattern(&mut arm.pattern)?;
                if let Some(guard) = &mut arm.guard {
                    visitor.visit_expr(guard)?;
                }
                visitor.visit_expr(&mut arm.body)?;
            }
        }

        ExprKind::Assign {
            target,
            value,
            resolution,
            ..
        } => {
            visitor.visit_expr(value)?;
            visitor.visit_expr(target)?;
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::BinOp {
            left,
            right,
            resolution,
            ..
        } => {
            visitor.visit_expr(left)?;
            visitor.visit_expr(right)?;
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::UniOp {
            operand,
            resolution,
            ..
        } => {
            visitor.visit_expr(operand)?;
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::Borrow { value, .. } => visitor.visit_expr(value)?,

        ExprKind::Deref { value, resolution } => {
            visitor.visit_expr(value)?;
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::Index {
            value,
            index,
            resolution,
        } => {
            visitor.visit_expr(value)?;
            visitor.visit_expr(index)?;
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::Field { value, .. } => visitor.visit_expr(value)?,

        ExprKind::Literal(_) | ExprKind::Local(_) => {}

        ExprKind::ItemPath(path) => visitor.visit_generic_path(path)?,

        ExprKind::CallPath { path, args } => {
            walk_call_path_mut(visitor, path)?;
            for arg in args {
                visitor.visit_expr(arg)?;
            }
        }

        ExprKind::CallValue {
            callee,
            args,
            resolution,
        } => {
            visitor.visit_expr(callee)?;
            for arg in args {
                visitor.visit_expr(arg)?;
            }
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::CallMethod {
            receiver,
            args,
            resolution,
            ..
        } => {
            visitor.visit_expr(receiver)?;
            for arg in args {
                visitor.visit_expr(arg)?;
            }
            walk_resolution_mut(visitor, resolution)?;
        }

        ExprKind::Closure { args, ret, body, .. } => {
            for arg in args {
                visitor.visit_pattern(&mut arg.pattern)?;
                visitor.visit_type(&mut arg.ty)?;
            }
            visitor.visit_type(ret)?;
            visitor.visit_expr(body)?;
        }

        ExprKind::StructLiteral { path, fields } => {
            visitor.visit_generic_path(path)?;
            for (_, value) in fields {
                visitor.visit_expr(value)?;
            }
        }

        ExprKind::Tuple(elements) => {
            for element in elements {
                visitor.visit_expr(element)?;
            }
        }

        ExprKind::Unsize { value, .. } => visitor.visit_expr(value)?,
    }

    Ok(())
}

pub fn walk_pattern_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    pattern: &mut Pattern,
) -> Result<(), CompilerError> {
    match &mut pattern.kind {
        PatternKind::Any | PatternKind::Literal(_) => Ok(()),

        PatternKind::Binding { sub, .. } => match sub {
            Some(sub) => visitor.visit_pattern(sub),
            None => Ok(()),
        },

        PatternKind::Tuple(elements) => {
            for element in elements {
                visitor.visit_pattern(element)?;
            }
            Ok(())
        }

        PatternKind::Struct { path, fields } => {
            visitor.visit_generic_path(path)?;
            for (_, field) in fields {
                visitor.visit_pattern(field)?;
            }
            Ok(())
        }
    }
}

pub fn walk_type_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    ty: &mut HirType,
) -> Result<(), CompilerError> {
    match ty {
        HirType::Infer | HirType::Primitive(_) | HirType::Diverge | HirType::Generic { .. } => {
            Ok(())
        }

        HirType::Tuple(fields) => {
            for field in fields {
                visitor.visit_type(field)?;
            }
            Ok(())
        }

        HirType::Path(path) => visitor.visit_generic_path(path),

        HirType::Borrow { inner, .. } => visitor.visit_type(inner),

        HirType::Function { args, ret } | HirType::Closure { args, ret, .. } => {
            for arg in args {
                visitor.visit_type(arg)?;
            }
            visitor.visit_type(ret)
        }

        HirType::ErasedType {
            origin,
            bounds,
            resolved,
            ..
        } => {
            visitor.visit_generic_path(origin)?;
            for bound in bounds {
                visitor.visit_generic_path(bound)?;
            }
            match resolved {
                Some(resolved) => visitor.visit_type(resolved),
                None => Ok(()),
            }
        }

        HirType::TraitObject { traits } => {
            for bound in traits {
                visitor.visit_generic_path(bound)?;
            }
            Ok(())
        }
    }
}

pub fn walk_generic_path_mut<V: HirVisitorMut + ?Sized>(
    visitor: &mut V,
    path: &mut GenericPath,
) -> Result<(), CompilerError> {
    for param in &mut path.params {
        visitor.visit_type(param)?;
    }
    Ok(())
}

// ============================================================
// Read-only visitor
// ============================================================
pub trait HirVisitor {
    fn visit_expr(&mut self, expr: &Expr) -> Result<(), CompilerError> {
        walk_expr(self, expr)
    }

    fn visit_type(&mut self, ty: &HirType) -> Result<(), CompilerError> {
        walk_type(self, ty)
    }
}

pub fn walk_function<V: HirVisitor + ?Sized>(
    visitor: &mut V,
    function: &Function,
) -> Result<(), CompilerError> {
    for arg in &function.args {
        visitor.visit_type(&arg.ty)?;
    }
    visitor.visit_type(&function.ret)?;

    if let Some(body) = &function.body {
        for local in &body.locals {
            visitor.visit_type(&local.ty)?;
        }
        visitor.visit_expr(&body.root)?;
    }

    Ok(())
}

pub fn walk_item<V: HirVisitor + ?Sized>(visitor: &mut V, item: &Item) -> Result<(), CompilerError> {
    match &item.kind {
        ItemKind::Function(function) => walk_function(visitor, function),

        ItemKind::Struct(definition) => {
            for field in &definition.fields {
                visitor.visit_type(&field.ty)?;
            }
            Ok(())
        }

        ItemKind::Trait(declaration) => {
            for method in &declaration.methods {
                walk_function(visitor, &method.function)?;
            }
            Ok(())
        }

        ItemKind::TraitImpl(imp) => {
            visitor.visit_type(&imp.self_ty)?;
            for param in &imp.trait_path.params {
                visitor.visit_type(param)?;
            }
            for (_, ty) in &imp.types {
                visitor.visit_type(ty)?;
            }
            for method in &imp.methods {
                walk_function(visitor, &method.function)?;
            }
            Ok(())
        }

        ItemKind::TypeImpl(imp) => {
            visitor.visit_type(&imp.self_ty)?;
            for method in &imp.methods {
                walk_function(visitor, &method.function)?;
            }
            Ok(())
        }
    }
}

/// Calls `f` on each direct child expression, in evaluation order.
pub fn for_each_child_expr<'a>(expr: &'a Expr, mut f: impl FnMut(&'a Expr)) {
    match &expr.kind {
        ExprKind::Block { statements, tail } => {
            statements.iter().for_each(&mut f);
            if let Some(tail) = tail {
                f(tail);
            }
        }

        ExprKind::Let { value, .. } | ExprKind::Return(value) | ExprKind::Break(value) => {
            if let Some(value) = value {
                f(value);
            }
        }

        ExprKind::Loop { body } => f(body),

        ExprKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            f(condition);
            f(then_branch);
            if let Some(else_branch) = else_branch {
                f(else_branch);
            }
        }

        ExprKind::Match { scrutinee, arms } => {
            f(scrutinee);
            for arm in arms {
                if let Some(guard) = &arm.guard {
                    f(guard);
                }
                f(&arm.body);
            }
        }

        ExprKind::Assign { target, value, .. } => {
            f(value);
            f(target);
        }

        ExprKind::BinOp { left, right, .. } => {
            f(left);
            f(right);
        }

        ExprKind::UniOp { operand, .. } => f(operand),

        ExprKind::Borrow { value, .. }
        | ExprKind::Deref { value, .. }
        | ExprKind::Field { value, .. }
        | ExprKind::Unsize { value, .. } => f(value),

        ExprKind::Index { value, index, .. } => {
            f(value);
            f(index);
        }

        ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::ItemPath(_) => {}

        ExprKind::CallPath { args, .. } => args.iter().for_each(&mut f),

        ExprKind::CallValue { callee, args, .. } => {
            f(callee);
            args.iter().for_each(&mut f);
        }

        ExprKind::CallMethod { receiver, args, .. } => {
            f(receiver);
            args.iter().for_each(&mut f);
        }

        ExprKind::Closure { body, .. } => f(body),

        ExprKind::StructLiteral { fields, .. } => {
            for (_, value) in fields {
                f(value);
            }
        }

        ExprKind::Tuple(elements) => elements.iter().for_each(&mut f),
    }
}

pub fn walk_expr<V: HirVisitor + ?Sized>(visitor: &mut V, expr: &Expr) -> Result<(), CompilerError> {
    visitor.visit_type(&expr.ty)?;

    match &expr.kind {
        ExprKind::CallPath { path, .. } => match path {
            CallPath::Function(path) => {
                for param in &path.params {
                    visitor.visit_type(param)?;
                }
            }
            CallPath::UfcsKnown {
                self_ty, params, ..
            }
            | CallPath::UfcsInherent {
                self_ty, params, ..
            } => {
                visitor.visit_type(self_ty)?;
                for param in params {
                    visitor.visit_type(param)?;
                }
            }
        },

        ExprKind::Closure { args, ret, .. } => {
            for arg in args {
                visitor.visit_type(&arg.ty)?;
            }
            visitor.visit_type(ret)?;
        }

        _ => {}
    }

    let mut result = Ok(());
    for_each_child_expr(expr, |child| {
        if result.is_ok() {
            result = visitor.visit_expr(child);
        }
    });
    result
}

pub fn walk_type<V: HirVisitor + ?Sized>(visitor: &mut V, ty: &HirType) -> Result<(), CompilerError> {
    match ty {
        HirType::Infer | HirType::Primitive(_) | HirType::Diverge | HirType::Generic { .. } => {
            Ok(())
        }

        HirType::Tuple(fields) => {
            for field in fields {
                visitor.visit_type(field)?;
            }
            Ok(())
        }

        HirType::Path(path) => {
            for param in &path.params {
                visitor.visit_type(param)?;
            }
            Ok(())
        }

        HirType::Borrow { inner, .. } => visitor.visit_type(inner),

        HirType::Function { args, ret } | HirType::Closure { args, ret, .. } => {
            for arg in args {
                visitor.visit_type(arg)?;
            }
            visitor.visit_type(ret)
        }

        HirType::ErasedType {
            origin,
            bounds,
            resolved,
            ..
        } => {
            for param in &origin.params {
                visitor.visit_type(param)?;
            }
            for bound in bounds {
                for param in &bound.params {
                    visitor.visit_type(param)?;
                }
            }
            match resolved {
                Some(resolved) => visitor.visit_type(resolved),
                None => Ok(()),
            }
        }

        HirType::TraitObject { traits } => {
            for bound in traits {
                for param in &bound.params {
                    visitor.visit_type(param)?;
                }
            }
            Ok(())
        }
    }
}
