//! ============================================================
//!                     Closure Expansion
//! ============================================================
//! Replaces every closure literal with
//!  - a capture environment struct `<owner>::closure#<n>`, one field per
//!    captured variable (`_0`, `_1`, ...), holding the value or a reference
//!    depending on how the closure body uses it,
//!  - impls of the call traits the closure supports, where the strongest
//!    trait holds the body and the weaker ones delegate to it,
//!  - a struct literal building the environment where the closure was.
//!
//! Which traits are generated:
//!  - a capture is consumed by value        -> FnOnce
//!  - a capture is used mutably              -> FnMut, FnOnce
//!  - otherwise                              -> Fn, FnMut, FnOnce
//!
//! Calls of a closure value are rewritten into method calls of the
//! strongest trait, with a dispatch resolution attached, so UFCS
//! normalization turns them into explicit trait calls afterwards.
//!
//! Generated items are appended after every existing item, so the pass
//! walks items one by one rather than in parallel: item ids are handed
//! out crate-wide as closures are found.

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_datatypes::{
    BorrowKind, GenericParam, GenericPath, HirType, SimplePath, generic_params_as_types,
};
use crate::hir::hir_nodes::{
    Binding, BindingId, CallPath, ClosureId, Crate, DerefStep, Expr, ExprKind, Function,
    FunctionArg, FunctionBody, FunctionReceiver, ImplSource, Item, ItemId, ItemKind, LocalUse,
    MethodResolution, NamedFunction, Pattern, PatternKind, ReceiverAdjust, Struct, StructField,
    TextLocation, TraitImpl, Usage,
};
use crate::hir::hir_traits::TraitTable;
use crate::hir::hir_visitor::{
    FunctionScope, HirVisitorMut, visit_item_functions_mut, walk_crate_mut, walk_expr_mut,
    walk_pattern_mut, walk_type_mut,
};
use crate::hir::lang_items::{self, CallTrait};
use crate::hir_expand::annotate_usage::{Capture, closure_captures, closure_class, collect_declared};
use crate::hir_expand::{ExpansionReport, PassOptions};
use crate::{closure_log, return_hir_transformation_error, return_rule_error};
use rustc_hash::FxHashMap;

/// What call sites need to know about an expanded closure.
#[derive(Debug, Clone)]
struct ClosureInfo {
    class: CallTrait,
    env_ty: HirType,

    /// `Fn*<(Args,)>` for the strongest implemented trait.
    trait_path: GenericPath,
    impl_item: ItemId,
}

pub(crate) fn run(
    krate: &mut Crate,
    _options: &PassOptions,
    report: &mut ExpansionReport,
) -> Result<(), CompilerError> {
    let table = TraitTable::build(krate);
    let original_len = krate.items.len();

    let mut expander = ClosureExpander {
        table: &table,
        first_new_item: original_len,
        pending: Vec::new(),
        closures: FxHashMap::default(),
    };

    for (index, item) in krate.items.iter_mut().enumerate() {
        visit_item_functions_mut(
            ItemId(index as u32),
            item,
            &mut |scope: &FunctionScope<'_>, function: &mut Function| {
                expander.expand_function(scope, function)
            },
        )?;
    }

    let ClosureExpander {
        pending, closures, ..
    } = expander;

    krate.items.extend(pending);
    report.closures_expanded += closures.len();

    walk_crate_mut(&mut CallSiteRewriter { closures: &closures }, krate)?;
    walk_crate_mut(&mut ClosureRetyper { closures: &closures }, krate)?;

    Ok(())
}

// ============================================================
// Expansion
// ============================================================
struct ClosureExpander<'a> {
    table: &'a TraitTable,
    first_new_item: usize,
    pending: Vec<Item>,
    closures: FxHashMap<ClosureId, ClosureInfo>,
}

impl ClosureExpander<'_> {
    fn next_item_id(&self) -> ItemId {
        ItemId((self.first_new_item + self.pending.len()) as u32)
    }

    fn expand_function(
        &mut self,
        scope: &FunctionScope,
        function: &mut Function,
    ) -> Result<(), CompilerError> {
        let Some(body) = &mut function.body else {
            return Ok(());
        };

        let FunctionBody { locals, root } = body;
        let mut visitor = FunctionClosures {
            expander: self,
            owner_path: scope.function_path(),
            generics: &scope.generics,
            locals,
        };

        visitor.visit_expr(root)
    }
}

/// Expands the closures of one function body, innermost first.
struct FunctionClosures<'e, 'a, 'b> {
    expander: &'e mut ClosureExpander<'a>,
    owner_path: SimplePath,
    generics: &'b [GenericParam],
    locals: &'b mut Vec<Binding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureMode {
    Value,
    Shared,
    Unique,
}

impl HirVisitorMut for FunctionClosures<'_, '_, '_> {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        walk_expr_mut(self, expr)?;

        if matches!(expr.kind, ExprKind::Closure { .. }) {
            let placeholder = Expr::new(
                ExprKind::Tuple(Vec::new()),
                HirType::unit(),
                expr.location.to_owned(),
            );
            let literal = std::mem::replace(expr, placeholder);
            *expr = self.expand_closure(literal)?;
        }

        Ok(())
    }
}

impl FunctionClosures<'_, '_, '_> {
    fn expand_closure(&mut self, literal: Expr) -> Result<Expr, CompilerError> {
        let Expr { kind, location, .. } = literal;
        let ExprKind::Closure {
            id,
            args,
            ret,
            body,
            is_move,
        } = kind
        else {
            return_hir_transformation_error!("Expected a closure literal", location, {
                CompilationStage => "Closure Expansion",
            });
        };

        if self.expander.closures.contains_key(&id) {
            return_hir_transformation_error!(
                format!("{id} is used by more than one closure literal"),
                location,
                { CompilationStage => "Closure Expansion" }
            );
        }

        let captures = closure_captures(
            self.expander.table,
            self.generics,
            &*self.locals,
            &args[..],
            &*body,
        );

        for capture in &captures {
            let binding = &self.locals[capture.binding.0 as usize];
            if binding.ty.mentions_closure(id) {
                return_rule_error!(
                    format!(
                        "This closure captures '{}', which holds the closure itself",
                        binding.name
                    ),
                    location,
                    {
                        CompilationStage => "Closure Expansion",
                        PrimarySuggestion => "Use a named function for recursion, or pass the closure in as an argument",
                    }
                );
            }
        }

        let class = closure_class(&captures);
        let modes: Vec<CaptureMode> = captures
            .iter()
            .map(|capture| capture_mode(capture, is_move))
            .collect();

        // ----------------------------
        // Environment struct
        // ----------------------------
        let env_path = GenericPath::new(
            self.owner_path.join(&format!("closure#{}", id.0)),
            generic_params_as_types(self.generics),
        );
        let env_ty = HirType::Path(env_path.clone());

        let fields: Vec<StructField> = captures
            .iter()
            .zip(&modes)
            .enumerate()
            .map(|(index, (capture, mode))| StructField {
                name: field_name(index),
                ty: captured_field_type(&self.locals[capture.binding.0 as usize].ty, *mode),
            })
            .collect();

        let struct_item = Item {
            path: env_path.path.to_owned(),
            location: location.to_owned(),
            kind: ItemKind::Struct(Struct {
                generics: self.generics.to_vec(),
                fields: fields.to_owned(),
            }),
        };
        self.expander.pending.push(struct_item);

        // ----------------------------
        // Call trait impls
        // ----------------------------
        let args_ty = HirType::Tuple(args.iter().map(|arg| arg.ty.to_owned()).collect());
        let call_trait_path =
            |call_trait: CallTrait| GenericPath::lang(call_trait.path(), vec![args_ty.to_owned()]);

        let primary = self.build_primary_method(
            class,
            &env_ty,
            &args_ty,
            args,
            ret.to_owned(),
            *body,
            &captures,
            &modes,
            &fields,
            &location,
        )?;

        let mut class_impl = None;
        let mut primary = Some(primary);

        for call_trait in [CallTrait::Fn, CallTrait::FnMut, CallTrait::FnOnce] {
            if call_trait < class {
                continue;
            }

            let function = if call_trait == class {
                match primary.take() {
                    Some(function) => function,
                    None => continue,
                }
            } else {
                delegating_method(
                    call_trait,
                    class,
                    &env_ty,
                    &args_ty,
                    call_trait_path(class),
                    &ret,
                    &location,
                )
            };

            let types = if call_trait == CallTrait::FnOnce {
                vec![(lang_items::FN_ONCE_OUTPUT.to_owned(), ret.to_owned())]
            } else {
                Vec::new()
            };

            let impl_id = self.expander.next_item_id();
            if call_trait == class {
                class_impl = Some(impl_id);
            }

            self.expander.pending.push(Item {
                path: env_path.path.join(call_trait_name(call_trait)),
                location: location.to_owned(),
                kind: ItemKind::TraitImpl(TraitImpl {
                    generics: self.generics.to_vec(),
                    trait_path: call_trait_path(call_trait),
                    self_ty: env_ty.to_owned(),
                    methods: vec![NamedFunction {
                        name: call_trait.method().to_owned(),
                        function,
                    }],
                    types,
                }),
            });
        }

        let Some(impl_item) = class_impl else {
            return_hir_transformation_error!(
                format!("No call trait impl was generated for closure {id}"),
                location,
                { CompilationStage => "Closure Expansion" }
            );
        };

        closure_log!(
            Green "Expanded ", Bright id.to_string(), " as ", format!("{class:?}"),
            " with ", captures.len(), " captures"
        );

        self.expander.closures.insert(
            id,
            ClosureInfo {
                class,
                env_ty: env_ty.to_owned(),
                trait_path: call_trait_path(class),
                impl_item,
            },
        );

        // ----------------------------
        // Construction
        // ----------------------------
        let construction_fields = captures
            .iter()
            .zip(&modes)
            .enumerate()
            .map(|(index, (capture, mode))| {
                let binding_ty = self.locals[capture.binding.0 as usize].ty.to_owned();
                (
                    field_name(index),
                    capture_expression(capture.binding, binding_ty, *mode, &location),
                )
            })
            .collect();

        Ok(Expr::new(
            ExprKind::StructLiteral {
                path: env_path,
                fields: construction_fields,
            },
            env_ty,
            location,
        ))
    }

    /// Moves the closure body into the method of its strongest call trait.
    #[allow(clippy::too_many_arguments)]
    fn build_primary_method(
        &mut self,
        class: CallTrait,
        env_ty: &HirType,
        args_ty: &HirType,
        args: Vec<FunctionArg>,
        ret: HirType,
        mut body: Expr,
        captures: &[Capture],
        modes: &[CaptureMode],
        fields: &[StructField],
        location: &TextLocation,
    ) -> Result<Function, CompilerError> {
        let self_ty = receiver_type(class, env_ty);

        // Local 0 is `self`, then every binding the closure declares
        let mut new_locals = vec![Binding::new("self", self_ty.to_owned(), class == CallTrait::FnOnce)];
        let mut declared = Vec::new();
        for arg in &args {
            arg.pattern.bindings(&mut declared);
        }
        collect_declared(&body, &mut declared);

        let mut remap = FxHashMap::default();
        for (binding, _) in declared {
            if remap.contains_key(&binding) {
                continue;
            }
            remap.insert(binding, BindingId(new_locals.len() as u32));
            new_locals.push(self.locals[binding.0 as usize].to_owned());
        }

        let mut rewriter = ClosureBodyRewriter {
            class,
            env_ty,
            self_ty: &self_ty,
            remap: &remap,
            captures,
            modes,
            fields,
            locals: &self.locals[..],
        };

        let mut arg_patterns = Vec::with_capacity(args.len());
        for mut arg in args {
            rewriter.visit_pattern(&mut arg.pattern)?;
            arg_patterns.push(arg.pattern);
        }
        rewriter.visit_expr(&mut body)?;

        Ok(Function {
            generics: Vec::new(),
            receiver: receiver_kind(class),
            args: vec![
                FunctionArg {
                    pattern: Pattern::binding(BindingId(0), location.to_owned()),
                    ty: self_ty,
                },
                FunctionArg {
                    pattern: Pattern {
                        kind: PatternKind::Tuple(arg_patterns),
                        location: location.to_owned(),
                    },
                    ty: args_ty.to_owned(),
                },
            ],
            ret,
            body: Some(FunctionBody {
                locals: new_locals,
                root: body,
            }),
        })
    }
}

fn capture_mode(capture: &Capture, is_move: bool) -> CaptureMode {
    if is_move || capture.consumed {
        return CaptureMode::Value;
    }

    match capture.usage {
        Usage::Mutable => CaptureMode::Unique,
        Usage::Shared => CaptureMode::Shared,
        Usage::ByValue | Usage::Unused => CaptureMode::Value,
    }
}

fn captured_field_type(binding_ty: &HirType, mode: CaptureMode) -> HirType {
    match mode {
        CaptureMode::Value => binding_ty.to_owned(),
        CaptureMode::Shared => HirType::borrow(BorrowKind::Shared, binding_ty.to_owned()),
        CaptureMode::Unique => HirType::borrow(BorrowKind::Unique, binding_ty.to_owned()),
    }
}

fn field_name(index: usize) -> String {
    format!("_{index}")
}

fn call_trait_name(call_trait: CallTrait) -> &'static str {
    match call_trait {
        CallTrait::Fn => "Fn",
        CallTrait::FnMut => "FnMut",
        CallTrait::FnOnce => "FnOnce",
    }
}

fn receiver_type(call_trait: CallTrait, env_ty: &HirType) -> HirType {
    match call_trait {
        CallTrait::Fn => HirType::borrow(BorrowKind::Shared, env_ty.to_owned()),
        CallTrait::FnMut => HirType::borrow(BorrowKind::Unique, env_ty.to_owned()),
        CallTrait::FnOnce => env_ty.to_owned(),
    }
}

fn receiver_kind(call_trait: CallTrait) -> FunctionReceiver {
    match call_trait {
        CallTrait::Fn => FunctionReceiver::Borrow,
        CallTrait::FnMut => FunctionReceiver::BorrowMut,
        CallTrait::FnOnce => FunctionReceiver::Value,
    }
}

fn local_expr(binding: BindingId, usage: Usage, ty: HirType, location: &TextLocation) -> Expr {
    Expr::new(
        ExprKind::Local(LocalUse {
            binding,
            usage,
            seq: 0,
        }),
        ty,
        location.to_owned(),
    )
}

/// The value stored into an environment field when the closure is built.
fn capture_expression(
    binding: BindingId,
    binding_ty: HirType,
    mode: CaptureMode,
    location: &TextLocation,
) -> Expr {
    let (kind, usage) = match mode {
        CaptureMode::Value => return local_expr(binding, Usage::ByValue, binding_ty, location),
        CaptureMode::Shared => (BorrowKind::Shared, Usage::Shared),
        CaptureMode::Unique => (BorrowKind::Unique, Usage::Mutable),
    };

    Expr::new(
        ExprKind::Borrow {
            kind,
            value: Box::new(local_expr(binding, usage, binding_ty.to_owned(), location)),
        },
        HirType::borrow(kind, binding_ty),
        location.to_owned(),
    )
}

/// A weaker call trait method forwarding to the strongest one.
/// `call_mut(&mut self, a)` -> `<Env as Fn<A>>::call(&*self, a)`
/// `call_once(self, a)`     -> `<Env as Fn*<A>>::call*(&[mut] self, a)`
fn delegating_method(
    call_trait: CallTrait,
    class: CallTrait,
    env_ty: &HirType,
    args_ty: &HirType,
    class_trait_path: GenericPath,
    ret: &HirType,
    location: &TextLocation,
) -> Function {
    let self_ty = receiver_type(call_trait, env_ty);
    let self_local = local_expr(BindingId(0), Usage::ByValue, self_ty.to_owned(), location);

    // The place holding the environment: `*self` for references, `self` by value
    let env_place = match call_trait {
        CallTrait::FnOnce => self_local,
        CallTrait::Fn | CallTrait::FnMut => Expr::new(
            ExprKind::Deref {
                value: Box::new(self_local),
                resolution: None,
            },
            env_ty.to_owned(),
            location.to_owned(),
        ),
    };

    let receiver = match class {
        CallTrait::Fn => Expr::new(
            ExprKind::Borrow {
                kind: BorrowKind::Shared,
                value: Box::new(env_place),
            },
            HirType::borrow(BorrowKind::Shared, env_ty.to_owned()),
            location.to_owned(),
        ),
        CallTrait::FnMut => Expr::new(
            ExprKind::Borrow {
                kind: BorrowKind::Unique,
                value: Box::new(env_place),
            },
            HirType::borrow(BorrowKind::Unique, env_ty.to_owned()),
            location.to_owned(),
        ),
        CallTrait::FnOnce => env_place,
    };

    let call = Expr::new(
        ExprKind::CallPath {
            path: CallPath::UfcsKnown {
                self_ty: env_ty.to_owned(),
                trait_path: class_trait_path,
                method: class.method().to_owned(),
                params: Vec::new(),
            },
            args: vec![
                receiver,
                local_expr(BindingId(1), Usage::ByValue, args_ty.to_owned(), location),
            ],
        },
        ret.to_owned(),
        location.to_owned(),
    );

    Function {
        generics: Vec::new(),
        receiver: receiver_kind(call_trait),
        args: vec![
            FunctionArg {
                pattern: Pattern::binding(BindingId(0), location.to_owned()),
                ty: self_ty.to_owned(),
            },
            FunctionArg {
                pattern: Pattern::binding(BindingId(1), location.to_owned()),
                ty: args_ty.to_owned(),
            },
        ],
        ret: ret.to_owned(),
        body: Some(FunctionBody {
            locals: vec![
                // `call_once` borrows its by-value self mutably to forward to `call_mut`
                Binding::new("self", self_ty, class == CallTrait::FnMut),
                Binding::new("args", args_ty.to_owned(), false),
            ],
            root: call,
        }),
    }
}

// ============================================================
// Closure body rewriting
// ============================================================

/// Moves a closure body into its own function:
/// declared bindings get new ids, captured ones become `self` field accesses.
struct ClosureBodyRewriter<'r> {
    class: CallTrait,
    env_ty: &'r HirType,
    self_ty: &'r HirType,
    remap: &'r FxHashMap<BindingId, BindingId>,
    captures: &'r [Capture],
    modes: &'r [CaptureMode],
    fields: &'r [StructField],
    locals: &'r [Binding],
}

impl ClosureBodyRewriter<'_> {
    /// `(*self)._i`, `*(*self)._i`, `self._i` or `*self._i`.
    fn capture_access(&self, index: usize, usage: Usage, location: &TextLocation) -> Expr {
        let self_local = local_expr(BindingId(0), usage, self.self_ty.to_owned(), location);

        let env = match self.class {
            CallTrait::FnOnce => self_local,
            CallTrait::Fn | CallTrait::FnMut => Expr::new(
                ExprKind::Deref {
                    value: Box::new(self_local),
                    resolution: None,
                },
                self.env_ty.to_owned(),
                location.to_owned(),
            ),
        };

        let field = Expr::new(
            ExprKind::Field {
                value: Box::new(env),
                field: field_name(index),
            },
            self.fields[index].ty.to_owned(),
            location.to_owned(),
        );

        match self.modes[index] {
            CaptureMode::Value => field,
            CaptureMode::Shared | CaptureMode::Unique => {
                let binding_ty = self.locals[self.captures[index].binding.0 as usize]
                    .ty
                    .to_owned();
                Expr::new(
                    ExprKind::Deref {
                        value: Box::new(field),
                        resolution: None,
                    },
                    binding_ty,
                    location.to_owned(),
                )
            }
        }
    }
}

impl HirVisitorMut for ClosureBodyRewriter<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        if let ExprKind::Local(local) = &mut expr.kind {
            if let Some(new_id) = self.remap.get(&local.binding) {
                local.binding = *new_id;
                return Ok(());
            }

            let usage = local.usage;
            let Some(index) = self
                .captures
                .iter()
                .position(|capture| capture.binding == local.binding)
            else {
                return_hir_transformation_error!(
                    format!(
                        "Closure body uses {} which is neither declared nor captured",
                        local.binding
                    ),
                    expr.location.to_owned(),
                    { CompilationStage => "Closure Expansion" }
                );
            };

            *expr = self.capture_access(index, usage, &expr.location);
            return Ok(());
        }

        walk_expr_mut(self, expr)
    }

    fn visit_pattern(&mut self, pattern: &mut Pattern) -> Result<(), CompilerError> {
        walk_pattern_mut(self, pattern)?;

        if let PatternKind::Binding { binding, .. } = &mut pattern.kind {
            match self.remap.get(binding) {
                Some(new_id) => *binding = *new_id,
                None => {
                    return_hir_transformation_error!(
                        format!("Closure pattern binds {binding}, which was never collected"),
                        pattern.location.to_owned(),
                        { CompilationStage => "Closure Expansion" }
                    );
                }
            }
        }

        Ok(())
    }
}

// ============================================================
// Call sites and types
// ============================================================

/// Peels references off a callee type to find the closure it calls.
fn closure_callee(ty: &HirType) -> Option<(usize, ClosureId)> {
    let mut derefs = 0;
    let mut current = ty;

    loop {
        match current {
            HirType::Closure { id, .. } => return Some((derefs, *id)),
            HirType::Borrow { inner, .. } => {
                derefs += 1;
                current = inner;
            }
            _ => return None,
        }
    }
}

/// `f(a, b)` on a closure value -> `f.call*((a, b))` resolved to the generated impl.
struct CallSiteRewriter<'a> {
    closures: &'a FxHashMap<ClosureId, ClosureInfo>,
}

impl HirVisitorMut for CallSiteRewriter<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) -> Result<(), CompilerError> {
        walk_expr_mut(self, expr)?;

        let ExprKind::CallValue { callee, .. } = &expr.kind else {
            return Ok(());
        };
        let Some((derefs, id)) = closure_callee(&callee.ty) else {
            return Ok(());
        };
        let Some(info) = self.closures.get(&id) else {
            return_hir_transformation_error!(
                format!("Call of {id}, but no literal for it was expanded"),
                expr.location.to_owned(),
                { CompilationStage => "Closure Expansion" }
            );
        };

        let kind = std::mem::replace(&mut expr.kind, ExprKind::Tuple(Vec::new()));
        let ExprKind::CallValue { callee, args, .. } = kind else {
            return Ok(());
        };

        let args_ty = HirType::Tuple(args.iter().map(|arg| arg.ty.to_owned()).collect());
        let packed_args = Expr::new(ExprKind::Tuple(args), args_ty, expr.location.to_owned());

        let autoref = match info.class {
            CallTrait::Fn => Some(BorrowKind::Shared),
            CallTrait::FnMut => Some(BorrowKind::Unique),
            CallTrait::FnOnce => None,
        };

        expr.kind = ExprKind::CallMethod {
            receiver: callee,
            method: info.class.method().to_owned(),
            args: vec![packed_args],
            resolution: Some(MethodResolution {
                trait_path: Some(info.trait_path.to_owned()),
                self_ty: info.env_ty.to_owned(),
                method_params: Vec::new(),
                source: ImplSource::Impl(info.impl_item),
                adjust: ReceiverAdjust {
                    derefs: vec![DerefStep::Builtin; derefs],
                    autoref,
                },
            }),
        };

        Ok(())
    }
}

/// Replaces every closure type with its environment struct.
struct ClosureRetyper<'a> {
    closures: &'a FxHashMap<ClosureId, ClosureInfo>,
}

impl HirVisitorMut for ClosureRetyper<'_> {
    fn visit_type(&mut self, ty: &mut HirType) -> Result<(), CompilerError> {
        walk_type_mut(self, ty)?;

        if let HirType::Closure { id, .. } = ty {
            match self.closures.get(id) {
                Some(info) => *ty = info.env_ty.to_owned(),
                None => {
                    return_hir_transformation_error!(
                        format!("Type mentions {id}, but no literal for it was expanded"),
                        TextLocation::default(),
                        { CompilationStage => "Closure Expansion" }
                    );
                }
            }
        }

        Ok(())
    }
}
