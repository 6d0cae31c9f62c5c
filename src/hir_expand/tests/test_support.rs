#![cfg(test)]

use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_builder::{BodyBuilder, function, function_item, location};
use crate::hir::hir_datatypes::{BorrowKind, GenericPath, HirType, SimplePath};
use crate::hir::hir_nodes::{
    BindingId, Crate, Expr, ExprKind, Function, FunctionArg, FunctionBody, FunctionReceiver,
    ImplSource, Item, ItemId, ItemKind, MethodResolution, NamedFunction, Pattern,
    ReceiverAdjust, Struct, StructField, Trait, TraitImpl, TypeImpl,
};
use crate::hir_expand::{ExpansionPass, ExpansionReport, PassOptions, run_pass};

pub(crate) fn demo_crate() -> Crate {
    Crate::new("demo")
}

pub(crate) fn sequential() -> PassOptions {
    PassOptions {
        parallel: false,
        verify_dispatch: true,
    }
}

/// Runs the given passes in order over `krate`, collecting one report.
pub(crate) fn run_passes(
    krate: &mut Crate,
    passes: &[ExpansionPass],
) -> Result<ExpansionReport, CompilerError> {
    let mut report = ExpansionReport::default();
    for pass in passes {
        run_pass(krate, *pass, &sequential(), &mut report)?;
    }
    Ok(report)
}

/// Adds `fn <path>(args) -> <ret of root>` built by `build`.
pub(crate) fn push_function(
    krate: &mut Crate,
    path: &str,
    build: impl FnOnce(&mut BodyBuilder) -> (Vec<FunctionArg>, Expr),
) -> ItemId {
    let mut body = BodyBuilder::new();
    let (args, root) = build(&mut body);
    let ret = root.ty.to_owned();
    krate.push_item(function_item(path, function(args, ret, body.finish(root)), 1))
}

pub(crate) fn struct_item(path: &str, fields: Vec<(&str, HirType)>) -> Item {
    Item {
        path: SimplePath::new(path),
        location: location(1),
        kind: ItemKind::Struct(Struct {
            generics: Vec::new(),
            fields: fields
                .into_iter()
                .map(|(name, ty)| StructField {
                    name: name.to_owned(),
                    ty,
                })
                .collect(),
        }),
    }
}

fn self_generic() -> HirType {
    HirType::Generic {
        name: String::from("Self"),
        index: 0,
    }
}

/// `trait <path> { fn <method>(&self) -> ret; ... }`
pub(crate) fn trait_item(path: &str, methods: &[(&str, HirType)]) -> Item {
    let methods = methods
        .iter()
        .map(|(name, ret)| NamedFunction {
            name: (*name).to_owned(),
            function: Function {
                generics: Vec::new(),
                receiver: FunctionReceiver::Borrow,
                args: vec![FunctionArg {
                    pattern: Pattern::binding(BindingId(0), location(1)),
                    ty: HirType::borrow(BorrowKind::Shared, self_generic()),
                }],
                ret: ret.to_owned(),
                body: None,
            },
        })
        .collect();

    Item {
        path: SimplePath::new(path),
        location: location(1),
        kind: ItemKind::Trait(Trait {
            generics: Vec::new(),
            methods,
            associated_types: Vec::new(),
        }),
    }
}

/// `fn <name>(&self) -> <ret of value> { value }` for an impl on `self_ty`.
pub(crate) fn ref_self_method(name: &str, self_ty: &HirType, value: Expr) -> NamedFunction {
    let mut body = BodyBuilder::new();
    let (_, self_arg) = body.arg("self", HirType::borrow(BorrowKind::Shared, self_ty.to_owned()), 1);
    let ret = value.ty.to_owned();

    NamedFunction {
        name: name.to_owned(),
        function: Function {
            generics: Vec::new(),
            receiver: FunctionReceiver::Borrow,
            args: vec![self_arg],
            ret,
            body: Some(body.finish(value)),
        },
    }
}

pub(crate) fn trait_impl(
    path: &str,
    trait_path: GenericPath,
    self_ty: HirType,
    methods: Vec<NamedFunction>,
) -> Item {
    Item {
        path: SimplePath::new(path),
        location: location(1),
        kind: ItemKind::TraitImpl(TraitImpl {
            generics: Vec::new(),
            trait_path,
            self_ty,
            methods,
            types: Vec::new(),
        }),
    }
}

pub(crate) fn type_impl(path: &str, self_ty: HirType, methods: Vec<NamedFunction>) -> Item {
    Item {
        path: SimplePath::new(path),
        location: location(1),
        kind: ItemKind::TypeImpl(TypeImpl {
            generics: Vec::new(),
            self_ty,
            methods,
        }),
    }
}

pub(crate) fn resolution(
    trait_path: Option<GenericPath>,
    self_ty: HirType,
    source: ImplSource,
    autoref: Option<BorrowKind>,
) -> MethodResolution {
    MethodResolution {
        trait_path,
        self_ty,
        method_params: Vec::new(),
        source,
        adjust: ReceiverAdjust {
            derefs: Vec::new(),
            autoref,
        },
    }
}

pub(crate) fn function_at<'a>(krate: &'a Crate, path: &str) -> &'a Function {
    match krate.item_by_path(&SimplePath::new(path)).map(|(_, item)| &item.kind) {
        Some(ItemKind::Function(function)) => function,
        _ => panic!("no function '{path}' in the crate"),
    }
}

pub(crate) fn body_of<'a>(krate: &'a Crate, path: &str) -> &'a FunctionBody {
    function_at(krate, path)
        .body
        .as_ref()
        .expect("function should have a body")
}

/// Statements and tail of a function whose root is a block.
pub(crate) fn block_parts<'a>(krate: &'a Crate, path: &str) -> (&'a [Expr], Option<&'a Expr>) {
    match &body_of(krate, path).root.kind {
        ExprKind::Block { statements, tail } => (statements.as_slice(), tail.as_deref()),
        other => panic!("expected a block root, found {other:?}"),
    }
}

/// The value of the `let` statement at `index`.
pub(crate) fn let_value(statements: &[Expr], index: usize) -> &Expr {
    match &statements[index].kind {
        ExprKind::Let {
            value: Some(value), ..
        } => value,
        other => panic!("expected a let with a value, found {other:?}"),
    }
}
