use super::test_support::{
    block_parts, demo_crate, function_at, let_value, push_function, ref_self_method, run_passes,
    struct_item, trait_impl, trait_item,
};
use crate::compiler_messages::compiler_warnings::WarningKind;
use crate::hir::hir_builder::{block, bool_ty, borrow, call, i32_ty, int, location, path_ty, struct_literal};
use crate::hir::hir_datatypes::{BorrowKind, GenericPath, HirType};
use crate::hir::hir_nodes::{CallPath, Crate, Expr, ExprKind, ImplSource, ItemId, ItemKind, VTableId};
use crate::hir::hir_validation::validate_after;
use crate::hir::lang_items;
use crate::hir_expand::ExpansionPass;

fn shape_trait() -> GenericPath {
    GenericPath::lang("demo::Shape", Vec::new())
}

fn square() -> HirType {
    path_ty("demo::Square", Vec::new())
}

fn circle() -> HirType {
    path_ty("demo::Circle", Vec::new())
}

/// `impl Shape` in the return type of `demo::make`
fn erased_shape() -> HirType {
    HirType::ErasedType {
        origin: GenericPath::lang("demo::make", Vec::new()),
        index: 0,
        bounds: vec![shape_trait()],
        resolved: None,
    }
}

fn boxed_shape() -> HirType {
    HirType::boxed(HirType::TraitObject {
        traits: vec![shape_trait()],
    })
}

/// Shape, Square and Circle with their impls. Returns the (Square, Circle) impl ids.
fn shapes_crate() -> (Crate, ItemId, ItemId) {
    let mut krate = demo_crate();
    krate.push_item(trait_item("demo::Shape", &[("area", i32_ty())]));
    krate.push_item(struct_item("demo::Square", Vec::new()));
    krate.push_item(struct_item("demo::Circle", Vec::new()));

    let square_impl = krate.push_item(trait_impl(
        "demo::impl_shape_square",
        shape_trait(),
        square(),
        vec![ref_self_method("area", &square(), int(4, 1))],
    ));
    let circle_impl = krate.push_item(trait_impl(
        "demo::impl_shape_circle",
        shape_trait(),
        circle(),
        vec![ref_self_method("area", &circle(), int(3, 1))],
    ));

    (krate, square_impl, circle_impl)
}

/// `fn make(flag: bool) -> impl Shape { <root> }`
fn push_make(krate: &mut Crate, build: impl FnOnce(Expr) -> Expr) {
    let make = push_function(krate, "demo::make", |body| {
        let (flag, flag_arg) = body.arg("flag", bool_ty(), 1);
        let root = build(body.local(flag, 2));
        (vec![flag_arg], root)
    });

    // The declared return type stays the placeholder whatever the body produces
    if let ItemKind::Function(function) = &mut krate.items[make.0 as usize].kind {
        function.ret = erased_shape();
    }
}

/// `let s = make(flag); <Erased as Shape>::area(&s)`
fn push_main(krate: &mut Crate) {
    push_function(krate, "demo::main", |body| {
        let (flag, flag_arg) = body.arg("flag", bool_ty(), 1);
        let made = call("demo::make", vec![body.local(flag, 2)], erased_shape(), 2);
        let (s, let_s) = body.let_binding("s", false, made, 2);

        let area = Expr::new(
            ExprKind::CallPath {
                path: CallPath::UfcsKnown {
                    self_ty: erased_shape(),
                    trait_path: shape_trait(),
                    method: String::from("area"),
                    params: Vec::new(),
                },
                args: vec![borrow(BorrowKind::Shared, body.local(s, 3), 3)],
            },
            i32_ty(),
            location(3),
        );

        (vec![flag_arg], block(vec![let_s], Some(area), 1))
    });
}

#[test]
fn single_producer_becomes_the_concrete_type() {
    let (mut krate, ..) = shapes_crate();
    push_make(&mut krate, |_| {
        block(Vec::new(), Some(struct_literal("demo::Square", Vec::new(), 2)), 1)
    });
    push_main(&mut krate);

    let report = run_passes(&mut krate, &[ExpansionPass::ErasedType]).expect("lowering should succeed");
    assert_eq!(report.erased_static, 1);
    assert_eq!(report.erased_dynamic, 0);
    assert!(krate.vtables.is_empty());

    assert_eq!(function_at(&krate, "demo::make").ret, square());

    let (statements, tail) = block_parts(&krate, "demo::main");
    assert_eq!(let_value(statements, 0).ty, square());

    // A statically resolved call keeps its explicit trait path
    let ExprKind::CallPath {
        path: CallPath::UfcsKnown { self_ty, .. },
        args,
    } = &tail.expect("tail").kind
    else {
        panic!("expected a trait call");
    };
    assert_eq!(*self_ty, square());
    assert_eq!(args[0].ty, HirType::borrow(BorrowKind::Shared, square()));

    validate_after(&krate, ExpansionPass::ErasedType).expect("no placeholder may survive");
}

#[test]
fn differing_producers_are_boxed_behind_a_trait_object() {
    let (mut krate, square_impl, circle_impl) = shapes_crate();
    push_make(&mut krate, |flag| {
        let choice = Expr::new(
            ExprKind::If {
                condition: Box::new(flag),
                then_branch: Box::new(struct_literal("demo::Square", Vec::new(), 3)),
                else_branch: Some(Box::new(struct_literal("demo::Circle", Vec::new(), 5))),
            },
            erased_shape(),
            location(2),
        );
        block(Vec::new(), Some(choice), 1)
    });
    push_main(&mut krate);

    let report = run_passes(&mut krate, &[ExpansionPass::ErasedType]).expect("lowering should succeed");
    assert_eq!(report.erased_dynamic, 1);
    assert_eq!(function_at(&krate, "demo::make").ret, boxed_shape());

    // One vtable per concrete producer
    assert_eq!(krate.vtables.len(), 2);
    assert_eq!(krate.vtables[0].concrete, square());
    assert_eq!(krate.vtables[0].methods.len(), 1);
    assert_eq!(krate.vtables[0].methods[0].name, "area");
    assert_eq!(krate.vtables[0].methods[0].source, ImplSource::Impl(square_impl));
    assert_eq!(krate.vtables[1].methods[0].source, ImplSource::Impl(circle_impl));

    let (_, tail) = block_parts(&krate, "demo::make");
    let ExprKind::If {
        then_branch,
        else_branch: Some(else_branch),
        ..
    } = &tail.expect("tail").kind
    else {
        panic!("expected the if to stay the tail");
    };

    for (branch, vtable) in [(then_branch, VTableId(0)), (else_branch, VTableId(1))] {
        let ExprKind::Unsize { value, vtables } = &branch.kind else {
            panic!("branch should be coerced, found {:?}", branch.kind);
        };
        assert_eq!(vtables, &vec![vtable]);
        assert_eq!(branch.ty, boxed_shape());
        assert!(matches!(
            &value.kind,
            ExprKind::CallPath {
                path: CallPath::UfcsInherent { method, .. },
                args,
            } if method == lang_items::BOX_NEW && args.len() == 1
        ));
    }

    // Calls on the erased value dispatch through the trait object
    let (_, tail) = block_parts(&krate, "demo::main");
    let ExprKind::CallPath {
        path: CallPath::UfcsKnown { self_ty, .. },
        args,
    } = &tail.expect("tail").kind
    else {
        panic!("expected a trait call");
    };
    assert_eq!(
        *self_ty,
        HirType::TraitObject {
            traits: vec![shape_trait()],
        }
    );
    let ExprKind::Borrow { value, .. } = &args[0].kind else {
        panic!("receiver should stay borrowed");
    };
    assert!(matches!(
        &value.kind,
        ExprKind::Deref { value, .. } if matches!(value.kind, ExprKind::Local(_))
    ));

    validate_after(&krate, ExpansionPass::ErasedType).expect("no placeholder may survive");
}

#[test]
fn function_that_never_returns_drops_its_placeholder() {
    let (mut krate, ..) = shapes_crate();
    push_make(&mut krate, |_| {
        let forever = Expr::new(
            ExprKind::Loop {
                body: Box::new(block(Vec::new(), None, 2)),
            },
            HirType::Diverge,
            location(2),
        );
        block(Vec::new(), Some(forever), 1)
    });

    let report = run_passes(&mut krate, &[ExpansionPass::ErasedType]).expect("lowering should succeed");
    assert_eq!(report.erased_dropped, 1);
    assert_eq!(function_at(&krate, "demo::make").ret, HirType::Diverge);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].warning_kind, WarningKind::DeadErasedType);
}
