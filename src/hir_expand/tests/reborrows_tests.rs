use super::test_support::{block_parts, demo_crate, let_value, push_function, run_passes};
use crate::hir::hir_builder::{block, bool_ty, borrow, call, i32_ty, int, location};
use crate::hir::hir_datatypes::{BorrowKind, HirType};
use crate::hir::hir_nodes::{Crate, Expr, ExprKind};
use crate::hir_expand::ExpansionPass;

fn unique_i32() -> HirType {
    HirType::borrow(BorrowKind::Unique, i32_ty())
}

/// `fn <path>(_value: <arg>) {}`
fn sink(krate: &mut Crate, path: &str, arg: HirType) {
    push_function(krate, path, move |body| {
        let (_, value) = body.arg("_value", arg, 1);
        (vec![value], block(Vec::new(), None, 1))
    });
}

fn reborrows(krate: &mut Crate) -> usize {
    run_passes(krate, &[ExpansionPass::AnnotateUsage, ExpansionPass::Reborrows])
        .expect("reborrow insertion should succeed")
        .reborrows_inserted
}

fn call_arg(statement: &Expr) -> &Expr {
    match &statement.kind {
        ExprKind::CallPath { args, .. } => &args[0],
        other => panic!("expected a call, found {other:?}"),
    }
}

/// `&kind *<local>`
fn is_reborrow(expr: &Expr, kind: BorrowKind) -> bool {
    match &expr.kind {
        ExprKind::Borrow { kind: found, value } => {
            *found == kind
                && matches!(&value.kind, ExprKind::Deref { value, .. } if matches!(value.kind, ExprKind::Local(_)))
        }
        _ => false,
    }
}

#[test]
fn reference_used_again_is_reborrowed() {
    let mut krate = demo_crate();
    sink(&mut krate, "demo::touch", unique_i32());

    push_function(&mut krate, "demo::main", |body| {
        let (r, arg) = body.arg("r", unique_i32(), 1);
        let first = call("demo::touch", vec![body.local(r, 2)], HirType::unit(), 2);
        let second = call("demo::touch", vec![body.local(r, 3)], HirType::unit(), 3);
        (vec![arg], block(vec![first, second], None, 1))
    });

    assert_eq!(reborrows(&mut krate), 1);

    let (statements, _) = block_parts(&krate, "demo::main");
    let first = call_arg(&statements[0]);
    assert!(is_reborrow(first, BorrowKind::Unique), "{first:?}");
    assert_eq!(first.ty, unique_i32());

    // The last use moves the reference as it is
    assert!(matches!(call_arg(&statements[1]).kind, ExprKind::Local(_)));
}

#[test]
fn unique_reference_into_shared_slot_is_weakened() {
    let mut krate = demo_crate();
    sink(&mut krate, "demo::read", HirType::borrow(BorrowKind::Shared, i32_ty()));

    push_function(&mut krate, "demo::main", |body| {
        let (r, arg) = body.arg("r", unique_i32(), 1);
        let read = call("demo::read", vec![body.local(r, 2)], HirType::unit(), 2);
        let (_, let_again) = body.let_binding("_again", false, body.local(r, 3), 3);
        (vec![arg], block(vec![read, let_again], None, 1))
    });

    assert_eq!(reborrows(&mut krate), 1);

    let (statements, _) = block_parts(&krate, "demo::main");
    let read = call_arg(&statements[0]);
    assert!(is_reborrow(read, BorrowKind::Shared), "{read:?}");
    assert_eq!(read.ty, HirType::borrow(BorrowKind::Shared, i32_ty()));
}

#[test]
fn let_of_a_live_reference_is_reborrowed() {
    let mut krate = demo_crate();
    sink(&mut krate, "demo::touch", unique_i32());

    push_function(&mut krate, "demo::main", |body| {
        let (r, arg) = body.arg("r", unique_i32(), 1);
        let (alias, let_alias) = body.let_binding("alias", false, body.local(r, 2), 2);
        let touch_alias = call("demo::touch", vec![body.local(alias, 3)], HirType::unit(), 3);
        let touch_r = call("demo::touch", vec![body.local(r, 4)], HirType::unit(), 4);
        (vec![arg], block(vec![let_alias, touch_alias, touch_r], None, 1))
    });

    assert_eq!(reborrows(&mut krate), 1);

    let (statements, _) = block_parts(&krate, "demo::main");
    assert!(is_reborrow(let_value(statements, 0), BorrowKind::Unique));
    assert!(matches!(call_arg(&statements[1]).kind, ExprKind::Local(_)));
}

#[test]
fn fresh_borrows_are_left_alone() {
    let mut krate = demo_crate();
    sink(&mut krate, "demo::touch", unique_i32());

    push_function(&mut krate, "demo::main", |body| {
        let (x, let_x) = body.let_binding("x", true, int(0, 1), 1);
        let first = call(
            "demo::touch",
            vec![borrow(BorrowKind::Unique, body.local(x, 2), 2)],
            HirType::unit(),
            2,
        );
        let second = call(
            "demo::touch",
            vec![borrow(BorrowKind::Unique, body.local(x, 3), 3)],
            HirType::unit(),
            3,
        );
        (Vec::new(), block(vec![let_x, first, second], None, 1))
    });

    assert_eq!(reborrows(&mut krate), 0);
}

/// Liveness follows evaluation order, so the else branch counts as a later use
/// of a reference passed in the then branch.
#[test]
fn reference_passed_in_both_branches_is_reborrowed_in_the_first() {
    let mut krate = demo_crate();
    sink(&mut krate, "demo::touch", unique_i32());

    push_function(&mut krate, "demo::main", |body| {
        let (r, r_arg) = body.arg("r", unique_i32(), 1);
        let (c, c_arg) = body.arg("c", bool_ty(), 1);
        let choice = Expr::new(
            ExprKind::If {
                condition: Box::new(body.local(c, 2)),
                then_branch: Box::new(call("demo::touch", vec![body.local(r, 3)], HirType::unit(), 3)),
                else_branch: Some(Box::new(call(
                    "demo::touch",
                    vec![body.local(r, 5)],
                    HirType::unit(),
                    5,
                ))),
            },
            HirType::unit(),
            location(2),
        );
        (vec![r_arg, c_arg], block(vec![choice], None, 1))
    });

    assert_eq!(reborrows(&mut krate), 1);

    let (statements, _) = block_parts(&krate, "demo::main");
    let ExprKind::If {
        then_branch,
        else_branch: Some(else_branch),
        ..
    } = &statements[0].kind
    else {
        panic!("expected the if to stay");
    };
    assert!(is_reborrow(call_arg(then_branch), BorrowKind::Unique));
    assert!(matches!(call_arg(else_branch).kind, ExprKind::Local(_)));
}
