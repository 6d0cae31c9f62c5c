use super::test_support::{body_of, demo_crate, push_function, run_passes, struct_item};
use crate::compiler_messages::compiler_errors::ErrorType;
use crate::compiler_messages::compiler_warnings::WarningKind;
use crate::hir::hir_builder::{
    assign, binop, block, bool_ty, borrow, call, call_value, closure, compound_assign, int,
    location, path_ty,
};
use crate::hir::hir_datatypes::{BorrowKind, HirType};
use crate::hir::hir_nodes::{ClosureId, Crate, Expr, ExprKind, HirBinOp, Usage};
use crate::hir_expand::ExpansionPass;

fn with_buffer_type(krate: &mut Crate) -> HirType {
    krate.push_item(struct_item("demo::Buffer", Vec::new()));
    let buffer = path_ty("demo::Buffer", Vec::new());

    let consumed = buffer.to_owned();
    push_function(krate, "demo::consume", move |body| {
        let (_, arg) = body.arg("_buffer", consumed, 1);
        (vec![arg], block(Vec::new(), None, 1))
    });

    buffer
}

#[test]
fn bindings_keep_their_strictest_use() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let (x, let_x) = body.let_binding("x", false, int(1, 1), 1);
        let (y, let_y) = body.let_binding("y", true, int(2, 2), 2);

        let shared = borrow(BorrowKind::Shared, body.local(x, 3), 3);
        let (_, let_r) = body.let_binding("r", false, shared, 3);

        let write_y = assign(body.local(y, 4), int(3, 4), 4);

        let sum = binop(HirBinOp::Add, body.local(x, 5), int(1, 5), None, 5);
        let (_, let_z) = body.let_binding("z", false, sum, 5);
        let (_, let_ignored) = body.let_binding("_ignored", false, int(0, 6), 6);

        let tail = body.local(y, 7);
        (
            Vec::new(),
            block(
                vec![let_x, let_y, let_r, write_y, let_z, let_ignored],
                Some(tail),
                1,
            ),
        )
    });

    let report = run_passes(&mut krate, &[ExpansionPass::AnnotateUsage]).expect("annotation should succeed");
    let locals = &body_of(&krate, "demo::main").locals;

    assert_eq!(locals[0].usage, Usage::Shared, "&x outranks reading x by value");
    assert_eq!(locals[1].usage, Usage::Mutable);
    assert_eq!(locals[2].usage, Usage::Unused);
    assert!(!locals[0].moved, "i32 is Copy");
    assert_eq!(locals[0].last_use, Some(3));
    assert_eq!(locals[1].last_use, Some(4));

    assert_eq!(report.bindings_annotated, 5);
    let unused: Vec<&str> = report
        .warnings
        .iter()
        .map(|warning| warning.msg.as_str())
        .collect();
    assert_eq!(unused, vec!["r", "z"]);
    assert!(
        report
            .warnings
            .iter()
            .all(|warning| warning.warning_kind == WarningKind::UnusedBinding)
    );
}

#[test]
fn use_after_unconditional_move_is_reported() {
    let mut krate = demo_crate();
    let buffer = with_buffer_type(&mut krate);

    push_function(&mut krate, "demo::main", |body| {
        let (b, arg) = body.arg("b", buffer, 1);
        let (_, let_c) = body.let_binding("c", false, body.local(b, 2), 2);
        let again = call("demo::consume", vec![body.local(b, 3)], HirType::unit(), 3);
        (vec![arg], block(vec![let_c, again], None, 1))
    });

    let error = run_passes(&mut krate, &[ExpansionPass::AnnotateUsage])
        .expect_err("second use of a moved buffer must fail");

    assert_eq!(error.error_type, ErrorType::HirTransformation);
    assert!(error.msg.contains("'b' is used after being moved"), "{}", error.msg);
    assert_eq!(error.location.start_pos.line_number, 3);
}

#[test]
fn moves_in_branches_mark_the_binding_without_failing() {
    let mut krate = demo_crate();
    let buffer = with_buffer_type(&mut krate);

    push_function(&mut krate, "demo::main", |body| {
        let (flag, flag_arg) = body.arg("flag", bool_ty(), 1);
        let (b, buffer_arg) = body.arg("b", buffer, 1);

        let branch = Expr::new(
            ExprKind::If {
                condition: Box::new(body.local(flag, 2)),
                then_branch: Box::new(call("demo::consume", vec![body.local(b, 3)], HirType::unit(), 3)),
                else_branch: Some(Box::new(call(
                    "demo::consume",
                    vec![body.local(b, 5)],
                    HirType::unit(),
                    5,
                ))),
            },
            HirType::unit(),
            location(2),
        );

        (vec![flag_arg, buffer_arg], block(vec![branch], None, 1))
    });

    run_passes(&mut krate, &[ExpansionPass::AnnotateUsage]).expect("branch moves are fine");

    let locals = &body_of(&krate, "demo::main").locals;
    assert!(locals[1].moved);
    assert_eq!(locals[1].usage, Usage::ByValue);
}

#[test]
fn uses_inside_a_loop_live_until_the_loop_ends() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let (total, let_total) = body.let_binding("total", true, int(0, 1), 1);
        let (step, let_step) = body.let_binding("step", false, int(1, 2), 2);

        let add = compound_assign(
            HirBinOp::Add,
            body.local(total, 4),
            body.local(step, 4),
            None,
            4,
        );
        let leave = Expr::new(ExprKind::Break(None), HirType::Diverge, location(5));
        let repeat = Expr::new(
            ExprKind::Loop {
                body: Box::new(block(vec![add, leave], None, 3)),
            },
            HirType::unit(),
            location(3),
        );

        (Vec::new(), block(vec![let_total, let_step, repeat], None, 1))
    });

    run_passes(&mut krate, &[ExpansionPass::AnnotateUsage]).expect("annotation should succeed");

    let locals = &body_of(&krate, "demo::main").locals;

    // step is read at seq 1, total written at seq 2, the loop closes at seq 3
    assert_eq!(locals[1].last_use, Some(3));
    assert_eq!(locals[0].last_use, Some(3));
    assert_eq!(locals[0].usage, Usage::Mutable);
}

#[test]
fn closure_captures_and_calls_follow_the_closure_class() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let (count, let_count) = body.let_binding("count", true, int(0, 1), 1);

        let bump_body = compound_assign(HirBinOp::Add, body.local(count, 2), int(1, 2), None, 2);
        let literal = closure(ClosureId(0), Vec::new(), bump_body, false, 2);
        let (bump, let_bump) = body.let_binding("bump", true, literal, 2);

        let call_bump = call_value(body.local(bump, 3), Vec::new(), HirType::unit(), 3);
        let tail = body.local(count, 4);

        (Vec::new(), block(vec![let_count, let_bump, call_bump], Some(tail), 1))
    });

    run_passes(&mut krate, &[ExpansionPass::AnnotateUsage]).expect("annotation should succeed");

    let locals = &body_of(&krate, "demo::main").locals;
    assert_eq!(locals[0].usage, Usage::Mutable, "the closure body writes count");
    assert_eq!(locals[1].usage, Usage::Mutable, "calling an FnMut closure needs &mut");
    assert!(locals[0].last_use > locals[1].last_use);
}
