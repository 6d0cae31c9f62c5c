use super::test_support::{
    block_parts, body_of, demo_crate, let_value, push_function, run_passes, struct_item,
};
use crate::compiler_messages::compiler_errors::ErrorType;
use crate::hir::hir_builder::{
    binop, block, bool_ty, borrow, call, call_value, closure, compound_assign, i32_ty, int,
    location, path_ty,
};
use crate::hir::hir_datatypes::{BorrowKind, HirType};
use crate::hir::hir_nodes::{
    CallPath, ClosureId, Crate, DerefStep, Expr, ExprKind, FunctionReceiver, HirBinOp, ImplSource,
    ItemId, ItemKind, NamedFunction, Pattern, TraitImpl,
};
use crate::hir::hir_validation::validate_after;
use crate::hir::lang_items;
use crate::hir_expand::ExpansionPass;

const UP_TO_CLOSURES: [ExpansionPass; 2] = [ExpansionPass::AnnotateUsage, ExpansionPass::Closures];

fn trait_impl_at(krate: &Crate, index: usize) -> &TraitImpl {
    match &krate.items[index].kind {
        ItemKind::TraitImpl(imp) => imp,
        other => panic!("item {index} is not a trait impl: {other:?}"),
    }
}

fn only_method(imp: &TraitImpl) -> &NamedFunction {
    assert_eq!(imp.methods.len(), 1);
    &imp.methods[0]
}

fn env_ty() -> HirType {
    path_ty("demo::main::closure#0", Vec::new())
}

/// `let x = 1; let f = |y: i32| x == y; f(2)`
fn comparing_closure() -> Crate {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let (x, let_x) = body.let_binding("x", false, int(1, 1), 1);
        let (y, y_arg) = body.arg("y", i32_ty(), 2);

        let compare = binop(HirBinOp::Eq, body.local(x, 2), body.local(y, 2), None, 2);
        let literal = closure(ClosureId(0), vec![y_arg], compare, false, 2);
        let (f, let_f) = body.let_binding("f", false, literal, 2);

        let call_f = call_value(body.local(f, 3), vec![int(2, 3)], bool_ty(), 3);
        (Vec::new(), block(vec![let_x, let_f], Some(call_f), 1))
    });
    krate
}

#[test]
fn shared_capture_generates_every_call_trait() {
    let mut krate = comparing_closure();
    let report = run_passes(&mut krate, &UP_TO_CLOSURES).expect("expansion should succeed");

    assert_eq!(report.closures_expanded, 1);
    assert_eq!(krate.items.len(), 5);

    // Environment struct with a shared reference to x
    assert_eq!(krate.items[1].path.to_string(), "demo::main::closure#0");
    let ItemKind::Struct(env) = &krate.items[1].kind else {
        panic!("expected the environment struct");
    };
    assert_eq!(env.fields.len(), 1);
    assert_eq!(env.fields[0].name, "_0");
    assert_eq!(env.fields[0].ty, HirType::borrow(BorrowKind::Shared, i32_ty()));

    let expected = [
        ("Fn", lang_items::FN_TRAIT, "call"),
        ("FnMut", lang_items::FN_MUT_TRAIT, "call_mut"),
        ("FnOnce", lang_items::FN_ONCE_TRAIT, "call_once"),
    ];
    for (offset, (name, trait_name, method)) in expected.iter().enumerate() {
        let index = 2 + offset;
        assert_eq!(
            krate.items[index].path.to_string(),
            format!("demo::main::closure#0::{name}")
        );

        let imp = trait_impl_at(&krate, index);
        assert!(imp.trait_path.path.is(trait_name));
        assert_eq!(imp.trait_path.params, vec![HirType::Tuple(vec![i32_ty()])]);
        assert_eq!(imp.self_ty, env_ty());
        assert_eq!(only_method(imp).name, *method);
    }

    let once = trait_impl_at(&krate, 4);
    assert_eq!(once.types, vec![(String::from("Output"), bool_ty())]);

    // Fn holds the body, reading x through the environment
    let call = &only_method(trait_impl_at(&krate, 2)).function;
    assert_eq!(call.receiver, FunctionReceiver::Borrow);
    let body = call.body.as_ref().expect("call has a body");
    assert_eq!(body.locals[0].name, "self");
    let ExprKind::BinOp { left, .. } = &body.root.kind else {
        panic!("expected the comparison as the body root, found {:?}", body.root.kind);
    };
    let ExprKind::Deref { value: field, .. } = &left.kind else {
        panic!("captured reference should be dereferenced");
    };
    assert!(matches!(&field.kind, ExprKind::Field { field, .. } if field == "_0"));

    // The weaker traits forward to `call`
    let forward = &only_method(trait_impl_at(&krate, 3)).function;
    let root = &forward.body.as_ref().expect("call_mut has a body").root;
    assert!(matches!(&root.kind, ExprKind::CallPath { args, .. } if args.len() == 2));
}

#[test]
fn construction_and_call_site_are_rewritten() {
    let mut krate = comparing_closure();
    run_passes(&mut krate, &UP_TO_CLOSURES).expect("expansion should succeed");

    let (statements, tail) = block_parts(&krate, "demo::main");

    let ExprKind::StructLiteral { path, fields } = &let_value(statements, 1).kind else {
        panic!("closure literal should become a struct literal");
    };
    assert_eq!(path.path.to_string(), "demo::main::closure#0");
    assert_eq!(fields[0].0, "_0");
    assert!(matches!(
        &fields[0].1.kind,
        ExprKind::Borrow { kind: BorrowKind::Shared, value } if matches!(value.kind, ExprKind::Local(_))
    ));

    let tail = tail.expect("call stays the tail");
    let ExprKind::CallMethod {
        method,
        args,
        resolution: Some(resolution),
        ..
    } = &tail.kind
    else {
        panic!("closure call should become a method call, found {:?}", tail.kind);
    };
    assert_eq!(method, "call");
    assert_eq!(resolution.source, ImplSource::Impl(ItemId(2)));
    assert_eq!(resolution.adjust.autoref, Some(BorrowKind::Shared));
    assert!(resolution.adjust.derefs.is_empty());
    assert!(matches!(&args[0].kind, ExprKind::Tuple(packed) if packed.len() == 1));

    // The closure's type is gone from the locals
    let f = &body_of(&krate, "demo::main").locals[2];
    assert_eq!(f.name, "f");
    assert_eq!(f.ty, env_ty());
}

#[test]
fn mutable_capture_skips_fn() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let (count, let_count) = body.let_binding("count", true, int(0, 1), 1);

        let bump_body = compound_assign(
            HirBinOp::Add,
            body.local(count, 2),
            int(1, 2),
            None,
            2,
        );
        let literal = closure(ClosureId(0), Vec::new(), bump_body, false, 2);
        let (bump, let_bump) = body.let_binding("bump", true, literal, 2);

        let call_bump = call_value(body.local(bump, 3), Vec::new(), HirType::unit(), 3);
        let tail = body.local(count, 4);
        (Vec::new(), block(vec![let_count, let_bump, call_bump], Some(tail), 1))
    });

    run_passes(&mut krate, &UP_TO_CLOSURES).expect("expansion should succeed");

    assert_eq!(krate.items.len(), 4);
    let ItemKind::Struct(env) = &krate.items[1].kind else {
        panic!("expected the environment struct");
    };
    assert_eq!(env.fields[0].ty, HirType::borrow(BorrowKind::Unique, i32_ty()));

    assert!(trait_impl_at(&krate, 2).trait_path.path.is(lang_items::FN_MUT_TRAIT));
    assert!(trait_impl_at(&krate, 3).trait_path.path.is(lang_items::FN_ONCE_TRAIT));
    assert_eq!(
        only_method(trait_impl_at(&krate, 2)).function.receiver,
        FunctionReceiver::BorrowMut
    );

    let (statements, _) = block_parts(&krate, "demo::main");
    assert!(matches!(
        &let_value(statements, 1).kind,
        ExprKind::StructLiteral { fields, .. }
            if matches!(fields[0].1.kind, ExprKind::Borrow { kind: BorrowKind::Unique, .. })
    ));

    let ExprKind::CallMethod {
        method,
        resolution: Some(resolution),
        ..
    } = &statements[2].kind
    else {
        panic!("closure call should become a method call");
    };
    assert_eq!(method, "call_mut");
    assert_eq!(resolution.adjust.autoref, Some(BorrowKind::Unique));
    assert_eq!(resolution.source, ImplSource::Impl(ItemId(2)));
}

#[test]
fn consuming_move_closure_only_implements_fn_once() {
    let mut krate = demo_crate();
    krate.push_item(struct_item("demo::Buffer", Vec::new()));
    let buffer = path_ty("demo::Buffer", Vec::new());

    let consumed = buffer.to_owned();
    push_function(&mut krate, "demo::consume", move |body| {
        let (_, arg) = body.arg("_buffer", consumed, 1);
        (vec![arg], block(Vec::new(), None, 1))
    });

    let captured = buffer.to_owned();
    push_function(&mut krate, "demo::main", move |body| {
        let (b, arg) = body.arg("b", captured, 1);
        let consume = call("demo::consume", vec![body.local(b, 2)], HirType::unit(), 2);
        let literal = closure(ClosureId(0), Vec::new(), consume, true, 2);
        let (once, let_once) = body.let_binding("once", false, literal, 2);
        let call_once = call_value(body.local(once, 3), Vec::new(), HirType::unit(), 3);
        (vec![arg], block(vec![let_once, call_once], None, 1))
    });

    run_passes(&mut krate, &UP_TO_CLOSURES).expect("expansion should succeed");

    // Buffer, consume, main, then the environment and a single impl
    assert_eq!(krate.items.len(), 5);
    let ItemKind::Struct(env) = &krate.items[3].kind else {
        panic!("expected the environment struct");
    };
    assert_eq!(env.fields[0].ty, buffer);

    let imp = trait_impl_at(&krate, 4);
    assert!(imp.trait_path.path.is(lang_items::FN_ONCE_TRAIT));
    let call_once = &only_method(imp).function;
    assert_eq!(call_once.receiver, FunctionReceiver::Value);

    // By-value captures read `self._0` directly
    let root = &call_once.body.as_ref().expect("call_once has a body").root;
    let ExprKind::CallPath { args, .. } = &root.kind else {
        panic!("expected the consume call");
    };
    assert!(matches!(&args[0].kind, ExprKind::Field { value, .. } if matches!(value.kind, ExprKind::Local(_))));

    let (statements, _) = block_parts(&krate, "demo::main");
    assert!(matches!(
        &let_value(statements, 0).kind,
        ExprKind::StructLiteral { fields, .. } if matches!(fields[0].1.kind, ExprKind::Local(_))
    ));

    let ExprKind::CallMethod {
        method,
        resolution: Some(resolution),
        ..
    } = &statements[1].kind
    else {
        panic!("closure call should become a method call");
    };
    assert_eq!(method, "call_once");
    assert_eq!(resolution.adjust.autoref, None);
    assert_eq!(resolution.source, ImplSource::Impl(ItemId(4)));
}

#[test]
fn calls_through_references_deref_to_the_environment() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let literal = closure(ClosureId(0), Vec::new(), int(7, 1), false, 1);
        let (f, let_f) = body.let_binding("f", false, literal, 1);

        let by_ref = borrow(BorrowKind::Shared, body.local(f, 2), 2);
        let (g, let_g) = body.let_binding("g", false, by_ref, 2);

        let call_g = call_value(body.local(g, 3), Vec::new(), i32_ty(), 3);
        (Vec::new(), block(vec![let_f, let_g], Some(call_g), 1))
    });

    run_passes(&mut krate, &UP_TO_CLOSURES).expect("expansion should succeed");

    let (_, tail) = block_parts(&krate, "demo::main");
    let Some(Expr {
        kind: ExprKind::CallMethod {
            resolution: Some(resolution),
            ..
        },
        ..
    }) = tail
    else {
        panic!("expected a method call tail");
    };
    assert_eq!(resolution.adjust.derefs, vec![DerefStep::Builtin]);

    let g = &body_of(&krate, "demo::main").locals[1];
    assert_eq!(g.ty, HirType::borrow(BorrowKind::Shared, env_ty()));
}

#[test]
fn closure_capturing_itself_is_rejected() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let closure_ty = HirType::Closure {
            id: ClosureId(0),
            args: Vec::new(),
            ret: Box::new(i32_ty()),
        };
        let f = body.binding("f", closure_ty, false);

        let recurse = call_value(body.local(f, 2), Vec::new(), i32_ty(), 2);
        let literal = closure(ClosureId(0), Vec::new(), recurse, false, 2);
        let let_f = Expr::new(
            ExprKind::Let {
                pattern: Pattern::binding(f, location(2)),
                value: Some(Box::new(literal)),
            },
            HirType::unit(),
            location(2),
        );

        (Vec::new(), block(vec![let_f], None, 1))
    });

    let error = run_passes(&mut krate, &UP_TO_CLOSURES).expect_err("self capture must fail");
    assert_eq!(error.error_type, ErrorType::Rule);
    assert!(error.msg.contains("'f'"), "{}", error.msg);
}

#[test]
fn closure_ids_must_be_unique_across_the_crate() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::a", |body| {
        let (x, let_x) = body.let_binding("x", false, int(1, 1), 1);
        let read = closure(ClosureId(0), Vec::new(), body.local(x, 2), false, 2);
        let (_, let_f) = body.let_binding("_f", false, read, 2);
        (Vec::new(), block(vec![let_x, let_f], None, 1))
    });
    push_function(&mut krate, "demo::b", |body| {
        let (count, let_count) = body.let_binding("count", true, int(0, 1), 1);
        let bump_body = compound_assign(HirBinOp::Add, body.local(count, 2), int(1, 2), None, 2);
        let bump = closure(ClosureId(0), Vec::new(), bump_body, false, 2);
        let (_, let_bump) = body.let_binding("_bump", true, bump, 2);
        (Vec::new(), block(vec![let_count, let_bump], None, 1))
    });

    let error = run_passes(&mut krate, &UP_TO_CLOSURES).expect_err("the second literal reuses closure#0");
    assert_eq!(error.error_type, ErrorType::HirTransformation);
    assert!(error.msg.contains("more than one closure literal"), "{}", error.msg);
}

/// `let mut x = 0; let mut bump = || x += 1; bump(); bump(); x`
#[test]
fn closure_called_twice_mutates_through_its_environment() {
    let mut krate = demo_crate();
    push_function(&mut krate, "demo::main", |body| {
        let (x, let_x) = body.let_binding("x", true, int(0, 1), 1);

        let bump_body = compound_assign(HirBinOp::Add, body.local(x, 2), int(1, 2), None, 2);
        let literal = closure(ClosureId(0), Vec::new(), bump_body, false, 2);
        let (bump, let_bump) = body.let_binding("bump", true, literal, 2);

        let first = call_value(body.local(bump, 3), Vec::new(), HirType::unit(), 3);
        let second = call_value(body.local(bump, 4), Vec::new(), HirType::unit(), 4);
        let tail = body.local(x, 5);

        (Vec::new(), block(vec![let_x, let_bump, first, second], Some(tail), 1))
    });

    let report = run_passes(&mut krate, &ExpansionPass::ALL).expect("expansion should succeed");
    assert_eq!(report.closures_expanded, 1);

    let ItemKind::Struct(env) = &krate.items[1].kind else {
        panic!("expected the environment struct");
    };
    assert_eq!(env.fields.len(), 1);
    assert_eq!(env.fields[0].name, "_0");
    assert_eq!(env.fields[0].ty, HirType::borrow(BorrowKind::Unique, i32_ty()));

    let (statements, tail) = block_parts(&krate, "demo::main");
    for statement in &statements[2..] {
        let ExprKind::CallPath {
            path: CallPath::UfcsKnown {
                self_ty,
                trait_path,
                method,
                ..
            },
            args,
        } = &statement.kind
        else {
            panic!("expected an explicit FnMut call, found {:?}", statement.kind);
        };
        assert_eq!(*self_ty, env_ty());
        assert!(trait_path.path.is(lang_items::FN_MUT_TRAIT));
        assert_eq!(method, "call_mut");
        assert!(matches!(
            args[0].kind,
            ExprKind::Borrow {
                kind: BorrowKind::Unique,
                ..
            }
        ));
    }
    assert!(matches!(tail.expect("x is read at the end").kind, ExprKind::Local(_)));

    validate_after(&krate, ExpansionPass::ErasedType).expect("the expanded crate should be valid");
}
