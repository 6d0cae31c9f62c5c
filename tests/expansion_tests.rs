use hir_expand::cli::{read_crate, write_crate};
use hir_expand::compiler_messages::compiler_errors::ErrorType;
use hir_expand::hir::hir_builder::{
    BodyBuilder, binop, block, bool_ty, call_value, closure, function, function_item, i32_ty, int,
};
use hir_expand::hir::hir_datatypes::{GenericPath, HirType};
use hir_expand::hir::hir_nodes::{ClosureId, Crate, HirBinOp, ItemKind};
use hir_expand::hir::hir_validation::validate_after;
use hir_expand::hir_expand::{
    ExpansionPass, Flag, annotate_usage, expand_closures, expand_crate, insert_reborrows,
    lower_erased_types, ufcs_everything,
};
use hir_expand::settings::Config;

const QUIET: [Flag; 2] = [Flag::DisableTimers, Flag::Sequential];

/// `fn main() -> bool { let x = 1; let f = |y| x == y; f(2) }`
/// `fn seven() -> impl Sized { 7 }`
fn demo_crate() -> Crate {
    let mut krate = Crate::new("demo");

    let mut body = BodyBuilder::new();
    let (x, let_x) = body.let_binding("x", false, int(1, 1), 1);
    let (y, y_arg) = body.arg("y", i32_ty(), 2);
    let compare = binop(HirBinOp::Eq, body.local(x, 2), body.local(y, 2), None, 2);
    let literal = closure(ClosureId(0), vec![y_arg], compare, false, 2);
    let (f, let_f) = body.let_binding("f", false, literal, 2);
    let call_f = call_value(body.local(f, 3), vec![int(2, 3)], bool_ty(), 3);
    let root = block(vec![let_x, let_f], Some(call_f), 1);
    krate.push_item(function_item(
        "demo::main",
        function(Vec::new(), bool_ty(), body.finish(root)),
        1,
    ));

    let seven = BodyBuilder::new().finish(block(Vec::new(), Some(int(7, 6)), 5));
    let erased = HirType::ErasedType {
        origin: GenericPath::lang("demo::seven", Vec::new()),
        index: 0,
        bounds: Vec::new(),
        resolved: None,
    };
    krate.push_item(function_item("demo::seven", function(Vec::new(), erased, seven), 5));

    krate
}

#[test]
fn full_pipeline_lowers_every_construct() {
    let mut krate = demo_crate();
    let report = expand_crate(&mut krate, &Config::default(), &QUIET)
        .expect("the demo crate should expand");

    assert_eq!(report.closures_expanded, 1);
    assert!(report.dispatch_sites_normalized >= 1, "the closure call goes through Fn::call");
    assert_eq!(report.erased_static, 1);
    assert_eq!(report.erased_dynamic, 0);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    assert!(validate_after(&krate, ExpansionPass::ErasedType).is_ok());

    let seven = krate
        .items
        .iter()
        .find(|item| item.path.to_string() == "demo::seven")
        .expect("seven is kept");
    let ItemKind::Function(seven) = &seven.kind else {
        panic!("seven should stay a function");
    };
    assert_eq!(seven.ret, i32_ty());
}

#[test]
fn entry_points_match_the_pipeline() {
    let mut piecewise = demo_crate();
    annotate_usage(&mut piecewise).expect("annotate");
    expand_closures(&mut piecewise).expect("closures");
    ufcs_everything(&mut piecewise).expect("ufcs");
    insert_reborrows(&mut piecewise).expect("reborrows");
    lower_erased_types(&mut piecewise).expect("erased types");

    let mut pipelined = demo_crate();
    expand_crate(&mut pipelined, &Config::default(), &QUIET).expect("pipeline");

    assert_eq!(piecewise, pipelined);
}

#[test]
fn uninferred_input_is_rejected_before_any_pass() {
    let mut krate = demo_crate();
    if let ItemKind::Function(function) = &mut krate.items[0].kind {
        function.ret = HirType::Infer;
    }
    let untouched = krate.clone();

    let messages = expand_crate(&mut krate, &Config::default(), &QUIET)
        .expect_err("an Infer type breaks the upstream contract");

    assert_eq!(messages.errors.len(), 1);
    assert_eq!(messages.errors[0].error_type, ErrorType::HirTransformation);
    assert_eq!(krate, untouched);
}

#[test]
fn expanded_crate_survives_a_json_round_trip() {
    let mut krate = demo_crate();
    expand_crate(&mut krate, &Config::default(), &QUIET).expect("the demo crate should expand");

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("demo.expanded.json");

    write_crate(&krate, &path).expect("write");
    let restored = read_crate(&path).expect("read");

    assert_eq!(restored, krate);
}
