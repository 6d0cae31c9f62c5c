mod test_support;

mod annotate_usage_tests;
mod closures_tests;
mod erased_type_tests;
mod reborrows_tests;
