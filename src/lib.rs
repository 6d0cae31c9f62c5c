pub mod cli;
pub mod settings;

pub mod compiler_messages {
    pub mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod compiler_warnings;
    pub mod display_messages;
}

pub mod hir {
    pub mod hir_builder;
    pub mod hir_datatypes;
    pub mod hir_display;
    pub mod hir_nodes;
    pub mod hir_traits;
    pub mod hir_validation;
    pub mod hir_visitor;
    pub mod lang_items;
}

pub mod hir_expand;
