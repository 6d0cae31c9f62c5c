//! ============================================================
//!                     HIR Expansion
//! ============================================================
//! Lowers a fully typed crate into the explicit form that
//! monomorphization and codegen consume. Five passes, always in this order:
//!
//!  1. AnnotateUsage  - how every local binding is used
//!  2. Closures       - closure literals become structs + call trait impls
//!  3. Ufcs           - every implicit dispatch becomes an explicit path call
//!  4. Reborrows      - moves of still-live references become reborrows
//!  5. ErasedType     - `impl Trait` placeholders become concrete or boxed types
//!
//! Each pass mutates the crate in place. After the last one there are no
//! closure literals, no implicit dispatch sites, no missing reborrows and
//! no erased type placeholders left.

pub(crate) mod annotate_usage;
pub(crate) mod closures;
pub(crate) mod erased_type;
pub(crate) mod reborrows;
pub(crate) mod ufcs_everything;

#[cfg(test)]
mod tests;

use crate::compiler_messages::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_messages::compiler_warnings::CompilerWarning;
use crate::hir::hir_display::display_crate;
use crate::hir::hir_nodes::Crate;
use crate::hir::hir_validation::{check_upstream, validate_after};
use crate::settings::Config;
use crate::{hir_log, timer_log};
use saying::say;
use std::time::Instant;

/// Flags change the behavior of the expansion pipeline on top of the config file.
/// The CLI maps its switches onto these.
#[derive(PartialEq, Debug, Clone)]
pub enum Flag {
    DisableWarnings,
    DisableTimers,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpansionPass {
    AnnotateUsage,
    Closures,
    Ufcs,
    Reborrows,
    ErasedType,
}

impl ExpansionPass {
    pub const ALL: [ExpansionPass; 5] = [
        ExpansionPass::AnnotateUsage,
        ExpansionPass::Closures,
        ExpansionPass::Ufcs,
        ExpansionPass::Reborrows,
        ExpansionPass::ErasedType,
    ];

    /// Name used in config files and in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ExpansionPass::AnnotateUsage => "annotate_usage",
            ExpansionPass::Closures => "closures",
            ExpansionPass::Ufcs => "ufcs",
            ExpansionPass::Reborrows => "reborrows",
            ExpansionPass::ErasedType => "erased_type",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub parallel: bool,
    pub verify_dispatch: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            parallel: true,
            verify_dispatch: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExpansionReport {
    pub bindings_annotated: usize,
    pub closures_expanded: usize,
    pub dispatch_sites_normalized: usize,
    pub reborrows_inserted: usize,
    pub erased_static: usize,
    pub erased_dynamic: usize,
    pub erased_dropped: usize,
    pub warnings: Vec<CompilerWarning>,
}

pub fn run_pass(
    krate: &mut Crate,
    pass: ExpansionPass,
    options: &PassOptions,
    report: &mut ExpansionReport,
) -> Result<(), CompilerError> {
    match pass {
        ExpansionPass::AnnotateUsage => annotate_usage::run(krate, options, report),
        ExpansionPass::Closures => closures::run(krate, options, report),
        ExpansionPass::Ufcs => ufcs_everything::run(krate, options, report),
        ExpansionPass::Reborrows => reborrows::run(krate, options, report),
        ExpansionPass::ErasedType => erased_type::run(krate, options, report),
    }
}

fn run_single(krate: &mut Crate, pass: ExpansionPass) -> Result<(), CompilerMessages> {
    let mut report = ExpansionReport::default();
    match run_pass(krate, pass, &PassOptions::default(), &mut report) {
        Ok(()) => Ok(()),
        Err(error) => Err(CompilerMessages::from_error(error, report.warnings)),
    }
}

// ============================================================
// Entry points
// ============================================================
// Each expects the passes before it to have run.

pub fn annotate_usage(krate: &mut Crate) -> Result<(), CompilerMessages> {
    run_single(krate, ExpansionPass::AnnotateUsage)
}

pub fn expand_closures(krate: &mut Crate) -> Result<(), CompilerMessages> {
    run_single(krate, ExpansionPass::Closures)
}

pub fn ufcs_everything(krate: &mut Crate) -> Result<(), CompilerMessages> {
    run_single(krate, ExpansionPass::Ufcs)
}

pub fn insert_reborrows(krate: &mut Crate) -> Result<(), CompilerMessages> {
    run_single(krate, ExpansionPass::Reborrows)
}

pub fn lower_erased_types(krate: &mut Crate) -> Result<(), CompilerMessages> {
    run_single(krate, ExpansionPass::ErasedType)
}

// ============================================================
// Pipeline
// ============================================================

/// Runs every pass in order, checking contracts between passes when configured.
/// Warnings are returned in the report either way; printing them is the caller's choice.
pub fn expand_crate(
    krate: &mut Crate,
    config: &Config,
    flags: &[Flag],
) -> Result<ExpansionReport, CompilerMessages> {
    let options = PassOptions {
        parallel: config.pipeline.parallel && !flags.contains(&Flag::Sequential),
        verify_dispatch: config.pipeline.verify_dispatch,
    };
    let show_timers = !flags.contains(&Flag::DisableTimers);

    let mut report = ExpansionReport::default();

    let time = Instant::now();
    if let Err(error) = check_upstream(krate) {
        return Err(CompilerMessages::from_error(error, Vec::new()));
    }
    timer_log!(time, "Upstream contract checked in: ");

    let total = Instant::now();
    for pass in ExpansionPass::ALL {
        let time = Instant::now();

        // ----------------------------
        //          Run pass
        // ----------------------------
        if let Err(error) = run_pass(krate, pass, &options, &mut report) {
            return Err(CompilerMessages::from_error(error, report.warnings));
        }

        if show_timers {
            say!(pass.name(), " in: ", Green #time.elapsed());
        }

        // ----------------------------
        //       Check contracts
        // ----------------------------
        if config.pipeline.validate_between_passes {
            let time = Instant::now();
            if let Err(error) = validate_after(krate, pass) {
                return Err(CompilerMessages::from_error(error, report.warnings));
            }
            timer_log!(time, "Contracts validated in: ");
        }

        if config.dumps_after(pass) {
            say!(Blue "\nHIR after ", Bright pass.name());
            println!("{}", display_crate(krate));
        }

        hir_log!(Dark "Items after ", pass.name(), ": ", krate.items.len());
    }

    if show_timers {
        say!("Expanded ", Bright krate.name.to_owned(), " in: ", Green #total.elapsed());
    }

    Ok(report)
}
