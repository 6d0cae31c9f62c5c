use crate::compiler_messages::compiler_errors::CompilerError;
use crate::hir::hir_nodes::TextLocation;
use crate::hir_expand::ExpansionPass;
use crate::{return_config_error, return_file_error};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "hir_expand.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run each pass over the crate's functions on rayon's pool
    pub parallel: bool,

    /// Check the post-pass contracts after every pass
    pub validate_between_passes: bool,

    /// Re-resolve every explicit trait call after UFCS normalization
    pub verify_dispatch: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            parallel: true,
            validate_between_passes: true,
            verify_dispatch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pass names (`closures`, `ufcs`, ...) after which the HIR is printed
    pub dump_hir_after: Vec<String>,
    pub warnings: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dump_hir_after: Vec::new(),
            warnings: true,
        }
    }
}

impl Config {
    pub fn dumps_after(&self, pass: ExpansionPass) -> bool {
        self.output
            .dump_hir_after
            .iter()
            .any(|name| name == pass.name())
    }
}

/// A missing file means defaults. Anything unreadable or malformed is an error.
pub fn load_config(path: &Path) -> Result<Config, CompilerError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => return_file_error!(path, format!("Could not read config file: {e}")),
    };

    parse_config(&source, path)
}

pub fn parse_config(source: &str, path: &Path) -> Result<Config, CompilerError> {
    let config: Config = match toml::from_str(source) {
        Ok(config) => config,
        Err(e) => {
            let location = TextLocation {
                scope: path.to_path_buf(),
                ..TextLocation::default()
            };
            return_config_error!(format!("Invalid config: {e}"), location, {
                PrimarySuggestion => "Check the [pipeline] and [output] tables",
            });
        }
    };

    for name in &config.output.dump_hir_after {
        if !ExpansionPass::ALL.iter().any(|pass| pass.name() == name) {
            let location = TextLocation {
                scope: path.to_path_buf(),
                ..TextLocation::default()
            };
            return_config_error!(
                format!("Unknown pass '{name}' in dump_hir_after"),
                location,
                {
                    PrimarySuggestion => "Use annotate_usage, closures, ufcs, reborrows or erased_type",
                }
            );
        }
    }

    Ok(config)
}
