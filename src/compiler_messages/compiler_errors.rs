use crate::compiler_messages::compiler_warnings::CompilerWarning;
use crate::hir::hir_nodes::TextLocation;
use std::collections::HashMap;
use std::path::Path;

// The final set of errors and warnings emitted from the expansion stage
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<CompilerWarning>,
}

impl CompilerMessages {
    pub fn from_error(error: CompilerError, warnings: Vec<CompilerWarning>) -> Self {
        CompilerMessages {
            errors: vec![error],
            warnings,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    VariableName,
    CompilationStage,

    // Optional suggestions
    PrimarySuggestion,     // One-line fix or top-level idea
    AlternativeSuggestion, // Secondary alternative

    // Type and dispatch information
    ExpectedType,
    FoundType,
    TraitName,
    MethodName,
    BorrowKind, // "Shared" or "Mutable"
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,
    pub location: TextLocation,
    pub error_type: ErrorType,

    // For more structured and detailed error messages
    pub metadata: HashMap<ErrorMetaDataKey, &'static str>,
}

impl CompilerError {
    pub fn new(
        msg: impl Into<String>,
        location: TextLocation,
        error_type: ErrorType,
    ) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: &'static str) {
        self.metadata.insert(key, value);
    }

    /// Create a new rule error (invalid source the user can fix)
    pub fn new_rule_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Rule)
    }

    /// Create an internal-consistency error (a contract from an earlier stage is broken)
    pub fn new_hir_transformation_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::HirTransformation)
    }

    /// Create a compiler error (internal bug, not user's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, TextLocation::default(), ErrorType::Compiler)
    }

    /// Create a file system error
    pub fn file_error(path: &Path, msg: impl Into<String>) -> Self {
        CompilerError::new(
            msg,
            TextLocation {
                scope: path.to_path_buf(),
                ..TextLocation::default()
            },
            ErrorType::File,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Rule,
    File,
    Config,
    Compiler,
    HirTransformation,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Compiler => "Compiler Bug",
        ErrorType::Config => "Malformed Config",
        ErrorType::File => "File Error",
        ErrorType::Rule => "Language Rule Violation",
        ErrorType::HirTransformation => "HIR Transformation",
    }
}

/// Returns a new CompilerError for source-level constructs that can't be expanded.
///
/// Rule errors are the user's to fix (e.g. a closure that captures itself).
/// Include specific names and helpful suggestions when possible.
///
/// Usage:
/// `return_rule_error!("Closure captures itself", location, { VariableName => "f" })`;
#[macro_export]
macro_rules! return_rule_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::Rule,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_messages::compiler_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::Rule,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for broken internal invariants.
///
/// These are never the user's fault: an upstream stage or an earlier pass
/// failed to deliver something it promised (a type, a dispatch resolution,
/// a consistent usage classification). They are always fatal.
///
/// Usage:
/// `return_hir_transformation_error!("Method call has no resolution", location, { CompilationStage => "UFCS Normalization" })`;
#[macro_export]
macro_rules! return_hir_transformation_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::HirTransformation,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_messages::compiler_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::HirTransformation,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for a malformed config file.
#[macro_export]
macro_rules! return_config_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::Config,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_messages::compiler_errors::ErrorMetaDataKey::$key, $value); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::Config,
            metadata: std::collections::HashMap::new(),
        })
    };
}

/// Returns a new CompilerError for file system failures.
///
/// Usage: `return_file_error!(path, "message")`;
#[macro_export]
macro_rules! return_file_error {
    ($path:expr, $msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {{
        let mut error = $crate::compiler_messages::compiler_errors::CompilerError::file_error($path, $msg);
        $( error.new_metadata_entry($crate::compiler_messages::compiler_errors::ErrorMetaDataKey::$key, $value); )*
        return Err(error);
    }};
    ($path:expr, $msg:expr) => {{
        return Err($crate::compiler_messages::compiler_errors::CompilerError::file_error(
            $path, $msg,
        ));
    }};
}
