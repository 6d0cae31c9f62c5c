use crate::hir::hir_nodes::TextLocation;
use saying::say;

#[derive(Clone, Debug)]
pub struct CompilerWarning {
    pub msg: String,
    pub location: TextLocation,
    pub warning_kind: WarningKind,
}

impl CompilerWarning {
    pub fn new(msg: &str, location: TextLocation, warning_kind: WarningKind) -> CompilerWarning {
        CompilerWarning {
            msg: msg.to_owned(),
            location,
            warning_kind,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarningKind {
    UnusedBinding,
    DeadErasedType,
}

pub fn print_formatted_warning(w: CompilerWarning) {
    let file = w.location.scope.to_string_lossy().to_string();
    say!(Yellow "WARNING: ", Dark Magenta file, " line ", w.location.start_pos.line_number + 1);

    match w.warning_kind {
        WarningKind::UnusedBinding => {
            say!("Unused variable '", w.msg, "'");
        }
        WarningKind::DeadErasedType => {
            say!("Erased type is never produced, dropping it: ", w.msg);
        }
    }
}
