// Extra timer logging
#[macro_export]
#[cfg(feature = "detailed_timers")]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        saying::say!($msg, Green #$time.elapsed());
    };
}

#[macro_export]
#[cfg(not(feature = "detailed_timers"))]
macro_rules! timer_log {
    ($time:expr, $msg:expr) => {
        // Nothing
    };
}

// HIR LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_hir")]
macro_rules! hir_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_hir"))]
macro_rules! hir_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// USAGE ANNOTATION LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_usage")]
macro_rules! usage_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_usage"))]
macro_rules! usage_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// CLOSURE EXPANSION LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_closures")]
macro_rules! closure_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_closures"))]
macro_rules! closure_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// UFCS LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_ufcs")]
macro_rules! ufcs_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_ufcs"))]
macro_rules! ufcs_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// REBORROW LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_reborrows")]
macro_rules! reborrow_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_reborrows"))]
macro_rules! reborrow_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// ERASED TYPE LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_erased")]
macro_rules! erased_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_erased"))]
macro_rules! erased_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
