// common.rs -- console printing and error escalation used by client and server

use crate::cvar::cvar_variable_value;
use crate::error::QError;

pub const ERR_FATAL: i32 = 0; // exit the entire game with a popup window
pub const ERR_DROP: i32 = 1; // print to console and disconnect from game

pub(crate) const LOG_TARGET: &str = "myq1";

// ============================================================
// Com_Printf / Com_DPrintf / Com_Error
// ============================================================

/// General-purpose print function.
pub fn com_printf(msg: &str) {
    log::info!(target: LOG_TARGET, "{}", msg.trim_end_matches('\n'));
}

/// Developer-only print. Only prints when developer mode is active.
/// Controlled by the "developer" cvar.
pub fn com_dprintf(msg: &str) {
    if cvar_variable_value("developer") == 0.0 {
        return;
    }
    log::debug!(target: LOG_TARGET, "{}", msg.trim_end_matches('\n'));
}

/// Engine error handler.
/// - `ERR_FATAL`: logs and panics.
/// - `ERR_DROP`: logs the error; the caller abandons the current map or frame.
pub fn com_error(code: i32, msg: &str) {
    if code == ERR_FATAL {
        log::error!(target: LOG_TARGET, "Error: {}", msg);
        panic!("Fatal error: {}", msg);
    } else {
        log::error!(target: LOG_TARGET, "********************\nERROR: {}\n********************", msg);
    }
}

/// Reports a corrupt-asset or invariant error and hands it back for
/// propagation. With the "hardfail" cvar set the error is fatal instead.
pub fn fatal(err: QError) -> QError {
    escalate(err, cvar_variable_value("hardfail") != 0.0)
}

fn escalate(err: QError, hardfail: bool) -> QError {
    let msg = err.to_string();
    if hardfail {
        com_error(ERR_FATAL, &msg);
    } else {
        com_error(ERR_DROP, &msg);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalate_soft_returns_error() {
        let err = escalate(QError::corrupt("bad node"), false);
        assert_eq!(err, QError::corrupt("bad node"));
    }

    #[test]
    #[should_panic(expected = "Fatal error: invariant violated: Trigger in clipping list")]
    fn escalate_hard_panics() {
        escalate(QError::invariant("Trigger in clipping list"), true);
    }

    #[test]
    fn prints_do_not_panic_without_logger() {
        com_printf("hello\n");
        com_dprintf("developer only\n");
        com_error(ERR_DROP, "dropped");
    }

    #[test]
    fn hardfail_cvar_makes_fatal_panic() {
        use crate::cvar::{cvar_init, cvar_set_value};

        cvar_init();
        cvar_set_value("hardfail", 1.0);
        let result = std::panic::catch_unwind(|| fatal(QError::corrupt("bad node")));
        cvar_set_value("hardfail", 0.0);
        assert!(result.is_err());

        let err = fatal(QError::corrupt("bad node"));
        assert!(matches!(err, QError::AssetCorruption(_)));
    }

    #[test]
    fn prints_through_installed_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
        com_printf("map loaded\n");
        com_error(ERR_DROP, "bad leaf");
        let err = escalate(QError::corrupt("bad leaf"), false);
        assert!(matches!(err, QError::AssetCorruption(_)));
    }
}
