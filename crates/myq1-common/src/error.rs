// error.rs -- engine error categories

use thiserror::Error;

/// Errors surfaced by the world core.
///
/// Numeric back-off in the sweep tracer and truncated visibility data are
/// recovered locally and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QError {
    /// Map data that cannot be trusted for the rest of this map's lifetime
    /// (bad node indices, bad plane sign bits, malformed lumps).
    #[error("corrupt map data: {0}")]
    AssetCorruption(String),

    /// A bug in the server's own bookkeeping, not bad data.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl QError {
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        QError::AssetCorruption(msg.into())
    }

    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        QError::InvariantViolation(msg.into())
    }
}

pub type QResult<T> = Result<T, QError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_category() {
        let e = QError::corrupt("SV_HullPointContents: bad node number");
        assert_eq!(e.to_string(), "corrupt map data: SV_HullPointContents: bad node number");

        let e = QError::invariant("Trigger in clipping list");
        assert_eq!(e.to_string(), "invariant violated: Trigger in clipping list");
    }
}
