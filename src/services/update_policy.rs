use std::str::FromStr;

use crate::models::DocError;

/// How a full-content update is reconciled against the stored version.
///
/// This is the only place that interprets a client's version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Every update is accepted and replaces whatever is stored.
    #[default]
    LastWriteWins,
    /// The client must have seen the stored version, and the write is
    /// compare-and-swapped against it.
    RejectStale,
}

impl UpdatePolicy {
    /// Decide whether an update carrying `client_version` may proceed against
    /// a document at `stored_version`. On success returns the version the store
    /// must still find when writing, if any.
    pub fn admit(self, stored_version: i64, client_version: i64) -> Result<Option<i64>, DocError> {
        match self {
            UpdatePolicy::LastWriteWins => Ok(None),
            UpdatePolicy::RejectStale if client_version == stored_version => Ok(Some(stored_version)),
            UpdatePolicy::RejectStale => Err(DocError::VersionConflict {
                expected: stored_version,
                actual: client_version,
            }),
        }
    }
}

impl FromStr for UpdatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(UpdatePolicy::LastWriteWins),
            "reject-stale" | "strict" => Ok(UpdatePolicy::RejectStale),
            other => Err(format!(
                "Invalid update policy '{}'. Use 'last-write-wins' or 'reject-stale'.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_ignores_client_version() {
        assert_eq!(UpdatePolicy::LastWriteWins.admit(5, 0).unwrap(), None);
        assert_eq!(UpdatePolicy::LastWriteWins.admit(5, 99).unwrap(), None);
    }

    #[test]
    fn reject_stale_requires_matching_version() {
        assert_eq!(UpdatePolicy::RejectStale.admit(3, 3).unwrap(), Some(3));
        let err = UpdatePolicy::RejectStale.admit(3, 2).unwrap_err();
        assert!(matches!(err, DocError::VersionConflict { expected: 3, actual: 2 }));
    }

    #[test]
    fn parses_config_values() {
        assert_eq!("last-write-wins".parse::<UpdatePolicy>().unwrap(), UpdatePolicy::LastWriteWins);
        assert_eq!(" Reject-Stale ".parse::<UpdatePolicy>().unwrap(), UpdatePolicy::RejectStale);
        assert!("merge".parse::<UpdatePolicy>().is_err());
    }
}
