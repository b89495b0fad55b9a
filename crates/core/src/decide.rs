//! The upload decision: modification-time comparison only.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Upload,
    Skip,
}

/// Decide whether a local file needs uploading given its modification time
/// and the remote object's, if any. An absent remote object always uploads
/// (its effective timestamp is the epoch). A present one uploads only when
/// the local file is strictly newer; ties and local-older skip, so an
/// unchanged tree re-runs with zero writes. Edits that land within the
/// clock granularity of the filesystem or the store are invisible to this
/// comparison; that is a known limitation of mtime-based reconciliation.
pub fn decide(local: DateTime<Utc>, remote: Option<DateTime<Utc>>) -> Decision {
    match remote {
        None => Decision::Upload,
        Some(remote) if local > remote => Decision::Upload,
        Some(_) => Decision::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn absent_remote_uploads() {
        assert_eq!(decide(at(100), None), Decision::Upload);
    }

    #[test]
    fn strictly_newer_local_uploads() {
        assert_eq!(decide(at(101), Some(at(100))), Decision::Upload);
    }

    #[test]
    fn equal_timestamps_skip() {
        assert_eq!(decide(at(100), Some(at(100))), Decision::Skip);
    }

    #[test]
    fn older_local_skips() {
        assert_eq!(decide(at(99), Some(at(100))), Decision::Skip);
    }

    #[test]
    fn epoch_remote_behaves_like_absent() {
        assert_eq!(
            decide(at(1), Some(DateTime::UNIX_EPOCH)),
            Decision::Upload
        );
    }
}
