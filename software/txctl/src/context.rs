//! Information about the current transmitter session that may be used by
//! the core's appendages.

use std::default::Default;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

/// Session context for the transmitter core.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[non_exhaustive]
pub struct TransmitterCtx {
    /// A name for this session, used as the log file name and so must be
    /// compatible with that use.
    pub session_name: String,

    /// A directory to find file inputs and place outputs.
    pub session_dir: PathBuf,
}

impl Default for TransmitterCtx {
    fn default() -> Self {
        // Use current time with seconds as session name and the working
        // directory as session dir, replacing characters in the name that
        // would be invalid on Windows.
        let session_name = DateTime::<Utc>::from(SystemTime::now())
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            .replace(":", "");
        Self {
            session_name,
            session_dir: std::fs::canonicalize("./").unwrap_or_default(),
        }
    }
}
