//! Line protocol between the recognition pipeline and the daemon.
//!
//! Input is one JSON object per line on stdin, either a recognized frame
//!
//! ```json
//! {"camera": "lobby", "faces": [{"region": {"top": 10, "right": 90, "bottom": 80, "left": 20}, "label": "Alice"}]}
//! ```
//!
//! a bare sighting `{"identity": "Alice"}` from a pipeline that does its
//! own matching, or an operator command such as `{"command": "clear_cache"}`. Each
//! accepted attendance row is echoed to stdout as one JSON line.

use rollcall_core::{LedgerRow, Recognition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ClearCache,
}

/// Faces recognized in one frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameReport {
    #[serde(default)]
    pub camera: Option<String>,
    pub faces: Vec<Recognition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Input {
    Command { command: Command },
    Sighting {
        identity: String,
        #[serde(default)]
        camera: Option<String>,
    },
    Frame(FrameReport),
}

impl Input {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Stdout record for an accepted attendance row.
#[derive(Debug, Serialize)]
pub struct AcceptedEvent<'a> {
    #[serde(flatten)]
    pub row: &'a LedgerRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<&'a str>,
}
