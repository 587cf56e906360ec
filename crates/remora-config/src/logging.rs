//! Output formats for the host's log records.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// How the host renders log records on stderr.
///
/// Accepted spellings are case-insensitive; the canonical form is snake_case,
/// which is also what `REMORA_LOG_FORMAT` and `--log-format` expect.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per record, event fields flattened.
    #[default]
    Json,
    /// Single-line text, coloured on a terminal.
    Compact,
}

impl LogFormat {
    /// Canonical spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Returns `true` when records are meant for machines.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
