use serde::{Deserialize, Serialize};

/// Text fields extracted for one incoming command, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// Stable identifier from the source page, when it has one.
    pub row_id: Option<String>,
    pub attacker: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    /// `"H:MM:SS"` or `"MM:SS"`.
    pub countdown: Option<String>,
    /// Digits, unit suffix allowed.
    pub distance: Option<String>,
    /// e.g. `"today at 14:32:10:123"`.
    pub arrival: Option<String>,
}

impl RawRow {
    pub fn with_countdown(
        source: impl Into<String>,
        target: impl Into<String>,
        countdown: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            countdown: Some(countdown.into()),
            ..Default::default()
        }
    }
}

/// Trimmed, non-empty contents of an optional text field.
pub fn non_empty(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
