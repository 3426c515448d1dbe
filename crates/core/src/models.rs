use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identity. Monotonically assigned, so ascending id is a stable scan order.
pub type AssetId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: AssetId,
    pub title: String,
    pub filename: String,
    pub mime: String,
    pub alt_text: Option<String>,
}

impl MediaAsset {
    pub fn has_alt(&self) -> bool {
        alt_is_present(self.alt_text.as_deref())
    }
}

/// Whitespace-only alt text counts as missing.
pub fn alt_is_present(alt: Option<&str>) -> bool {
    alt.map(|a| !a.trim().is_empty()).unwrap_or(false)
}

/// Asset as handed to the catalog on import; the catalog assigns the id.
#[derive(Debug, Clone, Default)]
pub struct NewAsset {
    pub path: Option<String>,
    pub filename: String,
    pub title: String,
    pub mime: String,
    pub size: i64,
    pub mtime: i64,
}

/// Identifies one logical full-catalog run. Minted by the first batch call
/// and round-tripped by the caller inside the cursor.
pub type RunId = i64;

/// Who wrote an asset's current alt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltSource {
    Generated,
    Manual,
}

impl AltSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AltSource::Generated => "generated",
            AltSource::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltStatus {
    Present,
    Missing,
}

impl AltStatus {
    pub fn from_alt(alt: Option<&str>) -> Self {
        if alt_is_present(alt) {
            AltStatus::Present
        } else {
            AltStatus::Missing
        }
    }
}

impl fmt::Display for AltStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AltStatus::Present => "Present",
            AltStatus::Missing => "Missing",
        })
    }
}

/// Caller-owned resume point of a multi-call scan.
///
/// `run` is `None` on the first call; the batch processor mints a run id and
/// hands it back in [`BatchResult::run`]. Assets written under that run stay
/// in the scan window for the rest of the run so later offsets do not shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCursor {
    pub offset: u64,
    #[serde(default)]
    pub run: Option<RunId>,
}

impl BatchCursor {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn at(offset: u64) -> Self {
        Self { offset, run: None }
    }

    pub fn resume(offset: u64, run: RunId) -> Self {
        Self {
            offset,
            run: Some(run),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub processed: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub offset: u64,
    pub next_offset: u64,
    /// True iff the page came back full. A short page means end of catalog.
    pub has_more: bool,
    pub run: RunId,
}

impl BatchResult {
    /// Cursor for the follow-up call, or `None` once the scan is complete.
    pub fn next_cursor(&self) -> Option<BatchCursor> {
        self.has_more
            .then(|| BatchCursor::resume(self.next_offset, self.run))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    pub processed: usize,
    pub skipped: usize,
}

/// Which entry point applied a change; recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTag {
    /// Auto-generation for a single newly added asset.
    Single,
    /// Explicit user selection.
    Bulk,
    /// Cursor-driven catalog scan.
    Scan,
}

impl ContextTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::Single => "single",
            ContextTag::Bulk => "bulk",
            ContextTag::Scan => "scan",
        }
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContextTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(ContextTag::Single),
            "bulk" => Ok(ContextTag::Bulk),
            "scan" => Ok(ContextTag::Scan),
            other => Err(format!("unknown context tag: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_alt_is_missing() {
        assert!(!alt_is_present(None));
        assert!(!alt_is_present(Some("")));
        assert!(!alt_is_present(Some("   ")));
        assert!(alt_is_present(Some("A cat")));
        assert_eq!(AltStatus::from_alt(Some("  ")), AltStatus::Missing);
        assert_eq!(AltStatus::from_alt(Some("A cat")).to_string(), "Present");
        assert_eq!(format!("{:<8}|", AltStatus::Missing), "Missing |");
    }

    #[test]
    fn next_cursor_only_while_more() {
        let mut result = BatchResult {
            offset: 0,
            next_offset: 10,
            fetched: 10,
            has_more: true,
            run: 7,
            ..Default::default()
        };
        assert_eq!(result.next_cursor(), Some(BatchCursor::resume(10, 7)));
        result.has_more = false;
        assert_eq!(result.next_cursor(), None);
    }
}
