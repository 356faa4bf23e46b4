//! Cleanup run reporting.
//!
//! Destructive stages never fail silently and never hard-error on a single
//! bad item: what happened to each reference is collected as `ReportEntry`
//! items so the caller can audit a run after the fact.
//!
//! After a bind or detach stage the caller can inspect the returned
//! [`CleanupReport`] to see what was preserved, what was removed, and what
//! was skipped.

use std::fmt;

/// Category of a report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// The item was recognized as protected and left untouched.
    Preserved,
    /// An external reference definition was detached.
    Detached,
    /// A definition was merged into the document by a bind.
    Bound,
    /// A raster image or PDF underlay was erased.
    Erased,
    /// The item was skipped (e.g. a best-effort operation failed on it).
    Skipped,
    /// Non-fatal warning.
    Warning,
    /// The whole stage was vetoed (sticky abort honored).
    Aborted,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserved => write!(f, "Preserved"),
            Self::Detached => write!(f, "Detached"),
            Self::Bound => write!(f, "Bound"),
            Self::Erased => write!(f, "Erased"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Warning => write!(f, "Warning"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// A single entry produced during a cleanup stage.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// The category.
    pub kind: ReportKind,
    /// A human-readable description of what happened.
    pub message: String,
}

impl ReportEntry {
    /// Create a new entry.
    pub fn new(kind: ReportKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Collects entries during one cleanup stage.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    items: Vec<ReportEntry>,
}

impl CleanupReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Record an entry.
    pub fn record(&mut self, kind: ReportKind, message: impl Into<String>) {
        self.items.push(ReportEntry::new(kind, message));
    }

    /// Check if there are any entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> std::slice::Iter<'_, ReportEntry> {
        self.items.iter()
    }

    /// Get all entries of a specific kind.
    pub fn of_kind(&self, kind: ReportKind) -> Vec<&ReportEntry> {
        self.items.iter().filter(|e| e.kind == kind).collect()
    }

    /// Check whether any entry of the given kind exists.
    pub fn has_kind(&self, kind: ReportKind) -> bool {
        self.items.iter().any(|e| e.kind == kind)
    }

    /// Count the entries of a specific kind.
    pub fn count_of(&self, kind: ReportKind) -> usize {
        self.items.iter().filter(|e| e.kind == kind).count()
    }

    /// True when the stage performed no destructive operation.
    pub fn no_destruction(&self) -> bool {
        !self.has_kind(ReportKind::Detached) && !self.has_kind(ReportKind::Erased)
    }

    /// Consume the report into a `Vec`.
    pub fn into_vec(self) -> Vec<ReportEntry> {
        self.items
    }
}

impl<'a> IntoIterator for &'a CleanupReport {
    type Item = &'a ReportEntry;
    type IntoIter = std::slice::Iter<'a, ReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
