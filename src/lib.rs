//! # xrefguard
//!
//! A pure Rust library for title-block protection during CAD sheet
//! cleanup.
//!
//! Collapsing a sheet's external references and rasters into a
//! self-contained drawing is destructive by design, except for one
//! reference: the title block carrying the sheet border. xrefguard finds
//! that reference among ambiguous candidates and keeps it alive through a
//! pipeline whose operations (bind, re-attach, detach) keep invalidating
//! and reissuing its identity.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xrefguard::{Document, DetachScope, ProtectionSession};
//! use xrefguard::titleblock;
//!
//! let mut doc = Document::with_base_dir("C:/proj");
//! // ... populate layouts and references ...
//!
//! let mut session = ProtectionSession::new();
//! let report = titleblock::run_pipeline(
//!     &mut doc,
//!     &mut session,
//!     None,
//!     DetachScope::everything(),
//! );
//! for entry in &report {
//!     println!("{}", entry);
//! }
//! ```
//!
//! ## Architecture
//!
//! - `document` - the host-document surface the pipeline consumes
//! - `titleblock` - candidate collection, scoring, resolution, the
//!   protection session, and the bind/detach stages
//! - `report` - per-run audit trail of what each stage did
//!
//! The protection session is the only state shared between stages; it is
//! an owned struct passed by reference, never ambient globals, and its
//! abort flag is sticky until the session resets.

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod document;
pub mod error;
pub mod report;
pub mod titleblock;
pub mod types;

// Re-export commonly used types
pub use error::{GuardError, Result};
pub use types::{Handle, Vector2, Vector3};

pub use document::{
    BlockReference, Document, Entity, Layer, Layout, PathResolver, PdfUnderlay, RasterImage,
    XrefDefinition, XrefKind, XrefStatus,
};

pub use report::{CleanupReport, ReportEntry, ReportKind};

pub use titleblock::{
    BindFailure, BindOutcome, DetachScope, ManualPick, ProtectionFingerprint, ProtectionSession,
    ResolutionKind, ResolutionResult, SelectionOutcome, SelectionProvider, XrefCandidate,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
