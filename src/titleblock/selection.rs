//! Manual title-block selection.
//!
//! When the resolver cannot pick a confident winner, the host prompts the
//! user for a block reference. The prompt itself belongs to the host; this
//! module owns the validation of what comes back and the bounded retry
//! loop around it.

use tracing::warn;

use crate::document::{Document, Entity};
use crate::error::{GuardError, Result};
use crate::titleblock::resolver::{ResolutionKind, ResolutionResult};
use crate::types::Handle;

/// Maximum number of pick attempts before giving up.
pub const MAX_SELECTION_ATTEMPTS: usize = 3;

/// A validated manual pick.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualPick {
    /// Handle of the external reference definition
    pub definition: Handle,
    /// Block name of the definition
    pub block_name: String,
    /// Source path of the definition
    pub path_name: String,
    /// Layout the picked reference sits on
    pub layout_name: String,
}

/// What the host's prompt returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The user picked an entity.
    Picked(Handle),
    /// The user cancelled the prompt.
    Cancelled,
}

/// The host-side prompt, constrained to block-reference entities.
pub trait SelectionProvider {
    /// Ask the user to pick one block reference.
    fn pick_block_reference(&mut self, doc: &Document) -> SelectionOutcome;
}

/// Validate that a picked entity is a block reference backed by an
/// external or overlay definition.
pub fn validate_pick(doc: &Document, entity: Handle) -> Result<ManualPick> {
    let block_ref = doc
        .entity(entity)
        .and_then(Entity::as_block_reference)
        .ok_or_else(|| {
            GuardError::InvalidSelection(format!("entity {} is not a block reference", entity))
        })?;

    let def = doc.xref_by_handle(block_ref.definition).ok_or_else(|| {
        GuardError::InvalidSelection(format!(
            "entity {} is not backed by an external reference",
            entity
        ))
    })?;

    let layout_name = doc
        .layout_of(entity)
        .ok_or_else(|| {
            GuardError::InvalidSelection(format!("entity {} is not placed on a layout", entity))
        })?
        .to_string();

    Ok(ManualPick {
        definition: def.handle,
        block_name: def.name.clone(),
        path_name: def.effective_path().to_string(),
        layout_name,
    })
}

/// Turn a resolution into a confirmed title block.
///
/// A Resolved outcome wins automatically. Ambiguous (or NotFound with a
/// provider, so the user can override) goes through the provider, retrying
/// invalid picks up to [`MAX_SELECTION_ATTEMPTS`] times. Returns `None`
/// when nothing was confirmed; the cleanup then runs unprotected.
pub fn choose_title_block(
    doc: &Document,
    resolution: &ResolutionResult,
    provider: Option<&mut dyn SelectionProvider>,
) -> Option<ManualPick> {
    if resolution.kind == ResolutionKind::Resolved {
        let winner = resolution.winner.as_ref()?;
        return Some(ManualPick {
            definition: winner.definition,
            block_name: winner.block_name.clone(),
            path_name: winner.path_name.clone(),
            layout_name: winner.layout_name.clone(),
        });
    }

    let provider = provider?;
    for _ in 0..MAX_SELECTION_ATTEMPTS {
        match provider.pick_block_reference(doc) {
            SelectionOutcome::Cancelled => return None,
            SelectionOutcome::Picked(entity) => match validate_pick(doc, entity) {
                Ok(pick) => return Some(pick),
                Err(err) => {
                    warn!(error = %err, "invalid manual selection, retrying");
                }
            },
        }
    }
    None
}
