use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use log::{error, info};
use thiserror::Error;

use crate::engine::EpubRendition;

/// Load failures, collapsed to one user-visible message each. Neither is
/// fatal: the viewer stays up and another file can be selected right away.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The file could not be read, or the read produced no data.
    #[error("Failed to read file data.")]
    UnreadableFile,
    /// The rendering engine rejected the bytes.
    #[error("Failed to load EPUB file.")]
    UnparsableDocument,
}

/// Identifier for one load attempt. Strictly increasing, so the newest
/// attempt always carries the highest ticket.
pub type LoadTicket = u64;

/// A resolved load attempt, ready for the app to act on.
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub path: PathBuf,
    pub result: Result<EpubRendition, LoadError>,
}

#[derive(Debug)]
struct PendingLoad {
    ticket: LoadTicket,
    path: PathBuf,
}

/// Reads a selected file and constructs a rendition from it.
///
/// `begin` only registers the attempt; the work resolves in `poll` on a
/// later loop tick, so whatever is currently on screen stays there until
/// the new document is ready or fails. Each attempt carries a ticket and
/// the caller is expected to discard completions that are not the latest —
/// that is the whole guard against a slow earlier load clobbering a faster
/// later one.
#[derive(Debug, Default)]
pub struct DocumentLoader {
    next_ticket: LoadTicket,
    latest: Option<LoadTicket>,
    pending: VecDeque<PendingLoad>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a load attempt for `path`.
    pub fn begin(&mut self, path: impl Into<PathBuf>) -> LoadTicket {
        let path = path.into();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.latest = Some(ticket);
        info!("load #{ticket} requested for {}", path.display());
        self.pending.push_back(PendingLoad { ticket, path });
        ticket
    }

    /// A completion is stale when a newer attempt has been registered since.
    pub fn is_stale(&self, ticket: LoadTicket) -> bool {
        self.latest != Some(ticket)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Resolve the oldest in-flight attempt, if any. One attempt per call;
    /// the caller drains until `None`.
    pub fn poll(&mut self) -> Option<LoadCompletion> {
        let PendingLoad { ticket, path } = self.pending.pop_front()?;
        let result = Self::resolve(&path);
        if let Err(err) = &result {
            error!("load #{ticket} of {} failed: {err}", path.display());
        }
        Some(LoadCompletion {
            ticket,
            path,
            result,
        })
    }

    fn resolve(path: &Path) -> Result<EpubRendition, LoadError> {
        let bytes = fs::read(path).map_err(|e| {
            error!("reading {} failed: {e}", path.display());
            LoadError::UnreadableFile
        })?;
        if bytes.is_empty() {
            return Err(LoadError::UnreadableFile);
        }
        EpubRendition::new(bytes).map_err(|e| {
            error!("engine rejected {}: {e}", path.display());
            LoadError::UnparsableDocument
        })
    }
}
