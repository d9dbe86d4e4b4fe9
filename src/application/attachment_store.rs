use std::fmt::Display;

use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::domain::attachment::{Attachment, AttachmentSummary, SourceFile};
use crate::domain::errors::FormError;
use crate::domain::ports::SessionStorage;

/// Base name of the mirror slot holding the attachment snapshot.
pub const ATTACHMENTS_SLOT: &str = "supplier_attachments_v1";

/// Staged attachments for one session, mirrored into a session storage slot.
///
/// Every mutation rewrites the whole slot. If the write fails the in-memory
/// change is undone, so the two never diverge.
pub struct AttachmentStore<S> {
    storage: S,
    slot: String,
    entries: Vec<Attachment>,
}

impl<S: SessionStorage> AttachmentStore<S> {
    pub fn empty(storage: S, slot: impl Into<String>) -> Self {
        Self {
            storage,
            slot: slot.into(),
            entries: Vec::new(),
        }
    }

    /// Rebuilds the collection from the mirror. Absent or malformed data
    /// yields an empty store.
    pub fn restore(storage: S, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let entries = match storage.get_item(&slot) {
            Ok(Some(raw)) => parse_snapshot(&raw).unwrap_or_else(|reason| {
                log::warn!("discarding malformed attachment mirror '{}': {}", slot, reason);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("could not read attachment mirror '{}': {}", slot, e);
                Vec::new()
            }
        };
        if !entries.is_empty() {
            log::info!("restored {} attachment(s) from '{}'", entries.len(), slot);
        }
        Self {
            storage,
            slot,
            entries,
        }
    }

    pub fn stage(&mut self, file: SourceFile) -> Result<AttachmentSummary, FormError> {
        let id = self.fresh_id();
        let attachment = Attachment::encode(id, &file);
        let summary = attachment.summary();

        self.entries.push(attachment);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }

        log::info!(
            "staged attachment {} ({}, {} bytes)",
            summary.id,
            summary.name,
            summary.size_bytes
        );
        Ok(summary)
    }

    /// Removes the attachment if present. Returns `Ok(false)` for an unknown
    /// id, in which case nothing is written.
    pub fn remove(&mut self, id: Uuid) -> Result<bool, FormError> {
        let Some(idx) = self.entries.iter().position(|a| a.id == id) else {
            return Ok(false);
        };

        let removed = self.entries.remove(idx);
        if let Err(e) = self.persist() {
            self.entries.insert(idx, removed);
            return Err(e);
        }

        log::info!("removed attachment {} ({})", removed.id, removed.name);
        Ok(true)
    }

    pub fn list(&self) -> Vec<AttachmentSummary> {
        self.entries.iter().map(Attachment::summary).collect()
    }

    pub fn retrieve(&self, id: Uuid) -> Result<Vec<u8>, FormError> {
        self.fetch(id).map(|(_, bytes)| bytes)
    }

    /// Metadata and decoded bytes of one attachment, for downloads.
    pub fn fetch(&self, id: Uuid) -> Result<(AttachmentSummary, Vec<u8>), FormError> {
        let attachment = self
            .find(id)
            .ok_or_else(|| FormError::NotFound(format!("Attachment {id}")))?;
        Ok((attachment.summary(), attachment.decode()?))
    }

    pub fn entries(&self) -> &[Attachment] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the mirror slot. Used when the session ends.
    pub fn discard(self) -> Result<(), FormError> {
        self.storage.remove_item(&self.slot)
    }

    fn find(&self, id: Uuid) -> Option<&Attachment> {
        self.entries.iter().find(|a| a.id == id)
    }

    fn fresh_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if self.find(id).is_none() {
                return id;
            }
        }
    }

    fn persist(&self) -> Result<(), FormError> {
        let snapshot = serde_json::to_string(&self.entries)
            .map_err(|e| FormError::Internal(format!("serialize attachments: {e}")))?;
        self.storage.set_item(&self.slot, &snapshot)
    }
}

fn parse_snapshot(raw: &str) -> Result<Vec<Attachment>, String> {
    let entries: Vec<Attachment> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|other| other.id == entry.id) {
            return Err(format!("duplicate attachment id {}", entry.id));
        }
        let bytes = entry.decode().map_err(|e| e.to_string())?;
        if bytes.len() as u64 != entry.size_bytes {
            return Err(format!(
                "attachment {} claims {} bytes but holds {}",
                entry.id,
                entry.size_bytes,
                bytes.len()
            ));
        }
    }
    Ok(entries)
}

/// Drains an upload stream into memory. A failing chunk is an `Encoding`
/// error. With a limit set, reading stops with a `Storage` error at the first
/// chunk that takes the total past it.
pub async fn read_source<St, B, E>(mut stream: St, limit: Option<usize>) -> Result<Vec<u8>, FormError>
where
    St: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FormError::Encoding(e.to_string()))?;
        let chunk = chunk.as_ref();
        if let Some(limit) = limit {
            if bytes.len() + chunk.len() > limit {
                return Err(FormError::Storage(format!(
                    "upload exceeds the {limit} byte limit"
                )));
            }
        }
        bytes.extend_from_slice(chunk);
    }
    Ok(bytes)
}
