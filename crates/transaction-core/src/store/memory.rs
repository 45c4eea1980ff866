//! In-memory message store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{MessageStore, MessageUpdate, StoreError, StoreResult};
use crate::mailbox::{Mailbox, MessageRef};
use crate::pdu::{Pdu, ResponseStatus};

/// A stored message row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub pdu: Option<Pdu>,
    pub mailbox: Mailbox,
    pub as_text: bool,
    pub response_status: Option<ResponseStatus>,
    pub last_modified: DateTime<Utc>,
}

/// DashMap-backed [`MessageStore`]
///
/// Rows are addressed as `content://mms/<id>`. Moves keep the location and only
/// change the mailbox. Cloning shares the underlying rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    rows: Arc<DashMap<MessageRef, StoredMessage>>,
    next_id: Arc<AtomicU64>,
    deletes: Arc<AtomicUsize>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly; `pdu` may be `None` to model a row without PDU data
    pub fn insert(&self, pdu: Option<Pdu>, mailbox: Mailbox) -> MessageRef {
        let location = self.allocate();
        self.rows.insert(
            location.clone(),
            StoredMessage {
                pdu,
                mailbox,
                as_text: false,
                response_status: None,
                last_modified: Utc::now(),
            },
        );
        location
    }

    /// Mailbox a message currently sits in
    pub fn mailbox_of(&self, location: &MessageRef) -> Option<Mailbox> {
        self.rows.get(location).map(|row| row.mailbox)
    }

    /// Number of messages in `mailbox`
    pub fn count_in(&self, mailbox: Mailbox) -> usize {
        self.rows.iter().filter(|row| row.mailbox == mailbox).count()
    }

    /// Snapshot of a stored row
    pub fn stored(&self, location: &MessageRef) -> Option<StoredMessage> {
        self.rows.get(location).map(|row| row.clone())
    }

    /// Locations of every message in `mailbox`
    pub fn locations_in(&self, mailbox: Mailbox) -> Vec<MessageRef> {
        let mut locations: Vec<MessageRef> = self
            .rows
            .iter()
            .filter(|row| row.mailbox == mailbox)
            .map(|row| row.key().clone())
            .collect();
        locations.sort();
        locations
    }

    /// How many successful deletes have happened
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn allocate(&self) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        MessageRef::new(format!("content://mms/{}", id))
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn load(&self, location: &MessageRef) -> StoreResult<Option<Pdu>> {
        self.rows
            .get(location)
            .map(|row| row.pdu.clone())
            .ok_or_else(|| StoreError::NotFound(location.clone()))
    }

    async fn persist(&self, pdu: &Pdu, mailbox: Mailbox, as_text: bool) -> StoreResult<MessageRef> {
        let location = self.allocate();
        self.rows.insert(
            location.clone(),
            StoredMessage {
                pdu: Some(pdu.clone()),
                mailbox,
                as_text,
                response_status: None,
                last_modified: Utc::now(),
            },
        );
        debug!(location = %location, mailbox = %mailbox, kind = pdu.kind_name(), "Persisted message");
        Ok(location)
    }

    async fn move_to(&self, location: &MessageRef, dest: Mailbox) -> StoreResult<MessageRef> {
        let mut row = self
            .rows
            .get_mut(location)
            .ok_or_else(|| StoreError::NotFound(location.clone()))?;

        if !row.mailbox.can_move_to(dest) {
            return Err(StoreError::InvalidTransition {
                from: row.mailbox,
                to: dest,
            });
        }

        debug!(location = %location, from = %row.mailbox, to = %dest, "Moved message");
        row.mailbox = dest;
        row.last_modified = Utc::now();
        Ok(location.clone())
    }

    async fn delete(&self, location: &MessageRef) -> StoreResult<()> {
        match self.rows.remove(location) {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                debug!(location = %location, "Deleted message");
                Ok(())
            }
            None => Err(StoreError::NotFound(location.clone())),
        }
    }

    async fn update(&self, location: &MessageRef, update: &MessageUpdate) -> StoreResult<()> {
        let mut row = self
            .rows
            .get_mut(location)
            .ok_or_else(|| StoreError::NotFound(location.clone()))?;

        if let Some(status) = update.response_status {
            row.response_status = Some(status);
        }
        if let Some(pdu) = row.pdu.as_mut() {
            update.apply_to(pdu);
        }
        row.last_modified = Utc::now();
        Ok(())
    }
}
