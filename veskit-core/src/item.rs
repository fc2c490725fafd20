use serde_json::Value;
use tracing::debug;
use zeroize::Zeroize;

use crate::cipher::StreamCipher;
use crate::error::VesError;
use crate::flags::StateFlags;
use crate::item_type::ItemType;
use crate::object::{LinkedObject, VaultKey, VesFile};
use crate::share::{reconcile, ShareEntry, ShareTarget};
use crate::uri::VesUri;

/// The in-memory representation of one vault item.
///
/// The entity is a cache over the remote authoritative store with a
/// dirty/pending overlay: mutations happen purely in memory, staged share
/// operations live in `share_entries`, and nothing reaches the network
/// until [`VesSession::post_item`](crate::session::VesSession::post_item).
///
/// Not designed for concurrent mutation; callers sharing one instance across
/// writers must supply their own mutual exclusion.
#[derive(Debug, Default)]
pub struct VaultItem {
    pub(crate) id: u64,
    pub(crate) item_type: ItemType,
    pub(crate) object: LinkedObject,
    pub(crate) value: Vec<u8>,
    pub(crate) meta: Option<Value>,
    pub(crate) flags: StateFlags,
    pub(crate) share_targets: Vec<ShareTarget>,
    pub(crate) share_entries: Vec<ShareEntry>,
    pub(crate) cipher: Option<Box<dyn StreamCipher>>,
}

impl VaultItem {
    /// Creates a new, empty, uncommitted item in the canonical
    /// freshly-created state (`ADD|CLEAN`).
    #[must_use]
    pub fn new() -> Self {
        let mut item = Self::default();
        item.flags = StateFlags::SET;
        item
    }

    /// Creates an uncommitted item bound to an identifier, without fetching.
    #[must_use]
    pub fn from_uri_stub(uri: &VesUri) -> Self {
        let mut item = Self::new();
        match uri {
            VesUri::External {
                domain,
                external_id,
            } => {
                item.object = LinkedObject::File(VesFile {
                    external: Some(crate::object::ExternalRef {
                        domain: domain.clone(),
                        external_id: external_id.clone(),
                    }),
                    ..VesFile::default()
                });
            }
            VesUri::Internal { id } => item.id = *id,
        }
        item
    }

    fn guard(&self, operation: &'static str) -> Result<(), VesError> {
        if self.flags.contains(StateFlags::DELETE) {
            return Err(VesError::InvalidState { operation });
        }
        Ok(())
    }

    /// Server-assigned id; 0 for an item that has never been committed.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Semantic type of the raw value.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// True while the item has never been committed.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.flags.contains(StateFlags::ADD)
    }

    /// True once the item has been tombstoned. Terminal.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.flags.contains(StateFlags::DELETE)
    }

    /// Current lifecycle flags.
    #[must_use]
    pub const fn flags(&self) -> StateFlags {
        self.flags
    }

    /// The raw value payload.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Replaces the raw value and type wholesale. The previous buffer is
    /// zeroized before release.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item.
    pub fn set_value(
        &mut self,
        value: impl Into<Vec<u8>>,
        item_type: ItemType,
    ) -> Result<(), VesError> {
        self.guard("set_value")?;
        self.value.zeroize();
        self.value = value.into();
        self.item_type = item_type;
        self.flags.mark_dirty();
        Ok(())
    }

    /// Arbitrary structured metadata, round-tripped verbatim.
    #[must_use]
    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    /// Replaces the metadata.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item.
    pub fn set_meta(&mut self, meta: Option<Value>) -> Result<(), VesError> {
        self.guard("set_meta")?;
        self.meta = meta;
        self.flags.mark_dirty();
        Ok(())
    }

    /// The bound stream cipher, if any.
    #[must_use]
    pub fn cipher(&self) -> Option<&dyn StreamCipher> {
        self.cipher.as_deref()
    }

    /// Attaches a stream cipher, replacing any prior binding; `None`
    /// detaches and reverts the item to raw-value semantics.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item.
    pub fn set_cipher(&mut self, cipher: Option<Box<dyn StreamCipher>>) -> Result<(), VesError> {
        self.guard("set_cipher")?;
        self.cipher = cipher;
        self.flags.mark_dirty();
        Ok(())
    }

    /// Reads the value as a JSON object, decrypting through the bound
    /// cipher first when one is attached.
    ///
    /// # Errors
    /// Propagates [`VesError::CipherMismatch`] from the cipher, or returns a
    /// decode error when the (plaintext) value is not valid JSON.
    pub fn get_object(&self) -> Result<Value, VesError> {
        let plaintext = match &self.cipher {
            Some(cipher) => cipher.decrypt(&self.value)?,
            None => self.value.clone(),
        };
        serde_json::from_slice(&plaintext)
            .map_err(|e| VesError::decode("value", format!("value is not valid JSON: {e}")))
    }

    /// Stores a JSON object as the value, encrypting through the bound
    /// cipher when one is attached.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item; propagates
    /// cipher failures.
    pub fn set_object(&mut self, object: &Value) -> Result<(), VesError> {
        self.guard("set_object")?;
        let mut plaintext = serde_json::to_vec(object)?;
        let stored = match &self.cipher {
            Some(cipher) => {
                let ciphertext = cipher.encrypt(&plaintext)?;
                plaintext.zeroize();
                ciphertext
            }
            None => plaintext,
        };
        self.value.zeroize();
        self.value = stored;
        self.flags.mark_dirty();
        Ok(())
    }

    /// Replaces the polymorphic linked object.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item.
    pub fn set_linked_object(&mut self, object: LinkedObject) -> Result<(), VesError> {
        self.guard("set_linked_object")?;
        self.object = object;
        self.flags.mark_dirty();
        Ok(())
    }

    /// The embedded file entity, when the item wraps one.
    #[must_use]
    pub fn file(&self) -> Option<&VesFile> {
        self.object.as_file()
    }

    /// The embedded vault key entity, when the item wraps one.
    #[must_use]
    pub fn vault_key(&self) -> Option<&VaultKey> {
        self.object.as_vault_key()
    }

    /// The recipients this item is currently (or about to be) shared with.
    #[must_use]
    pub fn share_targets(&self) -> &[ShareTarget] {
        &self.share_targets
    }

    /// The staged share delta, pending commit.
    #[must_use]
    pub fn share_entries(&self) -> &[ShareEntry] {
        &self.share_entries
    }

    /// Unconditionally marks the item dirty, forcing re-submission on the
    /// next commit even without a detected change. Idempotent.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item.
    pub fn force(&mut self) -> Result<(), VesError> {
        self.guard("force")?;
        self.flags.insert(StateFlags::UPDATE);
        Ok(())
    }

    /// Stages the share delta that turns the current share state into
    /// `desired`, replacing any previously staged delta.
    ///
    /// Purely local: no network call happens until
    /// [`post_item`](crate::session::VesSession::post_item). Re-invoking
    /// with the same desired set and flags re-derives the same delta.
    ///
    /// # Errors
    /// Returns [`VesError::InvalidState`] on a deleted item.
    pub fn stage_entries(
        &mut self,
        desired: &[ShareTarget],
        flags: StateFlags,
    ) -> Result<&[ShareEntry], VesError> {
        self.guard("stage_entries")?;
        let staging = flags | (self.flags & StateFlags::UPDATE);
        self.share_entries = reconcile(&self.share_targets, desired, staging);

        // Re-derive the target list: desired membership (adds flagged ADD
        // until commit), plus staged deletions retained with DELETE set.
        let mut next: Vec<ShareTarget> = Vec::with_capacity(desired.len());
        for target in desired {
            if let Some(slot) = next.iter_mut().find(|t| t.key.id == target.key.id) {
                // Last-flags-wins, but lifecycle bookkeeping is preserved.
                let kept = slot.flags & (StateFlags::ADD | StateFlags::UPDATE);
                slot.flags = (target.flags & !StateFlags::DELETE) | kept;
                continue;
            }
            let existing = self.share_targets.iter().find(|t| t.key.id == target.key.id);
            let mut tflags = target.flags & !StateFlags::DELETE;
            match existing {
                Some(t) if !t.flags.contains(StateFlags::ADD) => {
                    // Keep the dirty marker until commit so re-staging
                    // derives the same delta.
                    tflags |= t.flags & StateFlags::UPDATE;
                }
                _ => tflags.insert(StateFlags::ADD),
            }
            next.push(ShareTarget::with_flags(target.key.clone(), tflags));
        }
        for target in &self.share_targets {
            if next.iter().any(|t| t.key.id == target.key.id) {
                continue;
            }
            let mut dropped = target.clone();
            if !dropped.flags.contains(StateFlags::IGNORE) {
                dropped.flags.insert(StateFlags::DELETE);
            }
            next.push(dropped);
        }
        self.share_targets = next;

        if !self.share_entries.is_empty() {
            self.flags.mark_dirty();
        }
        debug!(
            staged = self.share_entries.len(),
            item_id = self.id,
            "staged share delta"
        );
        Ok(&self.share_entries)
    }

    /// Marks the entity committed: adopts the server-assigned id, clears
    /// the pending overlay and per-recipient bookkeeping.
    pub(crate) fn mark_committed(&mut self, id: u64) {
        if id != 0 {
            self.id = id;
        }
        self.flags.mark_committed();
        self.share_entries.clear();
        self.share_targets.retain(|t| !t.flags.contains(StateFlags::DELETE));
        for target in &mut self.share_targets {
            target.flags.remove(StateFlags::ADD | StateFlags::UPDATE);
            target.flags.insert(StateFlags::CLEAN);
        }
    }

    /// External `ves://domain/externalId` address, when the item carries a
    /// cross-vault reference.
    #[must_use]
    pub fn to_uri(&self) -> Option<VesUri> {
        let external = match &self.object {
            LinkedObject::File(file) => file.external.as_ref(),
            LinkedObject::VaultKey(key) => key.external.as_ref(),
            _ => None,
        }?;
        Some(VesUri::external(
            external.domain.clone(),
            external.external_id.clone(),
        ))
    }

    /// Internal `ves:///internalId` address; `None` until committed.
    #[must_use]
    pub fn to_uri_internal(&self) -> Option<VesUri> {
        (self.id != 0).then(|| VesUri::internal(self.id))
    }

    /// Serializes the entity into its canonical wire record.
    #[must_use]
    pub fn to_record(&self) -> Value {
        crate::codec::encode(self)
    }

    /// Decodes an entity from a wire record.
    ///
    /// # Errors
    /// Returns [`VesError::Decode`] naming the offending field when the
    /// record is missing required fields or carries an unresolvable
    /// embedded reference.
    pub fn from_record(record: &Value) -> Result<Self, VesError> {
        crate::codec::decode(record)
    }
}

impl Drop for VaultItem {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}
