use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::flags::StateFlags;
use crate::object::VaultKey;

/// Operation to apply to one recipient's grant on a vault item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShareOp {
    /// Grant access to a recipient not currently on the item.
    Add,
    /// Re-issue the recipient's envelope (dirty or forced).
    Update,
    /// Revoke the recipient's grant.
    Delete,
}

/// One staged recipient-scoped operation, produced by [`reconcile`] and
/// consumed by the wire codec. Transport-only: cleared on commit, never
/// expected to survive a codec round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareEntry {
    /// Stable id of the recipient vault key.
    pub vault_key_id: u64,
    /// The operation to apply.
    pub op: ShareOp,
    /// Staging flags; [`StateFlags::META`] marks the entry to also carry
    /// shared metadata on the wire.
    pub flags: StateFlags,
}

/// A recipient the item is currently (or about to be) shared with.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareTarget {
    /// The recipient principal.
    pub key: VaultKey,
    /// Per-recipient lifecycle flags.
    pub flags: StateFlags,
}

impl ShareTarget {
    /// Wraps a vault key with empty per-recipient flags.
    #[must_use]
    pub const fn new(key: VaultKey) -> Self {
        Self {
            key,
            flags: StateFlags::empty(),
        }
    }

    /// Wraps a vault key with explicit per-recipient flags.
    #[must_use]
    pub const fn with_flags(key: VaultKey, flags: StateFlags) -> Self {
        Self { key, flags }
    }
}

/// Computes the minimal create/update/delete instruction set that turns the
/// current share state into the desired recipient set.
///
/// Identity is the recipient's stable key id, never positional; duplicate
/// recipients in `desired` collapse to a single operation, last-flags-wins.
/// Recipients flagged [`StateFlags::IGNORE`] (either per-recipient or on the
/// current target) are fully suppressed from the emitted set. The function
/// is pure with respect to remote state and deterministic: re-invoking with
/// the same inputs re-derives the same delta.
///
/// `flags` applies item-wide: [`StateFlags::UPDATE`] forces re-issue of
/// unchanged recipients, [`StateFlags::META`] marks emitted entries to carry
/// shared metadata.
#[must_use]
pub fn reconcile(
    current: &[ShareTarget],
    desired: &[ShareTarget],
    flags: StateFlags,
) -> Vec<ShareEntry> {
    // Collapse duplicates: first occurrence keeps its position, flags are
    // replaced by the last occurrence.
    let mut wanted: Vec<(u64, StateFlags)> = Vec::with_capacity(desired.len());
    for target in desired {
        match wanted.iter_mut().find(|(id, _)| *id == target.key.id) {
            Some((_, existing)) => *existing = target.flags,
            None => wanted.push((target.key.id, target.flags)),
        }
    }

    let force_update = flags.contains(StateFlags::UPDATE);
    let meta = flags & StateFlags::META;
    let mut entries = Vec::new();

    for &(id, dflags) in &wanted {
        if dflags.contains(StateFlags::IGNORE) {
            continue;
        }
        let existing = current.iter().find(|t| t.key.id == id);
        match existing {
            None => entries.push(ShareEntry {
                vault_key_id: id,
                op: ShareOp::Add,
                flags: dflags | meta,
            }),
            Some(target) if target.flags.contains(StateFlags::IGNORE) => {}
            // A target staged earlier but never committed is still an add.
            Some(target) if target.flags.contains(StateFlags::ADD) => {
                entries.push(ShareEntry {
                    vault_key_id: id,
                    op: ShareOp::Add,
                    flags: dflags | meta,
                });
            }
            Some(target) => {
                let dirty = force_update
                    || dflags.contains(StateFlags::UPDATE)
                    || target.flags.contains(StateFlags::UPDATE);
                if dirty {
                    entries.push(ShareEntry {
                        vault_key_id: id,
                        op: ShareOp::Update,
                        flags: dflags | meta,
                    });
                }
            }
        }
    }

    for target in current {
        if target.flags.contains(StateFlags::IGNORE) {
            continue;
        }
        if !wanted.iter().any(|(id, _)| *id == target.key.id) {
            entries.push(ShareEntry {
                vault_key_id: target.key.id,
                op: ShareOp::Delete,
                flags: target.flags & StateFlags::META,
            });
        }
    }

    entries
}
