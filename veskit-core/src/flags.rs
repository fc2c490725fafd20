use bitflags::bitflags;

bitflags! {
    /// Lifecycle state of a vault item or of one of its share targets.
    ///
    /// Bits are independent, not mutually exclusive; the numeric values are
    /// wire-compatible with the VES API flag constants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u16 {
        /// In sync with the remote store, no pending changes.
        const CLEAN = 0x0001;
        /// The item is private to its owner.
        const PRIVATE = 0x0002;
        /// Not yet persisted remotely.
        const ADD = 0x0010;
        /// Dirty, needs re-sync on the next commit.
        const UPDATE = 0x0020;
        /// Share metadata along with the encrypted value.
        const META = 0x0100;
        /// Exclude this recipient from the next staging pass.
        const IGNORE = 0x4000;
        /// Tombstoned. Terminal; no transition leaves this state.
        const DELETE = 0x8000;

        /// Canonical freshly-created state.
        const SET = Self::ADD.bits() | Self::CLEAN.bits();
    }
}

impl StateFlags {
    /// Marks the flags dirty: sets [`UPDATE`](Self::UPDATE) and clears
    /// [`CLEAN`](Self::CLEAN). Idempotent.
    pub fn mark_dirty(&mut self) {
        self.insert(Self::UPDATE);
        self.remove(Self::CLEAN);
    }

    /// Marks the flags committed: clears [`ADD`](Self::ADD) and
    /// [`UPDATE`](Self::UPDATE), sets [`CLEAN`](Self::CLEAN).
    pub fn mark_committed(&mut self) {
        self.remove(Self::ADD | Self::UPDATE);
        self.insert(Self::CLEAN);
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        Self::SET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_add_and_clean() {
        let flags = StateFlags::default();
        assert!(flags.contains(StateFlags::ADD));
        assert!(flags.contains(StateFlags::CLEAN));
        assert!(!flags.contains(StateFlags::UPDATE));
    }

    #[test]
    fn mark_dirty_is_idempotent() {
        let mut flags = StateFlags::SET;
        flags.mark_dirty();
        let once = flags;
        flags.mark_dirty();
        assert_eq!(flags, once);
        assert!(flags.contains(StateFlags::UPDATE));
        assert!(!flags.contains(StateFlags::CLEAN));
    }

    #[test]
    fn commit_clears_pending_bits() {
        let mut flags = StateFlags::SET;
        flags.mark_dirty();
        flags.mark_committed();
        assert_eq!(flags, StateFlags::CLEAN);
    }

    #[test]
    fn wire_compatible_bit_values() {
        assert_eq!(StateFlags::CLEAN.bits(), 0x01);
        assert_eq!(StateFlags::ADD.bits(), 0x10);
        assert_eq!(StateFlags::UPDATE.bits(), 0x20);
        assert_eq!(StateFlags::IGNORE.bits(), 0x4000);
        assert_eq!(StateFlags::DELETE.bits(), 0x8000);
        assert_eq!(StateFlags::SET.bits(), 0x11);
    }
}
