use crate::error::{EntityKind, Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque proof of exclusive ownership, returned by lock and required by
/// unlock so a stale or foreign unlock is rejected instead of silently
/// releasing another holder's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockToken(u64);

/// Reported lock state of one key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockStatus {
    pub exclusive: bool,
    pub shared: bool,
}

#[derive(Debug, Default)]
struct LockSlot {
    holder: Option<u64>,
    /// Independent of the exclusive lock: marks the range safe to keep
    /// serving reads during a non-exclusive migration phase.
    shared: bool,
}

/// Per-key-range lock table. Entries are registered and unregistered by the
/// façade under the key range table's write guard, so a slot exists exactly
/// while its range does. Transitions are checked per slot under its own
/// mutex; contention on one range never blocks another, and lock acquisition
/// fails fast rather than waiting.
#[derive(Debug, Default)]
pub(crate) struct KeyRangeLockTable {
    slots: DashMap<String, Mutex<LockSlot>>,
    next_token: AtomicU64,
}

impl KeyRangeLockTable {
    pub fn register(&self, id: &str) {
        self.slots.entry(id.to_string()).or_default();
    }

    pub fn unregister(&self, id: &str) {
        self.slots.remove(id);
    }

    pub fn lock(&self, id: &str) -> Result<LockToken> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, id))?;
        let mut slot = slot.lock();
        if slot.holder.is_some() {
            return Err(Error::LockConflict { id: id.to_string() });
        }
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        slot.holder = Some(token);
        Ok(LockToken(token))
    }

    pub fn unlock(&self, id: &str, token: LockToken) -> Result<()> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, id))?;
        let mut slot = slot.lock();
        match slot.holder {
            None => Err(Error::NotLocked { id: id.to_string() }),
            Some(holder) if holder != token.0 => Err(Error::LockTokenMismatch {
                id: id.to_string(),
                token: token.0,
            }),
            Some(_) => {
                slot.holder = None;
                Ok(())
            }
        }
    }

    pub fn share(&self, id: &str) -> Result<()> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, id))?;
        slot.lock().shared = true;
        Ok(())
    }

    pub fn status(&self, id: &str) -> Result<LockStatus> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::KeyRange, id))?;
        let slot = slot.lock();
        Ok(LockStatus {
            exclusive: slot.holder.is_some(),
            shared: slot.shared,
        })
    }
}
