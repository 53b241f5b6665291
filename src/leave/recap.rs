use std::sync::atomic::{AtomicBool, Ordering};

use crate::leave::error::LeaveError;

/// Payroll-recap gate. While locked, approve/reject fail fast before any
/// state mutation. Injected as app data rather than held as a global.
#[derive(Debug, Default)]
pub struct RecapLock {
    locked: AtomicBool,
}

impl RecapLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn ensure_unlocked(&self) -> Result<(), LeaveError> {
        if self.is_locked() {
            Err(LeaveError::RecapLocked)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_blocks_only_while_locked() {
        let lock = RecapLock::new();
        assert!(lock.ensure_unlocked().is_ok());
        lock.set(true);
        assert!(matches!(
            lock.ensure_unlocked(),
            Err(LeaveError::RecapLocked)
        ));
        lock.set(false);
        assert!(lock.ensure_unlocked().is_ok());
    }
}
