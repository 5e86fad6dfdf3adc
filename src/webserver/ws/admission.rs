/// Live connection ceiling
///
/// A slot is reserved before the upgrade handshake and released when the
/// session ends, so the ceiling holds even while registrations are still in
/// flight to the hub.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ConnectionSlots {
    in_use: Arc<AtomicUsize>,
    max: usize,
}

/// Held for the lifetime of one admitted connection
#[derive(Debug)]
pub struct SlotGuard {
    in_use: Arc<AtomicUsize>,
}

impl ConnectionSlots {
    pub fn new(max: usize) -> Self {
        Self {
            in_use: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    /// Reserve a slot, or None when the ceiling is reached
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|_| SlotGuard {
                in_use: Arc::clone(&self.in_use),
            })
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_and_release() {
        let slots = ConnectionSlots::new(2);

        let a = slots.try_acquire().unwrap();
        let _b = slots.try_acquire().unwrap();
        assert!(slots.try_acquire().is_none());
        assert_eq!(slots.in_use(), 2);

        drop(a);
        assert_eq!(slots.in_use(), 1);
        assert!(slots.try_acquire().is_some());
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_max() {
        let slots = ConnectionSlots::new(50);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slots = slots.clone();
                std::thread::spawn(move || {
                    (0..20).filter_map(|_| slots.try_acquire()).collect::<Vec<_>>()
                })
            })
            .collect();

        let guards: Vec<SlotGuard> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(guards.len(), 50);
        assert_eq!(slots.in_use(), 50);
    }
}
