//! Single-slot frame store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::{DetectionSummary, PublishedFrame};

/// Most recent published frame.
///
/// The writer swaps an `Arc` under the write guard; readers clone the `Arc`
/// under the read guard. A reader therefore holds a complete frame from a
/// single publish, never a mix of two.
#[derive(Debug, Default)]
pub struct FrameStore {
    slot: RwLock<Option<Arc<PublishedFrame>>>,
    total_published: AtomicU64,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current frame. Returns the new sequence number.
    pub fn publish(
        &self,
        jpeg: Vec<u8>,
        width: u32,
        height: u32,
        detection: Option<DetectionSummary>,
    ) -> u64 {
        let sequence = self.total_published.fetch_add(1, Ordering::AcqRel) + 1;
        let frame = Arc::new(PublishedFrame {
            jpeg,
            sequence,
            width,
            height,
            detection,
        });
        if sequence == 1 {
            debug!("First frame published ({}x{})", width, height);
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        // concurrent writers: never replace a newer frame
        if slot.as_ref().map_or(true, |current| current.sequence < sequence) {
            *slot = Some(frame);
        }
        sequence
    }

    /// Snapshot of the latest frame, `None` before the first publish
    pub fn latest(&self) -> Option<Arc<PublishedFrame>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get total frames published
    pub fn total_published(&self) -> u64 {
        self.total_published.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.latest().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    #[test]
    fn test_empty_store_returns_none() {
        let store = FrameStore::new();
        assert!(store.latest().is_none());
        assert!(store.is_empty());
        assert_eq!(store.total_published(), 0);
    }

    #[test]
    fn test_publish_overwrites() {
        let store = FrameStore::new();
        assert_eq!(store.publish(vec![1, 2, 3], 3, 1, None), 1);
        assert_eq!(store.publish(vec![4, 5], 2, 1, None), 2);

        let latest = store.latest().unwrap();
        assert_eq!(latest.jpeg, vec![4, 5]);
        assert_eq!(latest.sequence, 2);
        assert_eq!(store.total_published(), 2);
    }

    #[test]
    fn test_reader_snapshot_survives_overwrite() {
        let store = FrameStore::new();
        store.publish(vec![7; 4], 4, 1, None);
        let snapshot = store.latest().unwrap();

        store.publish(vec![9; 8], 8, 1, None);
        assert_eq!(snapshot.jpeg, vec![7; 4]);
        assert_eq!(store.latest().unwrap().jpeg, vec![9; 8]);
    }

    #[test]
    fn test_concurrent_reads_never_torn() {
        let store = Arc::new(FrameStore::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut seen = 0u64;
                    while !done.load(Ordering::Acquire) {
                        if let Some(frame) = store.latest() {
                            // every publish fills with one byte value and a length derived from it
                            let value = frame.jpeg[0];
                            assert_eq!(frame.jpeg.len(), 1024 + value as usize);
                            assert!(frame.jpeg.iter().all(|&b| b == value));
                            assert!(frame.sequence >= seen);
                            seen = frame.sequence;
                        }
                    }
                })
            })
            .collect();

        for i in 0..2000u32 {
            let value = (i % 251) as u8;
            store.publish(vec![value; 1024 + value as usize], 0, 0, None);
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.total_published(), 2000);
    }

    proptest! {
        #[test]
        fn latest_is_last_published(payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..20)) {
            let store = FrameStore::new();
            for payload in &payloads {
                store.publish(payload.clone(), 1, 1, None);
            }
            let latest = store.latest().unwrap();
            prop_assert_eq!(&latest.jpeg, payloads.last().unwrap());
            prop_assert_eq!(latest.sequence, payloads.len() as u64);
        }
    }
}
