//! Fixed-capacity sample history.
//!
//! [`SampleBuffer`] keeps the most recent `N` samples in a ring: the
//! backing vector grows to `N` once, after which every append overwrites
//! the oldest slot and advances the head.  Append, eviction and indexed
//! access are all O(1).
//!
//! ```text
//!   slots:  [ s5 | s6 | s2 | s3 | s4 ]      N = 5, head = 2
//!                     ^ oldest
//!   logical order:  s2 s3 s4 s5 s6
//! ```
//!
//! Range queries hand out [`Window`]s, borrowed read-only views in
//! chronological order.  Callers never take ownership of buffered samples.

use log::info;

use crate::app::ports::SnapshotStore;
use crate::error::PersistenceError;
use crate::sample::Sample;
use crate::snapshot::{ExportOutcome, Snapshot};

/// Ordered, bounded store of samples with strict FIFO eviction.
pub struct SampleBuffer {
    slots: Vec<Sample>,
    /// Physical index of the oldest sample once the ring is full.
    head: usize,
    capacity: usize,
    total_appended: u64,
}

impl SampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    /// (a capacity of zero is raised to one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
            total_appended: 0,
        }
    }

    /// Add a sample at the tail, evicting the oldest one when full.
    pub fn append(&mut self, sample: Sample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
        }
        self.total_appended += 1;
    }

    /// The last `min(count, len)` samples, oldest first.
    ///
    /// A window shorter than `count` means there is not enough history
    /// yet; callers skip their decision for that tick.
    pub fn suffix(&self, count: usize) -> Window<'_> {
        let len = count.min(self.len());
        Window {
            buffer: self,
            start: self.len() - len,
            len,
        }
    }

    /// Drop every sample.  Only called on explicit reset.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    /// Copy the current contents into a snapshot and hand it to `store`.
    ///
    /// Returns [`ExportOutcome::Empty`] without touching the store when
    /// there is nothing to export.  The buffer itself is never modified.
    pub fn export(
        &self,
        store: &mut impl SnapshotStore,
        name: Option<&str>,
    ) -> Result<ExportOutcome, PersistenceError> {
        if self.is_empty() {
            return Ok(ExportOutcome::Empty);
        }
        let snapshot = Snapshot::capture(self.iter())?;
        let count = snapshot.len();
        let id = store.persist(snapshot, name)?;
        info!("Buffer: exported {} samples as {}", count, id);
        Ok(ExportOutcome::Written(id))
    }

    /// All samples, oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Sample> + '_ {
        (0..self.len()).map(move |i| self.at(i))
    }

    /// Most recently appended sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.len().checked_sub(1).map(|i| self.at(i))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples appended since construction, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Logical index (0 = oldest) to sample.
    fn at(&self, logical: usize) -> &Sample {
        &self.slots[(self.head + logical) % self.slots.len()]
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Read-only chronological view over a contiguous tail of the buffer.
#[derive(Clone, Copy)]
pub struct Window<'a> {
    buffer: &'a SampleBuffer,
    start: usize,
    len: usize,
}

impl<'a> Window<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sample at window position `i` (0 = oldest).
    pub fn get(&self, i: usize) -> Option<&'a Sample> {
        (i < self.len).then(|| self.buffer.at(self.start + i))
    }

    pub fn first(&self) -> Option<&'a Sample> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&'a Sample> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a Sample> + 'a {
        let buffer = self.buffer;
        let start = self.start;
        (0..self.len).map(move |i| buffer.at(start + i))
    }

    /// The light `on` flag of every sample, oldest first.
    pub fn light_on_states(&self) -> impl ExactSizeIterator<Item = bool> + 'a {
        self.iter().map(Sample::is_on)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
