//! [`SampleWindow`] – bounded history of recent samples.
//!
//! The window keeps at most `capacity` entries.  Pushing into a full window
//! evicts the oldest entry, so memory stays constant under continuous
//! operation.  Entries are always ordered oldest to newest.
//!
//! # Example
//!
//! ```rust
//! use antiroll_perception::window::SampleWindow;
//!
//! let mut window = SampleWindow::new(3);
//! for v in 1..=5 {
//!     window.push(v);
//! }
//!
//! assert_eq!(window.len(), 3);
//! assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
//! assert_eq!(window.latest(), Some(&5));
//! assert_eq!(window.previous(), Some(&4));
//! ```

use std::collections::VecDeque;
use std::collections::vec_deque;

/// Window capacity used when none is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Fixed-capacity ring buffer in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> SampleWindow<T> {
    /// Create an empty window holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one so the latest sample is always
    /// retained.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `value`, evicting the oldest entry if the window is full.
    pub fn push(&mut self, value: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Entry just before the most recent one.
    pub fn previous(&self) -> Option<&T> {
        self.entries.len().checked_sub(2).and_then(|i| self.entries.get(i))
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for SampleWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
