//! Fixed-Size Sliding Window for Per-Epoch Records
//!
//! ## Overview
//!
//! A circular (ring) buffer with capacity fixed at compile time through
//! const generics. The SNR detector keeps its sliding window of epoch
//! samples here; the window is the only retained detector state, so its
//! semantics matter:
//!
//! - O(1) insertion, overwriting the oldest record when full
//! - O(1) access to the most recent record
//! - chronological iteration, oldest to newest
//! - zero heap allocations
//!
//! ## Why Not `heapless::Vec`?
//!
//! `heapless::Vec` errors when full; a sliding window must silently discard
//! the oldest record instead, because recent epochs are always worth more
//! than old ones. A dedicated ring keeps that behavior explicit.
//!
//! ## Usage
//!
//! ```rust
//! use navguard_core::buffer::WindowBuffer;
//!
//! let mut window: WindowBuffer<f32, 4> = WindowBuffer::new();
//! for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
//!     window.push(v);
//! }
//! // Oldest record (1.0) was overwritten
//! assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(window.last(), Some(&5.0));
//! ```

/// Fixed-capacity ring buffer that overwrites its oldest entry when full
///
/// ## Type Parameters
///
/// - `T`: record type; `Copy` keeps slots trivially initializable and
///   pushes cheap.
/// - `N`: window capacity, a compile-time constant. Powers of two let the
///   wrap-around modulo compile to a bit mask.
///
/// ## Internal Invariants
///
/// - `write_pos < N`
/// - `len <= N`
/// - logical order is chronological: index 0 is the oldest record
///
/// Not thread-safe; the decision loop is the sole owner (single writer,
/// single reader).
#[derive(Clone)]
pub struct WindowBuffer<T: Copy, const N: usize> {
    /// Storage using Option to avoid unsafe uninitialized slots
    data: [Option<T>; N],
    /// Index of the next write, wraps at N
    write_pos: usize,
    /// Number of valid records, saturates at N
    len: usize,
}

impl<T: Copy, const N: usize> WindowBuffer<T, N> {
    /// Creates an empty window; const, usable in statics
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Appends a record, overwriting the oldest when the window is full
    pub fn push(&mut self, record: T) {
        self.data[self.write_pos] = Some(record);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no records are stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the window has reached capacity
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Window capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Most recent record
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    /// Record by logical index (0 = oldest, len-1 = newest)
    ///
    /// When the window is full the oldest record sits at `write_pos`, so
    /// logical indices are rotated by it:
    ///
    /// ```text
    /// Physical array:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical view:    [A, B, C, D, E]
    /// logical[0] = physical[(2+0)%5] = A
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[actual_index].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> WindowIter<'_, T, N> {
        WindowIter { buffer: self, index: 0 }
    }

    /// Drop all records; capacity is unchanged
    pub fn clear(&mut self) {
        self.data = [None; N];
        self.write_pos = 0;
        self.len = 0;
    }
}

/// Iterator over window contents in chronological order
pub struct WindowIter<'a, T: Copy, const N: usize> {
    buffer: &'a WindowBuffer<T, N>,
    index: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for WindowIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }
}

impl<T: Copy, const N: usize> Default for WindowBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
