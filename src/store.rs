//! Append-only block storage with cheap, consistent snapshots.
//!
//! `ListBuilder` appends into fixed-size blocks under a single writer. A
//! snapshot captures the block list by reference plus the logical length, so
//! a reader holding an older snapshot is unaffected by writer progress beyond
//! that length even though it shares blocks with the writer. Cells are
//! `OnceLock` so the writer can keep filling the tail block a snapshot
//! already references: a cell is written at most once and only read by
//! snapshots whose captured length covers it.

use std::sync::{Arc, OnceLock};

pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

type Block<T> = Arc<[OnceLock<T>]>;

fn new_block<T>(block_size: usize) -> Block<T> {
    (0..block_size).map(|_| OnceLock::new()).collect()
}

/// Single-writer growable sequence. `push` is O(1) amortized; `snapshot` only
/// copies the block list (and caches that copy until a new block is added).
/// Callers must serialize `push`/`snapshot` if used across threads; the
/// snapshots themselves need no locking.
#[derive(Debug)]
pub struct ListBuilder<T> {
    block_size: usize,
    blocks: Vec<Block<T>>,
    blocks_snapshot: Option<Arc<[Block<T>]>>,
    last_block_len: usize,
}

impl<T> ListBuilder<T> {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(block_size: usize) -> Self {
        assert!(block_size > 0);
        ListBuilder {
            block_size,
            blocks: vec![new_block(block_size)],
            blocks_snapshot: None,
            last_block_len: 0,
        }
    }

    pub fn len(&self) -> usize {
        (self.blocks.len() - 1) * self.block_size + self.last_block_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, item: T) {
        if self.last_block_len == self.block_size {
            self.blocks.push(new_block(self.block_size));
            self.blocks_snapshot = None;
            self.last_block_len = 0;
        }

        let last = self.blocks.last().expect("at least one block");
        // Never written twice: last_block_len only moves forward.
        let stored = last[self.last_block_len].set(item);
        debug_assert!(stored.is_ok());
        self.last_block_len += 1;
    }

    pub fn snapshot(&mut self) -> ListSnapshot<T> {
        let blocks = self
            .blocks_snapshot
            .get_or_insert_with(|| self.blocks.iter().cloned().collect())
            .clone();

        ListSnapshot {
            blocks,
            block_size: self.block_size,
            len: self.len(),
        }
    }
}

impl<T> Default for ListBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable, indexable view of a `ListBuilder` at a fixed length.
#[derive(Debug)]
pub struct ListSnapshot<T> {
    blocks: Arc<[Block<T>]>,
    block_size: usize,
    len: usize,
}

impl<T> Clone for ListSnapshot<T> {
    fn clone(&self) -> Self {
        ListSnapshot {
            blocks: self.blocks.clone(),
            block_size: self.block_size,
            len: self.len,
        }
    }
}

impl<T> ListSnapshot<T> {
    pub fn empty() -> Self {
        ListSnapshot {
            blocks: Arc::from([]),
            block_size: DEFAULT_BLOCK_SIZE,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let block = &self.blocks[index / self.block_size];
        block[index % self.block_size].get()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(|i| self.get(i).expect("index below snapshot length"))
    }
}

impl<T> std::ops::Index<usize> for ListSnapshot<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        self.get(index).expect("index below snapshot length")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_index_across_block_boundaries() {
        let mut builder = ListBuilder::with_block_size(4);
        for i in 0..11 {
            builder.push(i);
        }

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.len(), 11);
        for i in 0..11 {
            assert_eq!(snapshot[i], i);
        }
        assert!(snapshot.get(11).is_none());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_appends() {
        let mut builder = ListBuilder::with_block_size(4);
        for i in 0..3 {
            builder.push(i);
        }

        let early = builder.snapshot();
        // Keep appending into the shared tail block and beyond it.
        for i in 3..20 {
            builder.push(i);
        }

        assert_eq!(early.len(), 3);
        assert_eq!(early.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);

        let late = builder.snapshot();
        assert_eq!(late.len(), 20);
        assert_eq!(late[19], 19);
    }

    #[test]
    fn test_snapshot_at_every_length() {
        let mut builder = ListBuilder::with_block_size(3);
        let mut snapshots = vec![builder.snapshot()];
        for i in 0..10 {
            builder.push(i);
            snapshots.push(builder.snapshot());
        }

        for (k, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(snapshot.len(), k);
            assert_eq!(
                snapshot.iter().copied().collect::<Vec<_>>(),
                (0..k).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_iteration_stops_at_partial_tail_block() {
        let mut builder = ListBuilder::with_block_size(8);
        builder.push("a");
        builder.push("b");

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.iter().count(), 2);
    }
}
