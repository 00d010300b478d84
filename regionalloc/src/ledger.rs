//! Region ledger
//!
//! The ledger is the authoritative, offset-ordered list of every region of a block.
//! Nodes live in a slot arena and link to their neighbours by slot index, which keeps
//! neighbour access O(1) for coalescing without any pointer aliasing.
//!
//! ```text
//!   slots:  [ 0: {0..128, used} ][ 1: {256..1024, free} ][ 2: vacant ][ 3: {128..256, used} ]
//!
//!   order:  head -> 0 <-> 3 <-> 1 <- tail
//! ```
//!
//! Every slot carries a generation counter so that handles to a slot can be checked
//! against reuse of that slot.

use alloc::vec::Vec;

use crate::region::{NodeId, RegionInfo};

/// One ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Node {
    pub offset: u64,
    pub size: u64,
    pub alignment: u64,
    pub is_allocated: bool,
    pub prev: Option<u32>,
    pub next: Option<u32>,
}

impl Node {
    #[must_use]
    #[inline]
    pub const fn free(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            alignment: 1,
            is_allocated: false,
            prev: None,
            next: None,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_free(&self) -> bool {
        !self.is_allocated
    }

    #[must_use]
    #[inline]
    #[cfg(any(test, debug_assertions, feature = "validation"))]
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    #[must_use]
    #[inline]
    pub const fn info(&self) -> RegionInfo {
        RegionInfo {
            offset: self.offset,
            size: self.size,
            alignment: self.alignment,
            is_allocated: self.is_allocated,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Doubly linked, offset-ordered list of regions stored in a slot arena
#[derive(Debug)]
pub(crate) struct Ledger {
    slots: Vec<Slot>,
    /// Indices of vacant slots, reused before the arena grows
    vacant: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl Ledger {
    /// Create a ledger holding a single free region `[0, total_size)`.
    #[must_use]
    pub fn new(total_size: u64) -> Self {
        let mut ledger = Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        };
        ledger.reset(total_size);
        ledger
    }

    /// Drop every region and start over with a single free region `[0, total_size)`.
    ///
    /// Slots are kept (and their generation bumped) so that stale handles stay detectable.
    pub fn reset(&mut self, total_size: u64) {
        self.vacant.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.vacant.push(to_index(index));
        }
        self.head = None;
        self.tail = None;
        self.len = 0;

        let index = self.alloc_slot(Node::free(0, total_size));
        self.head = Some(index);
        self.tail = Some(index);
        self.len = 1;
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub const fn head(&self) -> Option<u32> {
        self.head
    }

    #[must_use]
    #[inline]
    #[cfg(any(test, debug_assertions, feature = "validation"))]
    pub const fn tail(&self) -> Option<u32> {
        self.tail
    }

    /// Returns the node stored at `index`.
    ///
    /// ## Panics
    ///
    /// Panics if the slot is vacant. Indices only come from the ledger itself, so this
    /// is an internal consistency failure.
    #[must_use]
    #[inline]
    pub fn get(&self, index: u32) -> &Node {
        self.slots[index as usize]
            .node
            .as_ref()
            .expect("ledger index points to a vacant slot")
    }

    /// Mutable counterpart of [`Ledger::get`].
    #[must_use]
    #[inline]
    pub fn get_mut(&mut self, index: u32) -> &mut Node {
        self.slots[index as usize]
            .node
            .as_mut()
            .expect("ledger index points to a vacant slot")
    }

    /// Invalidate every handle to `index` and return the new one.
    pub fn renew(&mut self, index: u32) -> NodeId {
        let slot = &mut self.slots[index as usize];
        debug_assert!(slot.node.is_some());
        slot.generation = slot.generation.wrapping_add(1);
        NodeId {
            index,
            generation: slot.generation,
        }
    }

    /// Map a handle back to a live slot index.
    ///
    /// Returns `None` if the slot was never issued, is vacant or has been reused since.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> Option<u32> {
        let slot = self.slots.get(id.index as usize)?;
        (slot.node.is_some() && slot.generation == id.generation).then_some(id.index)
    }

    /// Link a new node right before `anchor` and return its index.
    pub fn insert_before(&mut self, anchor: u32, mut node: Node) -> u32 {
        let prev = self.get(anchor).prev;
        node.prev = prev;
        node.next = Some(anchor);

        let index = self.alloc_slot(node);
        self.get_mut(anchor).prev = Some(index);
        match prev {
            Some(prev) => self.get_mut(prev).next = Some(index),
            None => self.head = Some(index),
        }
        self.len += 1;
        index
    }

    /// Link a new node right after `anchor` and return its index.
    pub fn insert_after(&mut self, anchor: u32, mut node: Node) -> u32 {
        let next = self.get(anchor).next;
        node.prev = Some(anchor);
        node.next = next;

        let index = self.alloc_slot(node);
        self.get_mut(anchor).next = Some(index);
        match next {
            Some(next) => self.get_mut(next).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.len += 1;
        index
    }

    /// Unlink the node at `index`, vacate its slot and return the node.
    pub fn remove(&mut self, index: u32) -> Node {
        let node = self.slots[index as usize]
            .node
            .take()
            .expect("removing a vacant ledger slot");

        match node.prev {
            Some(prev) => self.get_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.get_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(index);
        self.len -= 1;
        node
    }

    /// Iterate over `(index, node)` pairs in offset order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            ledger: self,
            current: self.head,
        }
    }

    fn alloc_slot(&mut self, node: Node) -> u32 {
        if let Some(index) = self.vacant.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.node.is_none());
            slot.node = Some(node);
            index
        } else {
            let index = to_index(self.slots.len());
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            index
        }
    }
}

/// Offset-ordered iterator over the ledger
pub(crate) struct Iter<'a> {
    ledger: &'a Ledger,
    current: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (u32, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current?;
        let node = self.ledger.get(index);
        self.current = node.next;
        Some((index, node))
    }
}

#[inline]
fn to_index(index: usize) -> u32 {
    u32::try_from(index).expect("ledger cannot hold more than u32::MAX regions")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(ledger: &Ledger) -> Vec<(u64, u64)> {
        ledger.iter().map(|(_, n)| (n.offset, n.size)).collect()
    }

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new(1024);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.head(), ledger.tail());
        assert_eq!(offsets(&ledger), [(0, 1024)]);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut ledger = Ledger::new(1024);
        let middle = ledger.head().unwrap();
        {
            let node = ledger.get_mut(middle);
            node.offset = 256;
            node.size = 256;
        }
        let before = ledger.insert_before(middle, Node::free(0, 256));
        let after = ledger.insert_after(middle, Node::free(512, 512));

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.head(), Some(before));
        assert_eq!(ledger.tail(), Some(after));
        assert_eq!(offsets(&ledger), [(0, 256), (256, 256), (512, 512)]);

        let removed = ledger.remove(middle);
        assert_eq!(removed.offset, 256);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(before).next, Some(after));
        assert_eq!(ledger.get(after).prev, Some(before));

        ledger.remove(before);
        assert_eq!(ledger.head(), Some(after));
        assert_eq!(ledger.get(after).prev, None);
    }

    #[test]
    fn test_vacant_slots_are_reused() {
        let mut ledger = Ledger::new(1024);
        let head = ledger.head().unwrap();
        let index = ledger.insert_after(head, Node::free(512, 512));
        let stale = ledger.renew(index);
        ledger.remove(index);

        let reused = ledger.insert_after(head, Node::free(512, 512));
        assert_eq!(reused, index);
        assert_eq!(ledger.resolve(stale), None);
        let fresh = ledger.renew(reused);
        assert_ne!(fresh, stale);
        assert_eq!(ledger.resolve(fresh), Some(reused));
    }

    #[test]
    fn test_renew_invalidates_handles() {
        let mut ledger = Ledger::new(64);
        let head = ledger.head().unwrap();
        let old = ledger.renew(head);
        let new = ledger.renew(head);
        assert_eq!(ledger.resolve(old), None);
        assert_eq!(ledger.resolve(new), Some(head));
    }

    #[test]
    fn test_reset_invalidates_everything() {
        let mut ledger = Ledger::new(1024);
        let head = ledger.head().unwrap();
        let after = ledger.insert_after(head, Node::free(512, 512));
        let ids = [ledger.renew(head), ledger.renew(after)];

        ledger.reset(2048);
        assert_eq!(ledger.len(), 1);
        assert_eq!(offsets(&ledger), [(0, 2048)]);
        for id in ids {
            assert_eq!(ledger.resolve(id), None);
        }
    }
}
