//! Storage for the vertex nodes of one triangulation call.
//!
//! Rings are circular doubly linked lists threaded through a flat buffer from the
//! caller's allocator. Links are [`NodeIndex`] handles instead of pointers, so splicing
//! and removal stay O(1) without any `unsafe`.

use core::mem;
use core::num::NonZeroU32;
use core::ops::{Index, IndexMut};

use crate::allocator::{Buffer, RawAllocator};
use crate::error::EarcutError;
use crate::geom::Point;

/// Handle of a node inside an [`Arena`]. Slot zero holds a sentinel, so handles are never zero.
pub(crate) type NodeIndex = NonZeroU32;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    /// vertex index in the input point array
    pub i: u32,
    /// z-order curve value
    pub z: i32,
    pub x: f64,
    pub y: f64,
    /// previous vertex in the polygon ring
    pub prev_i: NodeIndex,
    /// next vertex in the polygon ring
    pub next_i: NodeIndex,
    /// previous node in z-order
    pub prev_z_i: Option<NodeIndex>,
    /// next node in z-order
    pub next_z_i: Option<NodeIndex>,
    /// kept by point filtering (single-point holes)
    pub steiner: bool,
    /// unlinked from its ring
    pub removed: bool,
}

impl Node {
    fn new(i: u32, x: f64, y: f64) -> Self {
        Self {
            i,
            z: 0,
            x,
            y,
            prev_i: NodeIndex::MIN,
            next_i: NodeIndex::MIN,
            prev_z_i: None,
            next_z_i: None,
            steiner: false,
            removed: false,
        }
    }

    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub fn same_position(&self, other: &Node) -> bool {
        self.x == other.x && self.y == other.y
    }
}

pub(crate) struct Arena<'a> {
    nodes: Buffer<Node>,
    allocator: &'a dyn RawAllocator,
}

impl<'a> Arena<'a> {
    /// Takes over `nodes` (emptied) with room for `capacity` nodes.
    pub fn with_buffer(
        nodes: Buffer<Node>,
        allocator: &'a dyn RawAllocator,
        capacity: usize,
    ) -> Result<Self, EarcutError> {
        let mut arena = Self { nodes, allocator };
        arena.nodes.clear();
        arena.nodes.try_reserve(capacity + 1, allocator)?;
        arena.nodes.push(Node::new(0, f64::INFINITY, f64::INFINITY), allocator);
        Ok(arena)
    }

    /// Gives the storage back for the next call.
    pub fn into_buffer(mut self) -> Buffer<Node> {
        mem::take(&mut self.nodes)
    }

    /// The allocator the nodes come from.
    pub fn allocator(&self) -> &'a dyn RawAllocator {
        self.allocator
    }

    fn next_handle(&self) -> NodeIndex {
        match u32::try_from(self.nodes.len()).ok().and_then(NodeIndex::new) {
            Some(handle) => handle,
            None => unreachable!("node handles exhausted"),
        }
    }

    /// Creates a node and links it after `last` (or into a ring of its own).
    pub fn insert(&mut self, i: u32, x: f64, y: f64, last: Option<NodeIndex>) -> NodeIndex {
        let p_i = self.next_handle();
        let mut p = Node::new(i, x, y);
        match last {
            Some(last_i) => {
                let last_next_i = self[last_i].next_i;
                p.prev_i = last_i;
                p.next_i = last_next_i;
                self[last_i].next_i = p_i;
                self[last_next_i].prev_i = p_i;
            }
            None => {
                p.prev_i = p_i;
                p.next_i = p_i;
            }
        }
        self.nodes.push(p, self.allocator);
        p_i
    }

    /// Unlinks a node from its ring and from the z-order list.
    /// Returns the former neighbours `(prev, next)`.
    pub fn remove(&mut self, p_i: NodeIndex) -> (NodeIndex, NodeIndex) {
        let p = self[p_i];
        debug_assert!(!p.removed, "node {p_i} removed twice");

        self[p.next_i].prev_i = p.prev_i;
        self[p.prev_i].next_i = p.next_i;
        if let Some(prev_z_i) = p.prev_z_i {
            self[prev_z_i].next_z_i = p.next_z_i;
        }
        if let Some(next_z_i) = p.next_z_i {
            self[next_z_i].prev_z_i = p.prev_z_i;
        }

        let p = &mut self[p_i];
        p.removed = true;
        p.prev_z_i = None;
        p.next_z_i = None;
        (p.prev_i, p.next_i)
    }

    /// Links `a` and `b` with a two-way bridge made of duplicated nodes.
    ///
    /// When both belong to the same ring the ring is split in two; when `b` lies on a
    /// hole the hole is merged into `a`'s ring. Returns the duplicate of `b`.
    pub fn split(&mut self, a_i: NodeIndex, b_i: NodeIndex) -> NodeIndex {
        let a2_i = self.next_handle();
        let b2_i = a2_i.saturating_add(1);

        let a = self[a_i];
        let b = self[b_i];
        let mut a2 = Node::new(a.i, a.x, a.y);
        let mut b2 = Node::new(b.i, b.x, b.y);

        self[a_i].next_i = b_i;
        a2.prev_i = b2_i;
        a2.next_i = a.next_i;
        self[a.next_i].prev_i = a2_i;

        self[b_i].prev_i = a_i;
        b2.next_i = a2_i;
        b2.prev_i = b.prev_i;
        self[b.prev_i].next_i = b2_i;

        self.nodes.push(a2, self.allocator);
        self.nodes.push(b2, self.allocator);
        b2_i
    }

    /// Number of nodes in the ring containing `start`.
    pub fn ring_len(&self, start: NodeIndex) -> usize {
        self.ring(start).count()
    }

    /// Walks a ring once, starting at `start`.
    pub fn ring(&self, start: NodeIndex) -> RingIter<'_> {
        RingIter {
            arena: self,
            start,
            next: Some(start),
        }
    }
}

#[cfg(test)]
impl Arena<'static> {
    /// An empty arena on the global allocator.
    pub fn new() -> Self {
        Self::with_buffer(Buffer::new(), &crate::allocator::SystemAllocator, 0).unwrap()
    }
}

impl Drop for Arena<'_> {
    fn drop(&mut self) {
        // SAFETY: the nodes only ever grew through `self.allocator`
        unsafe { self.nodes.free(self.allocator) };
    }
}

impl Index<NodeIndex> for Arena<'_> {
    type Output = Node;

    #[inline]
    fn index(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.get() as usize]
    }
}

impl IndexMut<NodeIndex> for Arena<'_> {
    #[inline]
    fn index_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index.get() as usize]
    }
}

pub(crate) struct RingIter<'a> {
    arena: &'a Arena<'a>,
    start: NodeIndex,
    next: Option<NodeIndex>,
}

impl Iterator for RingIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<NodeIndex> {
        let current = self.next?;
        let following = self.arena[current].next_i;
        self.next = (following != self.start).then_some(following);
        Some(current)
    }
}
