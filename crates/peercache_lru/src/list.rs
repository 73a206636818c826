// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A doubly linked list whose nodes live in a slot arena.
//!
//! Nodes are addressed by [`SlotId`], which stays valid until the node is removed. Freed
//! slots are recycled through a free list, so removing one node never moves another.

/// Stable handle to a node in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Ordered sequence with O(1) push-back, move-to-back, unlink and pop-front.
///
/// The front holds the oldest node, the back the newest.
#[derive(Debug)]
pub(crate) struct RecencyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<T> RecencyList<T> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn front(&self) -> Option<SlotId> {
        self.head
    }

    pub(crate) fn get(&self, id: SlotId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0).and_then(Option::as_mut).map(|node| &mut node.value)
    }

    /// Appends `value` as the newest node.
    pub(crate) fn push_back(&mut self, value: T) -> SlotId {
        let node = Node {
            value,
            prev: self.tail,
            next: None,
        };

        let id = if let Some(index) = self.free.pop() {
            self.slots[index] = Some(node);
            SlotId(index)
        } else {
            self.slots.push(Some(node));
            SlotId(self.slots.len() - 1)
        };

        match self.tail {
            Some(tail) => self.set_next(tail, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Moves an existing node to the back. Returns `false` if `id` is not live.
    pub(crate) fn move_to_back(&mut self, id: SlotId) -> bool {
        if self.node(id).is_none() {
            return false;
        }
        if self.tail == Some(id) {
            return true;
        }

        self.unlink(id);

        let old_tail = self.tail;
        if let Some(node) = self.node_mut(id) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.set_next(tail, Some(id)),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        true
    }

    /// Removes a node, returning its value.
    pub(crate) fn remove(&mut self, id: SlotId) -> Option<T> {
        self.node(id)?;
        self.unlink(id);

        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Removes the oldest node, returning its value.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        self.remove(head)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?)?;
            cursor = node.next;
            Some(&node.value)
        })
    }

    fn node(&self, id: SlotId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node<T>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn set_next(&mut self, id: SlotId, next: Option<SlotId>) {
        if let Some(node) = self.node_mut(id) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, id: SlotId, prev: Option<SlotId>) {
        if let Some(node) = self.node_mut(id) {
            node.prev = prev;
        }
    }

    /// Detaches a live node from its neighbours without freeing its slot.
    fn unlink(&mut self, id: SlotId) {
        let Some((prev, next)) = self.node(id).map(|node| (node.prev, node.next)) else {
            return;
        };

        match prev {
            Some(prev) => self.set_next(prev, next),
            None => self.head = next,
        }
        match next {
            Some(next) => self.set_prev(next, prev),
            None => self.tail = prev,
        }
    }
}
