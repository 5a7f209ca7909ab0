//! Arena-backed doubly linked list.
//!
//! Nodes live in a `Vec` and link to each other by index, so moving a node
//! to the front is a handful of index writes and no node is ever freed while
//! something still points at it. Vacated slots are recycled through a free
//! list.

/// Sentinel index meaning "no node".
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// An ordered list of key-value pairs addressed by stable slot indices.
/// The front is the most recently inserted or promoted entry.
#[derive(Debug)]
pub(crate) struct SlabList<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<K, V> SlabList<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        self.slots[idx].as_ref().expect("slab index points at a vacant slot")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.slots[idx].as_mut().expect("slab index points at a vacant slot")
    }

    pub(crate) fn key(&self, idx: usize) -> &K {
        &self.node(idx).key
    }

    pub(crate) fn value(&self, idx: usize) -> &V {
        &self.node(idx).value
    }

    pub(crate) fn value_mut(&mut self, idx: usize) -> &mut V {
        &mut self.node_mut(idx).value
    }

    /// Index of the front entry.
    pub(crate) fn front(&self) -> Option<usize> {
        (self.head != NIL).then_some(self.head)
    }

    /// Inserts at the front and returns the new entry's index.
    pub(crate) fn push_front(&mut self, key: K, value: V) -> usize {
        let node = Node {
            key,
            value,
            prev: NIL,
            next: self.head,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        if self.head != NIL {
            self.node_mut(self.head).prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
        self.len += 1;
        idx
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        if prev != NIL {
            self.node_mut(prev).next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.node_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }
    }

    /// Removes the entry at `idx` and frees its slot.
    pub(crate) fn remove(&mut self, idx: usize) -> (K, V) {
        self.unlink(idx);
        let node = self.slots[idx]
            .take()
            .expect("slab index points at a vacant slot");
        self.free.push(idx);
        self.len -= 1;
        (node.key, node.value)
    }

    /// Removes the back entry.
    pub(crate) fn pop_back(&mut self) -> Option<(K, V)> {
        (self.tail != NIL).then(|| self.remove(self.tail))
    }

    /// Moves the entry at `idx` to the front.
    pub(crate) fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);

        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }
}
