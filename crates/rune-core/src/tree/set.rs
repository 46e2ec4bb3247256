//! The red-black ordered set.

use core::cmp::Ordering;

type NodeId = usize;

/// Null link. Null children count as black.
const NIL: NodeId = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    color: Color,
    parent: NodeId,
    left: NodeId,
    right: NodeId,
}

/// An ordered set of unique elements under a caller-supplied total order.
///
/// Red-black invariants hold after every mutation: the root is black, no
/// red node has a red child, and every root-to-null path crosses the same
/// number of black nodes. Inserting a value already present is a no-op, as
/// is removing an absent one.
///
/// The arena owns all reachable nodes; destruction is the arena drop, no
/// per-node walk needed.
pub struct RbSet<T> {
    nodes: Vec<Node<T>>,
    root: NodeId,
    cmp: fn(&T, &T) -> Ordering,
}

impl<T: Ord> RbSet<T> {
    /// An empty set under the element type's natural order.
    pub fn new() -> RbSet<T> {
        RbSet::with_comparator(T::cmp)
    }
}

impl<T: Ord> Default for RbSet<T> {
    fn default() -> RbSet<T> {
        RbSet::new()
    }
}

impl<T> RbSet<T> {
    /// An empty set under `cmp`, which must be a total order.
    pub fn with_comparator(cmp: fn(&T, &T) -> Ordering) -> RbSet<T> {
        RbSet {
            nodes: Vec::new(),
            root: NIL,
            cmp,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every element.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
    }

    fn color(&self, id: NodeId) -> Color {
        if id == NIL {
            Color::Black
        } else {
            self.nodes[id].color
        }
    }

    fn find(&self, value: &T) -> NodeId {
        let mut cur = self.root;
        while cur != NIL {
            match (self.cmp)(value, &self.nodes[cur].value) {
                Ordering::Equal => return cur,
                Ordering::Less => cur = self.nodes[cur].left,
                Ordering::Greater => cur = self.nodes[cur].right,
            }
        }
        NIL
    }

    /// Whether an element equal to `value` under the comparator is present.
    pub fn contains(&self, value: &T) -> bool {
        self.find(value) != NIL
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while self.nodes[id].left != NIL {
            id = self.nodes[id].left;
        }
        id
    }

    fn successor(&self, id: NodeId) -> NodeId {
        if self.nodes[id].right != NIL {
            return self.minimum(self.nodes[id].right);
        }
        let mut cur = id;
        let mut parent = self.nodes[id].parent;
        while parent != NIL && cur == self.nodes[parent].right {
            cur = parent;
            parent = self.nodes[parent].parent;
        }
        parent
    }

    fn rotate_left(&mut self, x: NodeId) {
        let y = self.nodes[x].right;
        debug_assert_ne!(y, NIL);
        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if y_left != NIL {
            self.nodes[y_left].parent = x;
        }
        let x_parent = self.nodes[x].parent;
        self.nodes[y].parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if self.nodes[x_parent].left == x {
            self.nodes[x_parent].left = y;
        } else {
            self.nodes[x_parent].right = y;
        }
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: NodeId) {
        let y = self.nodes[x].left;
        debug_assert_ne!(y, NIL);
        let y_right = self.nodes[y].right;
        self.nodes[x].left = y_right;
        if y_right != NIL {
            self.nodes[y_right].parent = x;
        }
        let x_parent = self.nodes[x].parent;
        self.nodes[y].parent = x_parent;
        if x_parent == NIL {
            self.root = y;
        } else if self.nodes[x_parent].left == x {
            self.nodes[x_parent].left = y;
        } else {
            self.nodes[x_parent].right = y;
        }
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    /// Inserts `value`; `false` (set unchanged) when an equal element is
    /// already present.
    pub fn insert(&mut self, value: T) -> bool {
        let mut parent = NIL;
        let mut cur = self.root;
        let mut went_left = false;
        while cur != NIL {
            match (self.cmp)(&value, &self.nodes[cur].value) {
                Ordering::Equal => return false,
                Ordering::Less => {
                    parent = cur;
                    went_left = true;
                    cur = self.nodes[cur].left;
                }
                Ordering::Greater => {
                    parent = cur;
                    went_left = false;
                    cur = self.nodes[cur].right;
                }
            }
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            value,
            color: Color::Red,
            parent,
            left: NIL,
            right: NIL,
        });
        if parent == NIL {
            self.root = id;
        } else if went_left {
            self.nodes[parent].left = id;
        } else {
            self.nodes[parent].right = id;
        }
        self.insert_fixup(id);
        true
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while self.color(self.nodes[z].parent) == Color::Red {
            let p = self.nodes[z].parent;
            // A red parent is never the root, so the grandparent exists.
            let g = self.nodes[p].parent;
            if p == self.nodes[g].left {
                let u = self.nodes[g].right;
                if self.color(u) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[u].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if z == self.nodes[p].right {
                        // Inner child: straighten first.
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let u = self.nodes[g].left;
                if self.color(u) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[u].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if z == self.nodes[p].left {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.nodes[root].color = Color::Black;
    }

    /// Replaces the subtree rooted at `u` with the one rooted at `v` in
    /// `u`'s parent.
    fn transplant(&mut self, u: NodeId, v: NodeId) {
        let p = self.nodes[u].parent;
        if p == NIL {
            self.root = v;
        } else if self.nodes[p].left == u {
            self.nodes[p].left = v;
        } else {
            self.nodes[p].right = v;
        }
        if v != NIL {
            self.nodes[v].parent = p;
        }
    }

    /// Removes the element equal to `value`; `false` when absent.
    pub fn remove(&mut self, value: &T) -> bool {
        let z = self.find(value);
        if z == NIL {
            return false;
        }

        // `removed_color` is the color of the node physically spliced out;
        // `x`/`x_parent` is the position that may carry a double black.
        let removed_color;
        let x;
        let mut x_parent;

        if self.nodes[z].left == NIL {
            removed_color = self.nodes[z].color;
            x = self.nodes[z].right;
            x_parent = self.nodes[z].parent;
            self.transplant(z, x);
        } else if self.nodes[z].right == NIL {
            removed_color = self.nodes[z].color;
            x = self.nodes[z].left;
            x_parent = self.nodes[z].parent;
            self.transplant(z, x);
        } else {
            // Two children: relink the in-order successor into z's place.
            let y = self.minimum(self.nodes[z].right);
            removed_color = self.nodes[y].color;
            x = self.nodes[y].right;
            if self.nodes[y].parent == z {
                x_parent = y;
            } else {
                x_parent = self.nodes[y].parent;
                self.transplant(y, x);
                let zr = self.nodes[z].right;
                self.nodes[y].right = zr;
                self.nodes[zr].parent = y;
            }
            self.transplant(z, y);
            let zl = self.nodes[z].left;
            self.nodes[y].left = zl;
            self.nodes[zl].parent = y;
            self.nodes[y].color = self.nodes[z].color;
        }

        if removed_color == Color::Black {
            self.remove_fixup(x, x_parent);
        }
        self.release(z);
        true
    }

    /// Double-black fix-up. `x` may be NIL, hence the explicit parent.
    fn remove_fixup(&mut self, mut x: NodeId, mut x_parent: NodeId) {
        while x != self.root && self.color(x) == Color::Black {
            if x == self.nodes[x_parent].left {
                let mut w = self.nodes[x_parent].right;
                debug_assert_ne!(w, NIL);
                if self.color(w) == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[x_parent].color = Color::Red;
                    self.rotate_left(x_parent);
                    w = self.nodes[x_parent].right;
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = x_parent;
                    x_parent = self.nodes[x].parent;
                } else {
                    if self.color(self.nodes[w].right) == Color::Black {
                        // Red child is inner: move it outside.
                        let wl = self.nodes[w].left;
                        self.nodes[wl].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_right(w);
                        w = self.nodes[x_parent].right;
                    }
                    self.nodes[w].color = self.nodes[x_parent].color;
                    self.nodes[x_parent].color = Color::Black;
                    let wr = self.nodes[w].right;
                    self.nodes[wr].color = Color::Black;
                    self.rotate_left(x_parent);
                    x = self.root;
                }
            } else {
                let mut w = self.nodes[x_parent].left;
                debug_assert_ne!(w, NIL);
                if self.color(w) == Color::Red {
                    self.nodes[w].color = Color::Black;
                    self.nodes[x_parent].color = Color::Red;
                    self.rotate_right(x_parent);
                    w = self.nodes[x_parent].left;
                }
                if self.color(self.nodes[w].left) == Color::Black
                    && self.color(self.nodes[w].right) == Color::Black
                {
                    self.nodes[w].color = Color::Red;
                    x = x_parent;
                    x_parent = self.nodes[x].parent;
                } else {
                    if self.color(self.nodes[w].left) == Color::Black {
                        let wr = self.nodes[w].right;
                        self.nodes[wr].color = Color::Black;
                        self.nodes[w].color = Color::Red;
                        self.rotate_left(w);
                        w = self.nodes[x_parent].left;
                    }
                    self.nodes[w].color = self.nodes[x_parent].color;
                    self.nodes[x_parent].color = Color::Black;
                    let wl = self.nodes[w].left;
                    self.nodes[wl].color = Color::Black;
                    self.rotate_right(x_parent);
                    x = self.root;
                }
            }
        }
        if x != NIL {
            self.nodes[x].color = Color::Black;
        }
    }

    /// Returns the detached slot `z` to the arena, compacting by moving the
    /// last node into it and rewiring the moved node's neighbors.
    fn release(&mut self, z: NodeId) {
        let last = self.nodes.len() - 1;
        self.nodes.swap_remove(z);
        if z == last {
            return;
        }
        // The node formerly at `last` now lives at `z`; nothing referenced
        // the detached slot, so only the moved node's links need rewiring.
        let p = self.nodes[z].parent;
        if p == NIL {
            self.root = z;
        } else if self.nodes[p].left == last {
            self.nodes[p].left = z;
        } else {
            self.nodes[p].right = z;
        }
        let l = self.nodes[z].left;
        if l != NIL {
            self.nodes[l].parent = z;
        }
        let r = self.nodes[z].right;
        if r != NIL {
            self.nodes[r].parent = z;
        }
    }

    /// In-order iterator, ascending under the comparator.
    pub fn iter(&self) -> Iter<'_, T> {
        let next = if self.root == NIL {
            NIL
        } else {
            self.minimum(self.root)
        };
        Iter { set: self, next }
    }

    /// Checks the red-black invariants and the ordering invariant.
    ///
    /// Intended for tests and debugging; returns the violated invariant.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.root == NIL {
            return Ok(());
        }
        if self.nodes[self.root].parent != NIL {
            return Err("root has a parent");
        }
        if self.color(self.root) != Color::Black {
            return Err("root is red");
        }
        self.validate_from(self.root)?;
        let mut prev: Option<&T> = None;
        for v in self.iter() {
            if let Some(p) = prev {
                if (self.cmp)(p, v) != Ordering::Less {
                    return Err("in-order traversal not strictly ascending");
                }
            }
            prev = Some(v);
        }
        Ok(())
    }

    /// Returns the black height of the subtree, checking colors and parent
    /// links along the way.
    fn validate_from(&self, id: NodeId) -> Result<usize, &'static str> {
        if id == NIL {
            return Ok(1);
        }
        let node = &self.nodes[id];
        if node.color == Color::Red
            && (self.color(node.left) == Color::Red || self.color(node.right) == Color::Red)
        {
            return Err("red node has a red child");
        }
        for child in [node.left, node.right] {
            if child != NIL && self.nodes[child].parent != id {
                return Err("child's parent link is wrong");
            }
        }
        let lh = self.validate_from(node.left)?;
        let rh = self.validate_from(node.right)?;
        if lh != rh {
            return Err("black height mismatch");
        }
        Ok(lh + usize::from(node.color == Color::Black))
    }
}

impl<'a, T> IntoIterator for &'a RbSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// In-order borrowed iterator over an [`RbSet`]. Walks parent links, no
/// allocation.
pub struct Iter<'a, T> {
    set: &'a RbSet<T>,
    next: NodeId,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.next == NIL {
            return None;
        }
        let id = self.next;
        self.next = self.set.successor(id);
        Some(&self.set.nodes[id].value)
    }
}
