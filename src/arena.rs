//! An arena-backed red-black tree. Nodes live in a `Vec` owned by the tree and
//! point at each other through indices instead of pointers, with index 0
//! reserved for the shared "nil" sentinel that stands in for every absent child
//! and for the parent of the root. Keeping the sentinel as a real (always
//! black) node means the rotation and fixup code never has to special-case
//! missing children.
//!
//! # Examples
//!
//! ```
//! use rbtree::arena::Tree;
//!
//! let mut tree = Tree::new();
//!
//! // Nothing in here yet.
//! assert_eq!(tree.find(&1), None);
//!
//! let one = tree.insert(1);
//! assert_eq!(tree.find(&1), Some(one));
//!
//! // Equal keys may be inserted more than once; each insert hands back
//! // its own node.
//! let another_one = tree.insert(1);
//! assert_ne!(one, another_one);
//!
//! // Deleting a node returns its key.
//! assert_eq!(tree.delete(one), 1);
//! assert_eq!(tree.delete(another_one), 1);
//! assert_eq!(tree.find(&1), None);
//! ```

use std::cmp::Ordering;
use std::fmt;

/// Arena index of the sentinel. It is allocated by `Tree::new` and never
/// handed out as a `NodeId`.
const NIL: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

/// A stable handle to a node stored in a [`Tree`].
///
/// Handles are returned by [`Tree::insert`] and stay valid until the node they
/// name is passed to [`Tree::delete`], no matter how many other insertions or
/// deletions happen in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Clone)]
struct Node<K> {
    /// `None` only for the sentinel and for vacated slots awaiting reuse.
    key: Option<K>,
    color: Color,
    parent: u32,
    left: u32,
    right: u32,
}

/// A self-balancing Binary Search Tree (specifically, a red-black tree) keyed
/// by any totally-ordered type. Equal keys may be stored more than once; each
/// occurrence is its own node.
///
/// # Examples
///
/// ```
/// use rbtree::arena::Tree;
///
/// let mut tree = Tree::new();
/// for key in [11, 2, 14, 1, 15, 7, 5, 8, 4] {
///     tree.insert(key);
/// }
///
/// let sorted: Vec<i32> = tree.iter().copied().collect();
/// assert_eq!(sorted, vec![1, 2, 4, 5, 7, 8, 11, 14, 15]);
/// ```
#[derive(Clone)]
pub struct Tree<K> {
    /// The arena. Slot 0 is the sentinel; deleted slots are recycled through
    /// `free` and the vec itself never shrinks.
    nodes: Vec<Node<K>>,
    /// Index of the root node, or `NIL` when the tree is empty.
    root: u32,
    /// Vacated arena slots available for reuse by later inserts.
    free: Vec<u32>,
    len: usize,
}

impl<K> Default for Tree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Tree<K> {
    /// Generate a new, empty `Tree`.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                key: None,
                color: Color::Black,
                parent: NIL,
                left: NIL,
                right: NIL,
            }],
            root: NIL,
            free: Vec::new(),
            len: 0,
        }
    }

    /// The number of keys currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The root node, or `None` when the tree is empty.
    pub fn root(&self) -> Option<NodeId> {
        if self.root == NIL {
            None
        } else {
            Some(NodeId(self.root))
        }
    }

    /// The key stored at the given node.
    pub fn key(&self, node: NodeId) -> &K {
        self.key_of(node.0)
    }

    /// The leftmost (smallest-keyed) node of the subtree rooted at `subtree`.
    /// Passing the root yields the tree-wide minimum.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::arena::Tree;
    ///
    /// let mut tree = Tree::new();
    /// for key in [5, 3, 8, 1] {
    ///     tree.insert(key);
    /// }
    ///
    /// let min = tree.minimum(tree.root().unwrap());
    /// assert_eq!(tree.key(min), &1);
    /// ```
    pub fn minimum(&self, subtree: NodeId) -> NodeId {
        NodeId(self.minimum_in(subtree.0))
    }

    /// Potentially finds a node holding the given key. If no node has the
    /// key, `None` is returned. When the key was inserted more than once,
    /// which of the equal nodes is returned is unspecified.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::arena::Tree;
    ///
    /// let mut tree = Tree::new();
    /// let one = tree.insert(1);
    ///
    /// assert_eq!(tree.find(&1), Some(one));
    /// assert_eq!(tree.find(&42), None);
    /// ```
    pub fn find(&self, key: &K) -> Option<NodeId>
    where
        K: Ord,
    {
        let mut x = self.root;
        while x != NIL {
            match key.cmp(self.key_of(x)) {
                Ordering::Less => x = self.left(x),
                Ordering::Greater => x = self.right(x),
                Ordering::Equal => return Some(NodeId(x)),
            }
        }
        None
    }

    /// Inserts the given key and returns a handle to the new node. Inserting
    /// never fails; a key equal to one already present is stored again as a
    /// separate node (in the right subtree of its equal).
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::arena::Tree;
    ///
    /// let mut tree = Tree::new();
    ///
    /// tree.insert(2);
    /// tree.insert(1);
    /// tree.insert(2);
    ///
    /// let keys: Vec<i32> = tree.iter().copied().collect();
    /// assert_eq!(keys, vec![1, 2, 2]);
    /// ```
    pub fn insert(&mut self, key: K) -> NodeId
    where
        K: Ord,
    {
        let z = self.allocate(key);

        let mut y = NIL;
        let mut x = self.root;
        while x != NIL {
            y = x;
            x = if self.key_of(z) < self.key_of(x) {
                self.left(x)
            } else {
                self.right(x)
            };
        }

        self.node_mut(z).parent = y;
        if y == NIL {
            self.root = z;
        } else if self.key_of(z) < self.key_of(y) {
            self.node_mut(y).left = z;
        } else {
            self.node_mut(y).right = z;
        }

        self.len += 1;
        self.insert_fixup(z);

        if cfg!(debug_assertions) {
            assert_eq!(self.color(self.root), Color::Black);
            assert_eq!(self.color(NIL), Color::Black);
        }

        NodeId(z)
    }

    /// Deletes the referenced node from the tree and returns its key.
    ///
    /// The handle must have been returned by this tree's [`insert`] and not
    /// passed to `delete` since. Handing over anything else is a logic error:
    /// the call may panic or quietly corrupt the tree's ordering, though it
    /// never touches memory outside the tree's own arena.
    ///
    /// [`insert`]: Tree::insert
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::arena::Tree;
    ///
    /// let mut tree = Tree::new();
    /// let five = tree.insert(5);
    /// tree.insert(9);
    ///
    /// assert_eq!(tree.delete(five), 5);
    /// assert_eq!(tree.find(&5), None);
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn delete(&mut self, node: NodeId) -> K {
        let z = node.0;
        debug_assert!(
            z != NIL && (z as usize) < self.nodes.len() && self.node(z).key.is_some(),
            "handle does not name a live node of this tree",
        );

        // `y` is the node leaving its structural position: `z` itself, or
        // `z`'s in-order successor when `z` has two real children. `x` is
        // whatever takes over `y`'s old position, sentinel included.
        let mut y = z;
        let mut y_color = self.color(y);
        let x;
        if self.left(z) == NIL {
            x = self.right(z);
            self.transplant(z, x);
        } else if self.right(z) == NIL {
            x = self.left(z);
            self.transplant(z, x);
        } else {
            y = self.minimum_in(self.right(z));
            y_color = self.color(y);
            x = self.right(y);
            if self.parent(y) == z {
                // `x` may be the sentinel; the fixup below walks `x`'s parent
                // link, so it has to be set even then.
                self.node_mut(x).parent = y;
            } else {
                self.transplant(y, x);
                let zr = self.right(z);
                self.node_mut(y).right = zr;
                self.node_mut(zr).parent = y;
            }
            self.transplant(z, y);
            let zl = self.left(z);
            self.node_mut(y).left = zl;
            self.node_mut(zl).parent = y;
            // `y` absorbs `z`'s color, so the only color imbalance left is the
            // one at `x`'s position.
            let zc = self.color(z);
            self.node_mut(y).color = zc;
        }

        // Unlinking a red node cannot change any black-height.
        if y_color == Color::Black {
            self.delete_fixup(x);
        }

        self.len -= 1;
        self.free.push(z);
        let key = self
            .node_mut(z)
            .key
            .take()
            .expect("deleted node had no key; handle did not name a live node");

        if cfg!(debug_assertions) {
            assert_eq!(self.color(NIL), Color::Black);
            if self.root != NIL {
                assert_eq!(self.color(self.root), Color::Black);
            }
        }

        key
    }

    /// An in-order (sorted) iterator over the stored keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::arena::Tree;
    ///
    /// let mut tree = Tree::new();
    /// for key in [3, 1, 2] {
    ///     tree.insert(key);
    /// }
    ///
    /// assert!(tree.iter().eq([1, 2, 3].iter()));
    /// ```
    pub fn iter(&self) -> Iter<'_, K> {
        let first = if self.root == NIL {
            NIL
        } else {
            self.minimum_in(self.root)
        };
        Iter { tree: self, next: first }
    }

    /// The number of nodes on the longest path from the root down to a leaf;
    /// 0 for an empty tree. A tree holding `n` keys never exceeds
    /// `2 * log2(n + 1)`.
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    /// Walks the whole tree and checks every structural rule it relies on:
    /// black root and sentinel, no red node with a red child, equal
    /// black-height along every path, sorted in-order key sequence, coherent
    /// parent links, and a reachable-node count matching [`len`]. Intended
    /// for tests and debugging; it visits every node.
    ///
    /// [`len`]: Tree::len
    pub fn assert_valid(&self) -> Result<(), String>
    where
        K: Ord,
    {
        if self.color(NIL) != Color::Black {
            return Err("sentinel is not black".to_string());
        }
        if self.root == NIL {
            if self.len != 0 {
                return Err("empty tree with a nonzero length".to_string());
            }
            return Ok(());
        }
        if self.is_red(self.root) {
            return Err("root is not black".to_string());
        }
        if self.parent(self.root) != NIL {
            return Err("root has a parent".to_string());
        }

        self.black_height(self.root)?;

        let mut count = 0;
        let mut prev: Option<&K> = None;
        for key in self.iter() {
            if let Some(prev) = prev {
                if prev > key {
                    return Err("in-order key sequence is not sorted".to_string());
                }
            }
            prev = Some(key);
            count += 1;
        }
        if count != self.len {
            return Err("length does not match reachable node count".to_string());
        }

        Ok(())
    }

    /// Black-height of the subtree at `n`, verifying coloring and parent
    /// links on the way down.
    fn black_height(&self, n: u32) -> Result<usize, String> {
        if n == NIL {
            return Ok(0);
        }

        let l = self.left(n);
        let r = self.right(n);
        if l != NIL && self.parent(l) != n {
            return Err("broken parent link on a left child".to_string());
        }
        if r != NIL && self.parent(r) != n {
            return Err("broken parent link on a right child".to_string());
        }
        if self.is_red(n) && (self.is_red(l) || self.is_red(r)) {
            return Err("red node has a red child".to_string());
        }

        let lh = self.black_height(l)?;
        let rh = self.black_height(r)?;
        if lh != rh {
            return Err("black-height mismatch".to_string());
        }

        Ok(lh + if self.is_red(n) { 0 } else { 1 })
    }

    fn height_of(&self, n: u32) -> usize {
        if n == NIL {
            0
        } else {
            1 + self
                .height_of(self.left(n))
                .max(self.height_of(self.right(n)))
        }
    }

    /// Places a fresh red node in the arena, reusing a vacated slot when one
    /// is available.
    fn allocate(&mut self, key: K) -> u32 {
        let node = Node {
            key: Some(key),
            color: Color::Red,
            parent: NIL,
            left: NIL,
            right: NIL,
        };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        }
    }

    /// Restores the coloring rules after `z` was spliced in red. Each loop
    /// iteration either pushes the red-red violation two levels up (red
    /// uncle) or resolves it with at most two rotations (black uncle).
    fn insert_fixup(&mut self, mut z: u32) {
        while self.is_red(self.parent(z)) {
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.left(g) {
                let u = self.right(g);
                if self.is_red(u) {
                    // Red uncle: recolor and move the violation to `g`.
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(u).color = Color::Black;
                    self.node_mut(g).color = Color::Red;
                    z = g;
                } else {
                    let mut z2 = z;
                    if z2 == self.right(p) {
                        // Inner child: rotate into the outer shape first.
                        z2 = p;
                        self.left_rotate(z2);
                    }
                    let p2 = self.parent(z2);
                    let g2 = self.parent(p2);
                    self.node_mut(p2).color = Color::Black;
                    self.node_mut(g2).color = Color::Red;
                    self.right_rotate(g2);
                    z = z2;
                }
            } else {
                let u = self.left(g);
                if self.is_red(u) {
                    self.node_mut(p).color = Color::Black;
                    self.node_mut(u).color = Color::Black;
                    self.node_mut(g).color = Color::Red;
                    z = g;
                } else {
                    let mut z2 = z;
                    if z2 == self.left(p) {
                        z2 = p;
                        self.right_rotate(z2);
                    }
                    let p2 = self.parent(z2);
                    let g2 = self.parent(p2);
                    self.node_mut(p2).color = Color::Black;
                    self.node_mut(g2).color = Color::Red;
                    self.left_rotate(g2);
                    z = z2;
                }
            }
        }
        let root = self.root;
        self.node_mut(root).color = Color::Black;
    }

    /// Discharges the "double black" deficiency sitting on `x` after a black
    /// node was unlinked, walking upward until the deficiency is absorbed or
    /// `x` reaches the root.
    fn delete_fixup(&mut self, mut x: u32) {
        while x != self.root && !self.is_red(x) {
            let p = self.parent(x);
            if x == self.left(p) {
                let mut w = self.right(p);
                if self.is_red(w) {
                    // Red sibling: rotate so the sibling is black.
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.left_rotate(p);
                    w = self.right(p);
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    // Both nephews black: move the deficiency up to `p`.
                    self.node_mut(w).color = Color::Red;
                    x = p;
                } else {
                    if !self.is_red(self.right(w)) {
                        // Far nephew black: rotate the near one outward.
                        let wl = self.left(w);
                        self.node_mut(wl).color = Color::Black;
                        self.node_mut(w).color = Color::Red;
                        self.right_rotate(w);
                        w = self.right(p);
                    }
                    // Red far nephew: one rotation absorbs the deficiency.
                    let pc = self.color(p);
                    self.node_mut(w).color = pc;
                    self.node_mut(p).color = Color::Black;
                    let wr = self.right(w);
                    self.node_mut(wr).color = Color::Black;
                    self.left_rotate(p);
                    x = self.root;
                }
            } else {
                let mut w = self.left(p);
                if self.is_red(w) {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.right_rotate(p);
                    w = self.left(p);
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.node_mut(w).color = Color::Red;
                    x = p;
                } else {
                    if !self.is_red(self.left(w)) {
                        let wr = self.right(w);
                        self.node_mut(wr).color = Color::Black;
                        self.node_mut(w).color = Color::Red;
                        self.left_rotate(w);
                        w = self.left(p);
                    }
                    let pc = self.color(p);
                    self.node_mut(w).color = pc;
                    self.node_mut(p).color = Color::Black;
                    let wl = self.left(w);
                    self.node_mut(wl).color = Color::Black;
                    self.right_rotate(p);
                    x = self.root;
                }
            }
        }
        self.node_mut(x).color = Color::Black;
    }

    /// Rotate the subtree at `x` to the left. `x`'s right child `y` takes
    /// `x`'s place, `y`'s left subtree becomes `x`'s right subtree, and `x`
    /// becomes `y`'s left child. In-order sequence is unchanged.
    ///
    /// ```text
    ///   x                y
    ///  / \              / \
    /// a   y     ->     x   c
    ///    / \          / \
    ///   b   c        a   b
    /// ```
    fn left_rotate(&mut self, x: u32) {
        let y = self.right(x);
        let yl = self.left(y);

        self.node_mut(x).right = yl;
        if yl != NIL {
            self.node_mut(yl).parent = x;
        }

        let xp = self.parent(x);
        self.node_mut(y).parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.left(xp) == x {
            self.node_mut(xp).left = y;
        } else {
            self.node_mut(xp).right = y;
        }

        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
    }

    /// Mirror of [`left_rotate`]: `x`'s left child takes `x`'s place.
    ///
    /// [`left_rotate`]: Tree::left_rotate
    fn right_rotate(&mut self, x: u32) {
        let y = self.left(x);
        let yr = self.right(y);

        self.node_mut(x).left = yr;
        if yr != NIL {
            self.node_mut(yr).parent = x;
        }

        let xp = self.parent(x);
        self.node_mut(y).parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.left(xp) == x {
            self.node_mut(xp).left = y;
        } else {
            self.node_mut(xp).right = y;
        }

        self.node_mut(y).right = x;
        self.node_mut(x).parent = y;
    }

    /// Replaces the subtree at `u` with the subtree at `v` as seen from `u`'s
    /// parent. `v`'s parent link is always written, sentinel included; `v`'s
    /// children are the caller's problem.
    fn transplant(&mut self, u: u32, v: u32) {
        let p = self.parent(u);
        if p == NIL {
            self.root = v;
        } else if self.left(p) == u {
            self.node_mut(p).left = v;
        } else {
            self.node_mut(p).right = v;
        }
        self.node_mut(v).parent = p;
    }

    fn minimum_in(&self, mut x: u32) -> u32 {
        while self.left(x) != NIL {
            x = self.left(x);
        }
        x
    }

    /// The in-order successor of `x`, or `NIL` for the maximum.
    fn successor(&self, x: u32) -> u32 {
        if self.right(x) != NIL {
            return self.minimum_in(self.right(x));
        }
        let mut x = x;
        let mut p = self.parent(x);
        while p != NIL && x == self.right(p) {
            x = p;
            p = self.parent(p);
        }
        p
    }

    fn node(&self, i: u32) -> &Node<K> {
        &self.nodes[i as usize]
    }

    fn node_mut(&mut self, i: u32) -> &mut Node<K> {
        &mut self.nodes[i as usize]
    }

    fn key_of(&self, i: u32) -> &K {
        self.node(i)
            .key
            .as_ref()
            .expect("index names the sentinel or a vacant slot")
    }

    fn color(&self, i: u32) -> Color {
        self.node(i).color
    }

    fn is_red(&self, i: u32) -> bool {
        self.node(i).color == Color::Red
    }

    fn parent(&self, i: u32) -> u32 {
        self.node(i).parent
    }

    fn left(&self, i: u32) -> u32 {
        self.node(i).left
    }

    fn right(&self, i: u32) -> u32 {
        self.node(i).right
    }
}

/// Renders the tree level by level, top down: each line is one depth, nodes
/// are shown as the key followed by `R` or `B`, and `·` marks an absent
/// child, so shape and coloring are readable at a glance in test output.
impl<K> fmt::Debug for Tree<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root == NIL {
            return f.write_str("(empty)");
        }

        let mut level = vec![self.root];
        loop {
            let mut next = Vec::with_capacity(level.len() * 2);
            for (i, &n) in level.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                if n == NIL {
                    f.write_str("·")?;
                    next.push(NIL);
                    next.push(NIL);
                } else {
                    let tag = if self.is_red(n) { "R" } else { "B" };
                    write!(f, "{:?}{}", self.key_of(n), tag)?;
                    next.push(self.left(n));
                    next.push(self.right(n));
                }
            }
            if next.iter().all(|&n| n == NIL) {
                return Ok(());
            }
            writeln!(f)?;
            level = next;
        }
    }
}

/// In-order iterator over a [`Tree`]'s keys, created by [`Tree::iter`].
pub struct Iter<'a, K> {
    tree: &'a Tree<K>,
    next: u32,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        if self.next == NIL {
            return None;
        }
        let current = self.next;
        self.next = self.tree.successor(current);
        self.tree.node(current).key.as_ref()
    }
}


#[cfg(test)]
mod quicktests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test::quick::Op;

    /// Applies a set of operations to a tree and a multiset model. This way we
    /// can ensure that after a random smattering of inserts and deletes the
    /// tree holds exactly the model's keys, duplicates included.
    fn do_ops<K>(ops: &[Op<K>], tree: &mut Tree<K>, model: &mut BTreeMap<K, usize>)
    where
        K: Ord + Clone + std::fmt::Debug,
    {
        for op in ops {
            match op {
                Op::Insert(k) => {
                    tree.insert(k.clone());
                    *model.entry(k.clone()).or_insert(0) += 1;
                }
                Op::Remove(k) => match tree.find(k) {
                    Some(node) => {
                        assert_eq!(&tree.delete(node), k);
                        let count = model.get_mut(k).expect("model missing a stored key");
                        *count -= 1;
                        if *count == 0 {
                            model.remove(k);
                        }
                    }
                    None => assert!(!model.contains_key(k)),
                },
            }
        }
    }

    fn model_keys(model: &BTreeMap<i8, usize>) -> Vec<i8> {
        model
            .iter()
            .flat_map(|(&k, &n)| std::iter::repeat(k).take(n))
            .collect()
    }

    quickcheck::quickcheck! {
        fn fuzz_multiple_operations_i8(ops: Vec<Op<i8>>) -> bool {
            let mut tree = Tree::new();
            let mut model = BTreeMap::new();

            do_ops(&ops, &mut tree, &mut model);
            tree.assert_valid().is_ok() && tree.iter().copied().eq(model_keys(&model))
        }
    }

    quickcheck::quickcheck! {
        fn contains(xs: Vec<i8>) -> bool {
            let mut tree = Tree::new();
            for x in &xs {
                tree.insert(*x);
            }

            tree.assert_valid().is_ok() && xs.iter().all(|x| tree.find(x).is_some())
        }
    }
}
