//! This crate exposes a red-black tree: a self-balancing Binary Search
//! Tree (BST) with a guaranteed logarithmic height.
//!
//! ## Red-Black Tree
//!
//! A Binary Search Tree supports operations to insert, find, and delete
//! stored keys, and its most important invariant is ordering: for every
//! node, all keys in its left subtree are less than or equal to its own
//! key and all keys in its right subtree are greater than or equal to it.
//! Ordering alone says nothing about shape, though - inserting keys in
//! ascending order degrades a plain BST into a linked list and every
//! operation into a linear scan.
//!
//! A red-black tree fixes the shape problem by tagging each node with a
//! one-bit color and maintaining a small set of coloring rules on top of
//! the ordering rule:
//!
//! 1. The root is always black (or the tree is empty).
//! 2. The shared "nil" sentinel standing in for absent children is
//!    always black.
//! 3. No red node has a red child.
//! 4. Every path from a node down to a descendant sentinel passes
//!    through the same number of black nodes (the node's "black-height").
//! 5. In-order traversal yields the keys in non-decreasing order.
//!
//! Together, rules 3 and 4 bound the longest root-to-leaf path by twice
//! the shortest one, so a tree holding `n` keys never grows taller than
//! `2 * log2(n + 1)`. Inserts and deletes restore the rules with a
//! bounded number of local rotations plus a recoloring walk toward the
//! root, keeping every operation `O(log n)`.

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

pub mod arena;

#[cfg(test)]
mod test {
    pub mod quick;
}
