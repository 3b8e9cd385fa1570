//! Property-propagating scene graph.
//!
//! A [`Node`] stores the *local* properties of an object (its delta from the
//! parent) and owns its children. Global properties are never stored; they
//! are folded on demand either top-down ([`Node::traverse`]) or bottom-up
//! ([`Node::properties_delta_to_root`]). Both give the same answer.

mod node;

pub use node::{closest_common_ancestor, Node};
