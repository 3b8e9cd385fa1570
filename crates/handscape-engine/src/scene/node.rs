use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::property::{Property, Side};

/// A scene-graph node holding local properties `P` and a payload `T`.
///
/// Nodes are always handled through `Rc<Node>`. A parent owns its children
/// strongly and in insertion order; children point back through a `Weak`
/// reference that is only used to walk towards the root.
pub struct Node<P, T> {
    local: RefCell<P>,
    parent: RefCell<Weak<Node<P, T>>>,
    children: RefCell<Vec<Rc<Node<P, T>>>>,
    payload: T,
}

impl<P: Property, T> Node<P, T> {
    /// A detached node with identity local properties.
    pub fn new(payload: T) -> Rc<Self> {
        Self::with_local(P::identity(), payload)
    }

    pub fn with_local(local: P, payload: T) -> Rc<Self> {
        Rc::new(Self {
            local: RefCell::new(local),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            payload,
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// The delta from the parent.
    #[inline]
    pub fn local(&self) -> Ref<'_, P> {
        self.local.borrow()
    }

    #[inline]
    pub fn local_mut(&self) -> RefMut<'_, P> {
        self.local.borrow_mut()
    }

    #[inline]
    pub fn set_local(&self, local: P) {
        *self.local.borrow_mut() = local;
    }

    #[inline]
    pub fn parent(&self) -> Option<Rc<Self>> {
        self.parent.borrow().upgrade()
    }

    /// Snapshot of the children in insertion order.
    #[inline]
    pub fn children(&self) -> Vec<Rc<Self>> {
        self.children.borrow().clone()
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// The topmost ancestor (or `self` when detached).
    pub fn root(self: &Rc<Self>) -> Rc<Self> {
        let mut node = Rc::clone(self);
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// `self` followed by every ancestor up to the root.
    pub fn ancestors(self: &Rc<Self>) -> Vec<Rc<Self>> {
        let mut out = vec![Rc::clone(self)];
        let mut node = Rc::clone(self);
        while let Some(parent) = node.parent() {
            out.push(Rc::clone(&parent));
            node = parent;
        }
        out
    }

    // ── structure ─────────────────────────────────────────────────────────

    /// Appends `child`, detaching it from any previous parent first.
    ///
    /// Attaching a node below itself (directly or through its descendants)
    /// would create an ownership cycle; such calls are ignored with a warning.
    pub fn add_child(self: &Rc<Self>, child: Rc<Self>) -> Rc<Self> {
        if self.is_or_descends_from(&child) {
            log::warn!("scene: refusing to attach a node below itself");
            return child;
        }
        child.remove_from_parent();
        *child.parent.borrow_mut() = Rc::downgrade(self);
        self.children.borrow_mut().push(Rc::clone(&child));
        child
    }

    fn is_or_descends_from(self: &Rc<Self>, other: &Rc<Self>) -> bool {
        let mut node = Some(Rc::clone(self));
        while let Some(n) = node {
            if Rc::ptr_eq(&n, other) {
                return true;
            }
            node = n.parent();
        }
        false
    }

    /// Removes `child` if it is a direct child; no-op otherwise.
    pub fn remove_child(&self, child: &Rc<Self>) -> bool {
        let mut children = self.children.borrow_mut();
        let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, child)) else {
            return false;
        };
        let removed = children.remove(index);
        *removed.parent.borrow_mut() = Weak::new();
        true
    }

    pub fn remove_from_parent(self: &Rc<Self>) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self),
            None => false,
        }
    }

    pub fn clear_children(&self) {
        for child in self.children.borrow_mut().drain(..) {
            *child.parent.borrow_mut() = Weak::new();
        }
    }

    // ── traversal ─────────────────────────────────────────────────────────

    /// Pre-order walk computing global properties on the way down.
    ///
    /// The callback sees each node with `parent_global · local`. Children are
    /// snapshotted before recursing, so the callback may restructure the tree;
    /// changes take effect on the next traversal.
    pub fn depth_first_traverse<F>(self: &Rc<Self>, callback: &mut F, parent_global: &P)
    where
        F: FnMut(&Rc<Self>, &P),
    {
        let global = parent_global.applied(&self.local.borrow(), Side::Right);
        callback(self, &global);
        for child in self.children() {
            child.depth_first_traverse(callback, &global);
        }
    }

    /// [`Node::depth_first_traverse`] starting from identity.
    pub fn traverse<F>(self: &Rc<Self>, mut callback: F)
    where
        F: FnMut(&Rc<Self>, &P),
    {
        self.depth_first_traverse(&mut callback, &P::identity());
    }

    /// The global properties of `self`: every ancestor's local applied on the
    /// left, walking towards the root.
    pub fn properties_delta_to_root(&self) -> P {
        let mut acc = self.local.borrow().clone();
        let mut parent = self.parent();
        while let Some(node) = parent {
            acc.apply(&node.local.borrow(), Side::Left);
            parent = node.parent();
        }
        acc
    }

    /// Properties of `self` expressed relative to the common ancestor.
    fn delta_to_ancestor(self: &Rc<Self>, ancestor: &Rc<Self>) -> P {
        let mut acc = P::identity();
        let mut node = Rc::clone(self);
        while !Rc::ptr_eq(&node, ancestor) {
            acc.apply(&node.local.borrow(), Side::Left);
            let Some(parent) = node.parent() else {
                return P::invalid();
            };
            node = parent;
        }
        acc
    }

    /// The delta that maps `self`'s frame into `other`'s frame:
    /// `delta(other)⁻¹ · delta(self)` measured from the closest common
    /// ancestor. Invalid when the nodes share no ancestor or the placement
    /// inverse does not exist; components without an inverse (alpha) come
    /// back invalid on their own.
    pub fn properties_delta_to(self: &Rc<Self>, other: &Rc<Self>) -> P {
        let Some(common) = closest_common_ancestor(self, other) else {
            return P::invalid();
        };
        let this_delta = self.delta_to_ancestor(&common);
        let mut other_delta = other.delta_to_ancestor(&common);
        if !other_delta.invert_placement() {
            return P::invalid();
        }
        other_delta.applied(&this_delta, Side::Right)
    }
}

/// The deepest node that has both `a` and `b` in its subtree.
pub fn closest_common_ancestor<P: Property, T>(a: &Rc<Node<P, T>>, b: &Rc<Node<P, T>>) -> Option<Rc<Node<P, T>>> {
    let mut path_a = a.ancestors();
    let mut path_b = b.ancestors();
    path_a.reverse();
    path_b.reverse();

    let mut common = None;
    for (x, y) in path_a.iter().zip(path_b.iter()) {
        if !Rc::ptr_eq(x, y) {
            break;
        }
        common = Some(Rc::clone(x));
    }
    common
}

impl<P, T> Drop for Node<P, T> {
    fn drop(&mut self) {
        // Unrolls deep chains so dropping a long branch does not recurse once
        // per level.
        let mut stack: Vec<Rc<Node<P, T>>> = self.children.get_mut().drain(..).collect();
        while let Some(node) = stack.pop() {
            if let Ok(mut node) = Rc::try_unwrap(node) {
                stack.extend(node.children.get_mut().drain(..));
            }
        }
    }
}

impl<P: std::fmt::Debug, T> std::fmt::Debug for Node<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("local", &self.local.borrow())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}
