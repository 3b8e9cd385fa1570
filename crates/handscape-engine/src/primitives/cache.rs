use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::mesh::{Mesh, MeshData, MeshError, Vertex};

/// A lazily rebuilt mesh plus its dirty flag.
///
/// Shape setters call [`MeshCache::set`]; the next draw calls
/// [`MeshCache::get_or_rebuild`], which regenerates only when something
/// changed. A builder returning `None` (degenerate parameters) caches "no
/// mesh" and the shape draws nothing.
#[derive(Debug)]
pub struct MeshCache {
    label: String,
    mesh: RefCell<Option<Rc<Mesh>>>,
    dirty: Cell<bool>,
    rebuilds: Cell<u32>,
}

impl MeshCache {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), mesh: RefCell::new(None), dirty: Cell::new(true), rebuilds: Cell::new(0) }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    #[cfg(test)]
    pub(crate) fn mark_clean(&self) {
        self.dirty.set(false);
    }

    /// How many times the mesh has been regenerated.
    #[inline]
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds.get()
    }

    /// Stores `value` into `slot` and marks the cache dirty, unless the value
    /// is unchanged. Returns whether anything changed.
    pub fn set<T: PartialEq>(&self, slot: &mut T, value: T) -> bool {
        if *slot == value {
            return false;
        }
        *slot = value;
        self.mark_dirty();
        true
    }

    /// The cached mesh, regenerated first when dirty.
    pub fn get_or_rebuild<V, F>(&self, device: &wgpu::Device, build: F) -> Result<Option<Rc<Mesh>>, MeshError>
    where
        V: Vertex,
        F: FnOnce() -> Result<Option<MeshData<V>>, MeshError>,
    {
        if self.dirty.get() {
            // Drop the stale mesh first so a failed rebuild leaves nothing.
            *self.mesh.borrow_mut() = None;
            let data = build()?;
            *self.mesh.borrow_mut() = data.map(|d| Rc::new(Mesh::from_data(device, self.label.as_str(), &d)));
            self.dirty.set(false);
            self.rebuilds.set(self.rebuilds.get() + 1);
        }
        Ok(self.mesh.borrow().clone())
    }
}
