use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use glam::{DAffine3, DVec3, IVec2, UVec2, Vec2};
use log::debug;

use crate::config::WindowLayout;
use crate::hand::PlaneRect;
use crate::primitives::{group_node, primitive_node, ImagePrimitive, SceneNode};
use crate::property::{AffineTransform, GeometryProperties, Property};
use crate::render::{PixelFormat, Texture, TextureError};

/// Opaque OS window identifier.
pub type WindowHandle = u64;

/// One desktop window as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    /// Top-left corner in desktop pixels.
    pub position: IVec2,
    pub size: UVec2,
    /// Stacking order, 0 for the top-most window.
    pub z_order: u32,
    pub title: String,
}

/// Captured window contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// OS window enumeration and capture.
pub trait WindowSource {
    /// Windows currently on the desktop.
    fn windows(&mut self) -> Vec<WindowInfo>;

    /// Current contents of `handle`, `None` if it cannot be captured.
    fn snapshot(&mut self, handle: WindowHandle) -> Option<WindowImage>;
}

/// World-space rectangle a window occupies. Lower windows sit further back.
pub fn window_plane(layout: &WindowLayout, info: &WindowInfo) -> PlaneRect {
    let mpp = layout.meters_per_pixel;
    let size = info.size.as_vec2() * mpp;
    let top_left = info.position.as_vec2() * mpp;
    let center = layout.origin.as_dvec3()
        + DVec3::new(
            (top_left.x + size.x * 0.5) as f64,
            -(top_left.y + size.y * 0.5) as f64,
            -(info.z_order as f64) * layout.layer_spacing as f64,
        );
    PlaneRect { transform: DAffine3::from_translation(center), size }
}

struct VirtualWindow {
    info: WindowInfo,
    plane: PlaneRect,
    node: Rc<SceneNode>,
    image: Rc<RefCell<ImagePrimitive>>,
    texture: Option<Texture>,
}

/// Textured rectangles mirroring the desktop's windows.
pub struct VirtualWindows {
    layout: WindowLayout,
    root: Rc<SceneNode>,
    windows: BTreeMap<WindowHandle, VirtualWindow>,
}

impl VirtualWindows {
    pub fn new(layout: WindowLayout) -> Self {
        Self { layout, root: group_node(GeometryProperties::identity()), windows: BTreeMap::new() }
    }

    /// Parent of every window node.
    #[inline]
    pub fn node(&self) -> &Rc<SceneNode> {
        &self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn info(&self, handle: WindowHandle) -> Option<&WindowInfo> {
        self.windows.get(&handle).map(|w| &w.info)
    }

    /// Window rectangles in handle order.
    pub fn planes(&self) -> impl Iterator<Item = (WindowHandle, PlaneRect)> + '_ {
        self.windows.iter().map(|(&h, w)| (h, w.plane))
    }

    /// Adds, moves and removes window nodes to match `list`.
    pub fn sync_layout(&mut self, list: &[WindowInfo]) {
        let live: HashSet<WindowHandle> = list.iter().map(|w| w.handle).collect();
        self.windows.retain(|handle, window| {
            let keep = live.contains(handle);
            if !keep {
                debug!("window {handle} `{}` closed", window.info.title);
                window.node.remove_from_parent();
            }
            keep
        });

        for info in list {
            let plane = window_plane(&self.layout, info);
            let window = self.windows.entry(info.handle).or_insert_with(|| {
                debug!("window {} `{}` opened", info.handle, info.title);
                let (node, image) = primitive_node(ImagePrimitive::new(plane.size));
                self.root.add_child(Rc::clone(&node));
                VirtualWindow { info: info.clone(), plane, node, image, texture: None }
            });
            window.info = info.clone();
            window.plane = plane;
            window.node.set_local(GeometryProperties::from_transform(AffineTransform::new(plane.transform)));
            window.image.borrow_mut().set_size(plane.size);
        }
    }

    /// Pulls the window list and fresh captures from `source`.
    pub fn update(
        &mut self,
        source: &mut dyn WindowSource,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<(), TextureError> {
        let list = source.windows();
        self.sync_layout(&list);

        for (handle, window) in &mut self.windows {
            let Some(shot) = source.snapshot(*handle) else { continue };
            match &mut window.texture {
                Some(texture) => {
                    texture.update(device, queue, shot.width, shot.height, shot.format, &shot.data)?;
                }
                None => {
                    let label = format!("window {handle}");
                    let texture =
                        Texture::from_bytes(device, queue, &label, shot.width, shot.height, shot.format, &shot.data)?;
                    window.texture = Some(texture);
                }
            }
            if let Some(texture) = &window.texture {
                window.image.borrow_mut().set_texture(texture);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn window(handle: WindowHandle, x: i32, y: i32, z_order: u32) -> WindowInfo {
        WindowInfo {
            handle,
            position: IVec2::new(x, y),
            size: UVec2::new(800, 600),
            z_order,
            title: format!("window {handle}"),
        }
    }

    fn layout() -> WindowLayout {
        WindowLayout { meters_per_pixel: 0.001, origin: Vec3::ZERO, layer_spacing: 0.01 }
    }

    #[test]
    fn windows_hang_below_and_right_of_the_origin() {
        let plane = window_plane(&layout(), &window(1, 100, 200, 2));
        let center = plane.transform.translation;
        assert!((center - DVec3::new(0.5, -0.5, -0.02)).length() < 1e-6);
        assert!((plane.size - Vec2::new(0.8, 0.6)).length() < 1e-6);
    }

    #[test]
    fn layout_follows_the_window_list() {
        let mut windows = VirtualWindows::new(layout());
        windows.sync_layout(&[window(1, 0, 0, 0), window(2, 10, 10, 1)]);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows.node().child_count(), 2);

        let mut moved = window(2, 400, 0, 0);
        moved.title = "renamed".into();
        windows.sync_layout(&[moved]);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows.node().child_count(), 1);
        assert_eq!(windows.info(2).unwrap().title, "renamed");

        let (_, plane) = windows.planes().next().unwrap();
        assert!((plane.transform.translation.x - 0.8).abs() < 1e-6);
    }

    #[test]
    fn window_nodes_carry_their_placement() {
        let mut windows = VirtualWindows::new(layout());
        windows.sync_layout(&[window(7, 0, 0, 0)]);
        let child = &windows.node().children()[0];
        let t = child.local().transform().translation();
        assert!((t - DVec3::new(0.4, -0.3, 0.0)).length() < 1e-6);
    }
}
