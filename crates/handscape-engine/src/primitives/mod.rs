//! Drawable shapes.
//!
//! Every shape implements [`Primitive`] and carries a [`PrimitiveBase`]
//! (shader, material, render flags). Shapes whose geometry depends on
//! per-instance parameters keep a [`MeshCache`]; fixed shapes scale a unit
//! mesh shared through the [`ResourceCache`](crate::resource::ResourceCache).
//!
//! Primitives hang off [`SceneNode`]s and are drawn by [`draw_scene`].

mod cache;
pub mod geometry;
mod material;
pub mod polygon;
mod radial_polygon;
mod shapes;
mod svg;
mod textured_frame;

pub use cache::MeshCache;
pub use geometry::UnitMesh;
pub use material::{Material, DIFFUSE_TEXTURE};
pub use radial_polygon::{joint_turns, rounded_polygon, RadialPolygonPrim};
pub use shapes::{
    BiCapsulePrim, BoxPrim, CapsulePrim, Cylinder, Disk, ImagePrimitive, MeshPrimitive, PartialCylinder, PartialDisk,
    PartialSphere, RectanglePrim, Sphere,
};
pub use svg::{SvgError, SvgPrimitive, SvgShape};
pub use textured_frame::{frame_edges, EdgeOffsets, TexturedFrame};

use std::borrow::Cow;
use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use glam::DAffine3;
use log::warn;

use crate::mesh::{MeshData, MeshError, PrimitiveVertex};
use crate::property::{GeometryProperties, Property};
use crate::render::{DrawContext, RenderState};
use crate::resource::{ResourceCache, PRIMITIVE_SHADER};
use crate::scene::Node;
use crate::shader::Shader;

/// Something that can queue draws for itself.
pub trait Primitive {
    fn base(&self) -> &PrimitiveBase;

    fn base_mut(&mut self) -> &mut PrimitiveBase;

    /// Queues this primitive's meshes. Called with the node's global
    /// properties already set on `ctx`.
    fn draw_contents(&self, ctx: &mut DrawContext<'_>) -> crate::Result<()>;
}

/// State every primitive shares: shader, material and render flags.
///
/// The shader is looked up by name on first draw, so primitives can be
/// built before (or without) a GPU device.
pub struct PrimitiveBase {
    shader_name: Cow<'static, str>,
    shader: OnceCell<Rc<Shader>>,
    pub material: Material,
    pub state: RenderState,
    pub visible: bool,
}

impl Default for PrimitiveBase {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitiveBase {
    pub fn new() -> Self {
        Self {
            shader_name: Cow::Borrowed(PRIMITIVE_SHADER),
            shader: OnceCell::new(),
            material: Material::new(),
            state: RenderState::SCENE,
            visible: true,
        }
    }

    /// Base that draws with an already compiled shader.
    pub fn with_shader(shader: Rc<Shader>) -> Self {
        let name = shader.label().to_owned();
        Self { shader_name: Cow::Owned(name), shader: OnceCell::from(shader), ..Self::new() }
    }

    #[inline]
    pub fn shader_name(&self) -> &str {
        &self.shader_name
    }

    /// Switches to another library shader; resolved again on the next draw.
    pub fn set_shader_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.shader_name = name.into();
        self.shader = OnceCell::new();
    }

    /// The resolved shader, falling back to the dummy shader when `name`
    /// fails to load.
    pub fn shader(&self, resources: &ResourceCache) -> Rc<Shader> {
        Rc::clone(self.shader.get_or_init(|| resources.shader(&self.shader_name)))
    }
}

impl std::fmt::Debug for PrimitiveBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveBase")
            .field("shader", &self.shader_name)
            .field("material", &self.material)
            .field("state", &self.state)
            .field("visible", &self.visible)
            .finish()
    }
}

// ── draw helpers ──────────────────────────────────────────────────────────

/// Draws a cached mesh, rebuilding it first when dirty.
pub(crate) fn draw_cached<F>(ctx: &mut DrawContext<'_>, base: &PrimitiveBase, cache: &MeshCache, build: F) -> crate::Result<()>
where
    F: FnOnce() -> Result<Option<MeshData<PrimitiveVertex>>, MeshError>,
{
    if let Some(mesh) = cache.get_or_rebuild(ctx.device(), build)? {
        ctx.submit(base, &mesh)?;
    }
    Ok(())
}

/// Draws a shared unit mesh under an extra local transform.
pub(crate) fn draw_unit(ctx: &mut DrawContext<'_>, base: &PrimitiveBase, kind: UnitMesh, local: DAffine3) -> crate::Result<()> {
    let mesh = ctx.resources().unit_mesh(kind)?;
    ctx.submit_with(base, &mesh, local)
}

// ── scene graph ───────────────────────────────────────────────────────────

pub type PrimitiveHandle = Rc<RefCell<dyn Primitive>>;

/// Scene node: geometry properties plus an optional primitive. Nodes without
/// a primitive group their children.
pub type SceneNode = Node<GeometryProperties, Option<PrimitiveHandle>>;

/// A detached node carrying `primitive`, plus a typed handle to it.
pub fn primitive_node<P: Primitive + 'static>(primitive: P) -> (Rc<SceneNode>, Rc<RefCell<P>>) {
    let typed = Rc::new(RefCell::new(primitive));
    let handle: PrimitiveHandle = typed.clone();
    (SceneNode::new(Some(handle)), typed)
}

/// An empty grouping node.
pub fn group_node(properties: GeometryProperties) -> Rc<SceneNode> {
    SceneNode::with_local(properties, None)
}

/// Draws every visible primitive under `root` in traversal order.
///
/// A primitive that fails to draw is logged and skipped; the return value
/// counts those failures.
pub fn draw_scene(root: &Rc<SceneNode>, ctx: &mut DrawContext<'_>) -> usize {
    let mut failures = 0;
    root.traverse(|node, global| {
        let Some(handle) = node.payload() else {
            return;
        };
        let primitive = handle.borrow();
        if !primitive.base().visible {
            return;
        }
        ctx.set_properties(global.clone());
        if let Err(err) = primitive.draw_contents(ctx) {
            warn!("primitive failed to draw: {err}");
            failures += 1;
        }
    });
    ctx.set_properties(GeometryProperties::identity());
    failures
}
