use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::{Vec2, Vec3, Vec4};
use log::debug;
use resvg::usvg;
use resvg::usvg::tiny_skia_path::PathSegment;
use thiserror::Error;

use super::polygon::{bridge_holes, clean_ring, flatten_cubic, nest_rings, triangulate};
use super::shapes::MeshPrimitive;
use super::{primitive_node, Material, Primitive, SceneNode};
use crate::mesh::{DrawMode, MeshAssembler, MeshData, MeshError, PrimitiveVertex};
use crate::property::{GeometryProperties, Property};
use crate::render::RenderState;

/// Flattening tolerance in SVG user units.
pub const DEFAULT_TOLERANCE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum SvgError {
    #[error("failed to read svg `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse svg: {0}")]
    Parse(#[from] usvg::Error),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// One SVG path reduced to polylines.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgShape {
    /// Closed rings in the document's pixel space (y down).
    pub rings: Vec<Vec<Vec2>>,
    pub fill: Option<Vec4>,
    pub stroke: Option<Vec4>,
}

fn paint_color(paint: &usvg::Paint, opacity: f32) -> Vec4 {
    match paint {
        usvg::Paint::Color(c) => {
            Vec4::new(c.red as f32 / 255.0, c.green as f32 / 255.0, c.blue as f32 / 255.0, opacity)
        }
        _ => {
            debug!("svg gradient/pattern paint drawn as flat gray");
            Vec4::new(0.5, 0.5, 0.5, opacity)
        }
    }
}

fn map_point(t: &usvg::Transform, p: usvg::tiny_skia_path::Point) -> Vec2 {
    Vec2::new(t.sx * p.x + t.kx * p.y + t.tx, t.ky * p.x + t.sy * p.y + t.ty)
}

/// Flattens every segment of `path` into rings.
fn flatten_path(path: &usvg::Path, tolerance: f32) -> Vec<Vec<Vec2>> {
    let t = path.abs_transform();
    let mut rings = Vec::new();
    let mut ring: Vec<Vec2> = Vec::new();
    let mut last = Vec2::ZERO;

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                if ring.len() > 1 {
                    rings.push(std::mem::take(&mut ring));
                }
                ring.clear();
                last = map_point(&t, p);
                ring.push(last);
            }
            PathSegment::LineTo(p) => {
                last = map_point(&t, p);
                ring.push(last);
            }
            PathSegment::QuadTo(q, p) => {
                let (q, p) = (map_point(&t, q), map_point(&t, p));
                let c1 = last + (q - last) * (2.0 / 3.0);
                let c2 = p + (q - p) * (2.0 / 3.0);
                flatten_cubic(last, c1, c2, p, tolerance, &mut ring);
                last = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let p = map_point(&t, p);
                flatten_cubic(last, map_point(&t, c1), map_point(&t, c2), p, tolerance, &mut ring);
                last = p;
            }
            PathSegment::Close => {
                if ring.len() > 1 {
                    rings.push(std::mem::take(&mut ring));
                }
            }
        }
    }
    if ring.len() > 1 {
        rings.push(ring);
    }
    rings
}

fn collect(group: &usvg::Group, opacity: f32, tolerance: f32, out: &mut Vec<SvgShape>) {
    let opacity = opacity * group.opacity().get();
    for node in group.children() {
        match node {
            usvg::Node::Group(child) => collect(child, opacity, tolerance, out),
            usvg::Node::Path(path) if path.is_visible() => {
                let fill = path.fill().map(|f| paint_color(f.paint(), f.opacity().get() * opacity));
                let stroke = path.stroke().map(|s| paint_color(s.paint(), s.opacity().get() * opacity));
                if fill.is_none() && stroke.is_none() {
                    continue;
                }
                let rings = flatten_path(path, tolerance);
                if !rings.is_empty() {
                    out.push(SvgShape { rings, fill, stroke });
                }
            }
            _ => {}
        }
    }
}

/// Parses `text` into flattened shapes plus the document size.
pub fn parse_shapes(text: &str, tolerance: f32) -> Result<(Vec<SvgShape>, Vec2), SvgError> {
    let tree = usvg::Tree::from_str(text, &usvg::Options::default())?;
    let size = Vec2::new(tree.size().width(), tree.size().height());
    let mut shapes = Vec::new();
    collect(tree.root(), 1.0, tolerance, &mut shapes);
    Ok((shapes, size))
}

// ── meshing ───────────────────────────────────────────────────────────────

/// Triangulates `rings` (even-odd nesting) into a flat mesh facing +Z.
pub fn fill_mesh(rings: &[Vec<Vec2>]) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    let rings: Vec<Vec<Vec2>> = rings.iter().map(|r| clean_ring(r)).filter(|r| r.len() >= 3).collect();
    if rings.is_empty() {
        return Ok(None);
    }
    let (min, max) = rings
        .iter()
        .flatten()
        .fold((Vec2::MAX, Vec2::MIN), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = (max - min).max(Vec2::splat(f32::EPSILON));
    let vertex = |p: Vec2| {
        let uv = (p - min) / extent;
        PrimitiveVertex::new(p.extend(0.0), Vec3::Z, Vec2::new(uv.x, 1.0 - uv.y))
    };

    let mut asm = MeshAssembler::new(DrawMode::Triangles);
    for (outline, holes) in nest_rings(&rings) {
        let holes: Vec<Vec<Vec2>> = holes.iter().map(|&h| rings[h].clone()).collect();
        let ring = bridge_holes(&rings[outline], &holes);
        for [a, b, c] in triangulate(&ring) {
            asm.push_triangle(vertex(ring[a]), vertex(ring[b]), vertex(ring[c]))?;
        }
    }
    if asm.is_empty() {
        return Ok(None);
    }
    asm.build().map(Some)
}

/// A closed polyline.
pub fn stroke_mesh(ring: &[Vec2]) -> Result<Option<MeshData<PrimitiveVertex>>, MeshError> {
    let ring = clean_ring(ring);
    if ring.len() < 2 {
        return Ok(None);
    }
    let mut asm = MeshAssembler::new(DrawMode::LineLoop);
    for p in ring {
        asm.push_vertex(PrimitiveVertex::new(p.extend(0.0), Vec3::Z, Vec2::ZERO));
    }
    asm.build().map(Some)
}

// ── primitive ─────────────────────────────────────────────────────────────

fn styled(data: MeshData<PrimitiveVertex>, color: Vec4) -> MeshPrimitive {
    let mut prim = MeshPrimitive::new(data);
    let base = prim.base_mut();
    base.material = Material::flat(color);
    if color.w < 1.0 {
        base.state = RenderState::TRANSLUCENT;
    }
    prim
}

/// Vector artwork as a subtree: one child node per filled shape and one per
/// stroked ring, each with its own flat material.
pub struct SvgPrimitive {
    node: Rc<SceneNode>,
    size: Vec2,
    fills: Vec<Rc<RefCell<MeshPrimitive>>>,
    strokes: Vec<Rc<RefCell<MeshPrimitive>>>,
}

impl SvgPrimitive {
    /// Builds the subtree for `text`, scaled to `height` and centered on the
    /// origin in the XY plane (y up).
    pub fn from_str(text: &str, height: f32, tolerance: f32) -> Result<Self, SvgError> {
        let (mut shapes, doc) = parse_shapes(text, tolerance)?;
        let scale = if doc.y > 0.0 { height / doc.y } else { 1.0 };
        let half = doc * 0.5;
        for shape in &mut shapes {
            for p in shape.rings.iter_mut().flatten() {
                *p = Vec2::new(p.x - half.x, half.y - p.y) * scale;
            }
        }

        let node = SceneNode::with_local(GeometryProperties::identity(), None);
        let mut fills = Vec::new();
        let mut strokes = Vec::new();
        for shape in &shapes {
            if let Some(color) = shape.fill {
                if let Some(data) = fill_mesh(&shape.rings)? {
                    let (child, prim) = primitive_node(styled(data, color));
                    node.add_child(child);
                    fills.push(prim);
                }
            }
            if let Some(color) = shape.stroke {
                for ring in &shape.rings {
                    if let Some(data) = stroke_mesh(ring)? {
                        let (child, prim) = primitive_node(styled(data, color));
                        node.add_child(child);
                        strokes.push(prim);
                    }
                }
            }
        }
        debug!("svg: {} fills, {} strokes", fills.len(), strokes.len());
        Ok(Self { node, size: doc * scale, fills, strokes })
    }

    pub fn from_path(path: impl AsRef<Path>, height: f32) -> Result<Self, SvgError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SvgError::Io { path: path.to_owned(), source })?;
        Self::from_str(&text, height, DEFAULT_TOLERANCE)
    }

    /// Root of the subtree; attach it anywhere in the scene.
    #[inline]
    pub fn node(&self) -> &Rc<SceneNode> {
        &self.node
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[inline]
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    #[inline]
    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn set_fill_color(&self, color: Vec4) {
        for prim in &self.fills {
            prim.borrow_mut().base_mut().material.set_color(color);
        }
    }

    pub fn set_stroke_color(&self, color: Vec4) {
        for prim in &self.strokes {
            prim.borrow_mut().base_mut().material.set_color(color);
        }
    }

    pub fn set_fill_opacity(&self, opacity: f32) {
        for prim in &self.fills {
            prim.borrow_mut().base_mut().material.set_opacity(opacity);
        }
    }

    pub fn set_stroke_visible(&self, visible: bool) {
        for prim in &self.strokes {
            prim.borrow_mut().base_mut().visible = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_WITH_HOLE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <path d="M0 0 L10 0 L10 10 L0 10 Z M3 3 L3 7 L7 7 L7 3 Z" fill="#ff0000" fill-rule="evenodd"/>
    </svg>"##;

    fn area(data: &MeshData<PrimitiveVertex>) -> f32 {
        data.indices
            .chunks_exact(3)
            .map(|t| {
                let [a, b, c] = [t[0], t[1], t[2]].map(|i| Vec2::from_slice(&data.vertices[i as usize].position[..2]));
                0.5 * (b - a).perp_dot(c - a)
            })
            .sum()
    }

    #[test]
    fn sub_paths_become_holes() {
        let (shapes, size) = parse_shapes(SQUARE_WITH_HOLE, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(size, Vec2::new(10.0, 10.0));
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].rings.len(), 2);
        assert_eq!(shapes[0].fill, Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert!(shapes[0].stroke.is_none());

        let data = fill_mesh(&shapes[0].rings).unwrap().unwrap();
        assert!((area(&data).abs() - 84.0).abs() < 1e-3);
    }

    #[test]
    fn curves_flatten_into_many_points() {
        let text = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <path d="M0 5 C0 0 10 0 10 5 Z" fill="none" stroke="#000000"/>
        </svg>"##;
        let (shapes, _) = parse_shapes(text, 0.05).unwrap();
        assert!(shapes[0].rings[0].len() > 4);
        assert!(shapes[0].fill.is_none());
        assert!(shapes[0].stroke.is_some());
    }

    #[test]
    fn fill_and_stroke_are_separate_children() {
        let text = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
            <rect x="0" y="0" width="20" height="10" fill="#00ff00" stroke="#0000ff" fill-opacity="0.5"/>
        </svg>"##;
        let svg = SvgPrimitive::from_str(text, 1.0, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(svg.fill_count(), 1);
        assert_eq!(svg.stroke_count(), 1);
        assert_eq!(svg.node().child_count(), 2);
        assert_eq!(svg.size(), Vec2::new(2.0, 1.0));
        assert_eq!(svg.fills[0].borrow().base().state, RenderState::TRANSLUCENT);
        assert_eq!(svg.fills[0].borrow().base().material.color(), Vec4::new(0.0, 1.0, 0.0, 0.5));

        svg.set_stroke_visible(false);
        assert!(!svg.strokes[0].borrow().base().visible);
        assert!(svg.fills[0].borrow().base().visible);
    }

    #[test]
    fn artwork_is_centered_with_y_up() {
        let text = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <path d="M0 0 L10 0 L10 2 Z" fill="#000000"/>
        </svg>"##;
        let svg = SvgPrimitive::from_str(text, 10.0, DEFAULT_TOLERANCE).unwrap();
        let data = svg.fills[0].borrow().data().cloned().unwrap();
        // The document's top edge (y = 0) lands at +5.
        assert!(data.vertices.iter().any(|v| v.position[0] == -5.0 && v.position[1] == 5.0));
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(matches!(parse_shapes("<svg", DEFAULT_TOLERANCE), Err(SvgError::Parse(_))));
    }
}
