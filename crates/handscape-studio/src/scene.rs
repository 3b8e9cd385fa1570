//! Demo content: a small dock of icons below the virtual windows.

use std::rc::Rc;

use glam::{DVec3, Vec4};
use handscape_engine::primitives::{group_node, primitive_node, PartialDisk, Primitive, SceneNode, Sphere, SvgPrimitive};
use handscape_engine::property::{AffineTransform, GeometryProperties};

const HOME_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24">
    <path d="M3 11 L12 3 L21 11 L19 11 L19 21 L14 21 L14 15 L10 15 L10 21 L5 21 L5 11 Z" fill="#e8eef5" stroke="#5fa8ff"/>
</svg>"##;

fn placed(x: f64, y: f64, z: f64) -> GeometryProperties {
    GeometryProperties::from_transform(AffineTransform::from_translation(DVec3::new(x, y, z)))
}

/// Adds the dock under `root`.
pub fn populate(root: &Rc<SceneNode>) -> handscape_engine::Result<()> {
    let dock = root.add_child(group_node(placed(0.0, -0.25, -0.5)));

    let home = SvgPrimitive::from_str(HOME_ICON, 0.05, 0.1)?;
    home.node().set_local(placed(-0.08, 0.0, 0.0));
    dock.add_child(Rc::clone(home.node()));

    let mut ring = PartialDisk::ring(0.018, 0.025);
    ring.base_mut().material.set_color(Vec4::new(0.37, 0.66, 1.0, 1.0));
    let (ring, _) = primitive_node(ring);
    ring.set_local(placed(0.0, 0.0, 0.0));
    dock.add_child(ring);

    let mut ball = Sphere::new(0.02);
    ball.base_mut().material.set_color(Vec4::new(1.0, 0.55, 0.35, 1.0));
    let (ball, _) = primitive_node(ball);
    ball.set_local(placed(0.08, 0.0, 0.0));
    dock.add_child(ball);

    log::info!("demo scene: {} icons", dock.child_count());
    Ok(())
}
