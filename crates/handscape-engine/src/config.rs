//! Compositor configuration.
//!
//! Every field has a working default, so a config file only needs the values
//! it changes (`#[serde(default)]` throughout).

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::hand::EvictionPolicy;

/// How eyes map onto the output surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EyeLayout {
    /// One view over the whole surface.
    #[default]
    Mono,
    /// Left eye on the left half, right eye on the right half.
    SideBySide,
}

impl EyeLayout {
    #[inline]
    pub fn eye_count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::SideBySide => 2,
        }
    }
}

/// Tracker space to world space: `rotation * p + translation`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for Registration {
    fn default() -> Self {
        // Tracker mounted on the headset facing forward: its +Y points out of
        // the face, world -Z is forward.
        Self {
            rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            translation: Vec3::new(0.0, 0.0, -0.08),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassthroughConfig {
    pub enabled: bool,
    /// Multiplied into the camera image.
    pub color_gain: Vec4,
    /// Pixels brighter than this survive the luma-mask pass.
    pub luma_threshold: f32,
    /// Apply the lens distortion map.
    pub use_distortion: bool,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self { enabled: true, color_gain: Vec4::ONE, luma_threshold: 0.6, use_distortion: true }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Distance between the eyes in meters (stereo only).
    pub interpupillary_distance: f32,
    pub eye_position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { fov_y_degrees: 90.0, near: 0.01, far: 100.0, interpupillary_distance: 0.064, eye_position: Vec3::ZERO }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandStyle {
    pub left_color: Vec4,
    pub right_color: Vec4,
}

impl Default for HandStyle {
    fn default() -> Self {
        Self { left_color: Vec4::new(0.55, 0.75, 1.0, 0.8), right_color: Vec4::new(1.0, 0.75, 0.55, 0.8) }
    }
}

/// Virtual window placement.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowLayout {
    /// Meters per desktop pixel.
    pub meters_per_pixel: f32,
    /// Where the desktop's origin (top-left) sits in world space.
    pub origin: Vec3,
    /// World distance between successive z-order layers.
    pub layer_spacing: f32,
}

impl Default for WindowLayout {
    fn default() -> Self {
        Self { meters_per_pixel: 0.0005, origin: Vec3::new(-0.5, 0.35, -0.6), layer_spacing: 0.002 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompositorConfig {
    pub eye_layout: EyeLayout,
    pub camera: CameraConfig,
    pub passthrough: PassthroughConfig,
    pub hands: HandStyle,
    pub registration: Registration,
    pub eviction: EvictionPolicy,
    pub windows: WindowLayout,
    /// Extra directories searched for `<name>.wgsl` shaders.
    pub shader_dirs: Vec<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let cfg: CompositorConfig =
            serde_json::from_str(r#"{ "eye_layout": "side_by_side", "passthrough": { "luma_threshold": 0.25 } }"#)
                .unwrap();
        assert_eq!(cfg.eye_layout, EyeLayout::SideBySide);
        assert_eq!(cfg.passthrough.luma_threshold, 0.25);
        assert!(cfg.passthrough.enabled);
        assert_eq!(cfg.eviction, EvictionPolicy::default());
        assert_eq!(cfg.eye_layout.eye_count(), 2);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = CompositorConfig::default();
        let text = serde_json::to_string(&cfg).unwrap();
        let back: CompositorConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
