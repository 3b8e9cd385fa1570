//! Handscape engine crate.
//!
//! Owns the scene graph, the shader/uniform binding layer, procedural
//! primitive meshes, hand tracking state and the per-frame compositor used by
//! the AR desktop. Platform glue (window creation, tracker SDKs, OS window
//! capture) lives in higher layers and talks to this crate through the traits
//! in [`hand`] and [`compositor`].

pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod time;

pub mod property;
pub mod scene;
pub mod shader;
pub mod mesh;
pub mod render;
pub mod resource;
pub mod primitives;
pub mod hand;
pub mod compositor;

pub use error::{Error, Result};
