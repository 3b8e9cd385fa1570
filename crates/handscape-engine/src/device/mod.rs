//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain) and its depth-stencil
//!   attachment
//! - acquiring frames and providing encoders/views for rendering

mod context;
mod depth;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use depth::DepthTexture;
pub use surface::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
