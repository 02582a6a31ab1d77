// bridgecam — renders frames offscreen, reads them back from the GPU, and
// publishes them to a rosbridge server as sensor_msgs/CompressedImage.

pub mod bridge;
pub mod config;
pub mod encode;
pub mod error;
pub mod msg;
pub mod publisher;
pub mod readback;
pub mod render;
pub mod stats;

pub use config::PublisherConfig;
pub use error::{BridgecamError, Result};
pub use publisher::{run, ImagePublisher};
pub use render::source::{RenderSource, TestPatternSource};
