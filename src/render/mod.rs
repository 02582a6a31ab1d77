// Render domain — headless GPU context, offscreen target, frame sources.

pub mod gpu;
pub mod source;
