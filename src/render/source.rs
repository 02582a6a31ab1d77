use bytemuck::{Pod, Zeroable};

use crate::render::gpu::{GpuContext, RenderTarget};

/// A frame source — the seam where a host renderer plugs in.
///
/// Implementations draw one frame into the target; the pipeline then reads
/// the target back and publishes it. A real application would back this
/// with its scene camera; `TestPatternSource` stands in when there is no
/// host renderer.
pub trait RenderSource: Send {
    /// Draw frame `frame` into the target.
    fn render(&mut self, ctx: &GpuContext, target: &RenderTarget, frame: u64);
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct Rgba {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

/// Built-in source that uploads a moving gradient.
///
/// Deliberately shader-free: the pattern is generated on the CPU and
/// uploaded with `write_texture`, which keeps the source usable on
/// fallback adapters and makes readback output predictable in tests.
pub struct TestPatternSource {
    pixels: Vec<Rgba>,
}

impl TestPatternSource {
    pub fn new() -> Self {
        Self { pixels: Vec::new() }
    }

    /// Fill the scratch buffer with the pattern for the given frame.
    fn fill(&mut self, width: u32, height: u32, frame: u64) {
        self.pixels.clear();
        self.pixels
            .reserve((width as usize) * (height as usize));
        let shift = (frame % 256) as u32;
        for y in 0..height {
            for x in 0..width {
                self.pixels.push(Rgba {
                    r: ((x + shift) % 256) as u8,
                    g: (y % 256) as u8,
                    b: ((x + y) % 256) as u8,
                    a: 255,
                });
            }
        }
    }
}

impl Default for TestPatternSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSource for TestPatternSource {
    fn render(&mut self, ctx: &GpuContext, target: &RenderTarget, frame: u64) {
        self.fill(target.width, target.height, frame);
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&self.pixels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * target.width),
                rows_per_image: Some(target.height),
            },
            target.extent(),
        );
    }
}
