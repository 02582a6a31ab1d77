use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::warn;

use crate::render::gpu::{GpuContext, RenderTarget};

const BYTES_PER_PIXEL: u32 = 4;

/// A single frame read back from the GPU.
pub struct Frame {
    /// Raw pixel data (RGBA, tightly packed).
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Capture timestamp in microseconds since the Unix epoch.
    pub timestamp_us: u64,
}

type MapResult = std::result::Result<(), wgpu::BufferAsyncError>;

/// One in-flight readback: a staging buffer plus the completion slot the
/// `map_async` callback fills in.
struct ReadbackRequest {
    buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,
    width: u32,
    height: u32,
    timestamp_us: u64,
    mapped: Arc<Mutex<Option<MapResult>>>,
}

/// Polled queue of asynchronous GPU readbacks.
///
/// Only the front request is ever inspected; once it resolves, anything
/// queued behind it is stale and gets discarded, so at most one request is
/// actively polled at a time. A map error is logged and the frame dropped,
/// nothing is retried.
pub struct ReadbackQueue {
    requests: VecDeque<ReadbackRequest>,
    dropped: u64,
}

impl ReadbackQueue {
    pub fn new() -> Self {
        Self {
            requests: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Number of requests currently in flight.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Take and reset the dropped-frame counter.
    pub fn take_dropped(&mut self) -> u64 {
        std::mem::take(&mut self.dropped)
    }

    /// Copy the render target into a fresh staging buffer and request an
    /// asynchronous map of it.
    pub fn enqueue(&mut self, ctx: &GpuContext, target: &RenderTarget) {
        let padded_bytes_per_row = padded_bytes_per_row(target.width);
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bridgecam_readback_staging"),
            size: padded_bytes_per_row as u64 * target.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bridgecam_readback_copy"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(target.height),
                },
            },
            target.extent(),
        );
        ctx.queue.submit(Some(encoder.finish()));

        let mapped = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&mapped);
        buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            *slot.lock() = Some(result);
        });

        self.requests.push_back(ReadbackRequest {
            buffer,
            padded_bytes_per_row,
            width: target.width,
            height: target.height,
            timestamp_us: now_us(),
            mapped,
        });
    }

    /// Drive the device and check the front request.
    ///
    /// Returns a frame when the front readback completed without error.
    /// Pending requests return `None`; failed ones are logged, counted,
    /// and dropped.
    pub fn poll(&mut self, device: &wgpu::Device) -> Option<Frame> {
        if self.requests.is_empty() {
            return None;
        }
        let _ = device.poll(wgpu::PollType::Poll);

        let front_result = self.requests.front()?.mapped.lock().take();
        let map_result = front_result?; // front still in flight

        let req = self.requests.pop_front()?;
        let frame = match map_result {
            Err(e) => {
                warn!("GPU readback error detected: {e}");
                self.dropped += 1;
                None
            }
            Ok(()) => {
                let slice = req.buffer.slice(..);
                let mapped_range = slice.get_mapped_range();
                let data = unpad_rows(
                    &mapped_range,
                    (req.width * BYTES_PER_PIXEL) as usize,
                    req.padded_bytes_per_row as usize,
                    req.height as usize,
                );
                drop(mapped_range);
                req.buffer.unmap();
                Some(Frame {
                    data,
                    width: req.width,
                    height: req.height,
                    timestamp_us: req.timestamp_us,
                })
            }
        };

        // Anything queued behind the resolved front is stale.
        let stale = self.requests.len() as u64;
        if stale > 0 {
            self.requests.clear();
            self.dropped += stale;
        }

        frame
    }
}

impl Default for ReadbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Staging-buffer rows are padded to `COPY_BYTES_PER_ROW_ALIGNMENT`.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// De-pad staging-buffer rows into a tight pixel buffer.
fn unpad_rows(mapped: &[u8], unpadded: usize, padded: usize, rows: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(unpadded * rows);
    for row in 0..rows {
        let start = row * padded;
        data.extend_from_slice(&mapped[start..start + unpadded]);
    }
    data
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
