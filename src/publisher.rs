use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::bridge::{spawn_publisher, BridgeClient};
use crate::config::PublisherConfig;
use crate::encode;
use crate::error::Result;
use crate::msg::{CompressedImage, Header, TimeStamp};
use crate::readback::{Frame, ReadbackQueue};
use crate::render::gpu::{GpuContext, RenderTarget};
use crate::render::source::RenderSource;
use crate::stats::{FrameStats, StatsSnapshot};

/// How often the run loop logs a stats line.
const STATS_PERIOD: Duration = Duration::from_secs(10);

/// Bounded depth of the channel feeding the bridge task.
const CHANNEL_DEPTH: usize = 8;

/// The image publisher pipeline: render target, readback queue, encoder.
///
/// Call `tick` once per loop iteration to capture (on every
/// `capture_divisor`-th frame) and `poll` to collect a finished message.
pub struct ImagePublisher {
    ctx: GpuContext,
    target: RenderTarget,
    source: Box<dyn RenderSource>,
    readback: ReadbackQueue,
    stats: FrameStats,
    config: PublisherConfig,
    seq: u32,
}

impl ImagePublisher {
    /// Create the pipeline, bringing up the GPU device.
    pub fn new(config: PublisherConfig, source: Box<dyn RenderSource>) -> Result<Self> {
        let config = config.normalised();
        let ctx = GpuContext::new()?;
        let target = RenderTarget::new(&ctx.device, config.width, config.height);
        Ok(Self {
            ctx,
            target,
            source,
            readback: ReadbackQueue::new(),
            stats: FrameStats::new(),
            config,
            seq: 0,
        })
    }

    /// Render and enqueue a readback if this tick is a capture tick.
    pub fn tick(&mut self, frame: u64) {
        if !should_capture(frame, self.config.capture_divisor) {
            return;
        }
        self.source.render(&self.ctx, &self.target, frame);
        self.readback.enqueue(&self.ctx, &self.target);
    }

    /// Drive the readback queue and encode a completed frame, if any.
    pub fn poll(&mut self) -> Result<Option<CompressedImage>> {
        let frame = self.readback.poll(&self.ctx.device);
        self.stats.add_drops(self.readback.take_dropped());
        let Some(frame) = frame else {
            return Ok(None);
        };
        encode_sequenced(&frame, &self.config, &mut self.seq).map(Some)
    }

    /// Record a message as delivered to the bridge task.
    pub fn record_published(&mut self, bytes: usize) {
        self.stats.record_publish(bytes);
    }

    /// Record a message dropped before delivery.
    pub fn record_drop(&mut self) {
        self.stats.record_drop();
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// Capture on every `divisor`-th frame, starting at frame 0.
fn should_capture(frame: u64, divisor: u32) -> bool {
    frame % divisor.max(1) as u64 == 0
}

/// Encode a frame under the next sequence number, stamping the header with
/// the capture timestamp. `seq` only advances when encoding succeeds, so
/// published messages stay gap-free.
fn encode_sequenced(
    frame: &Frame,
    config: &PublisherConfig,
    seq: &mut u32,
) -> Result<CompressedImage> {
    let header = Header {
        seq: seq.wrapping_add(1),
        stamp: TimeStamp::from_micros(frame.timestamp_us),
        frame_id: config.frame_id.clone(),
    };
    let image = encode_frame(frame, config, header)?;
    *seq = seq.wrapping_add(1);
    Ok(image)
}

/// Convert a readback frame into a CompressedImage, downscaling first when
/// the configured publish size differs from the render size.
fn encode_frame(frame: &Frame, config: &PublisherConfig, header: Header) -> Result<CompressedImage> {
    let rgb = encode::rgba_to_rgb(&frame.data);
    let (publish_w, publish_h) = config.publish_size();
    let data = if (publish_w, publish_h) != (frame.width, frame.height) {
        encode::downscale_jpeg(
            &rgb,
            frame.width,
            frame.height,
            publish_w,
            publish_h,
            config.quality,
        )?
    } else {
        encode::compress_jpeg(&rgb, frame.width, frame.height, config.quality)?
    };
    Ok(CompressedImage {
        header,
        format: "jpeg".to_string(),
        data,
    })
}

/// The explicit render loop: tick at the configured frame rate, publish
/// completed frames to the bridge task, stop on ctrl-c.
pub async fn run(config: PublisherConfig, source: Box<dyn RenderSource>) -> Result<()> {
    let config = config.normalised();

    let mut client = BridgeClient::connect(&config.bridge_url).await?;
    client.advertise(&config.topic).await?;
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let bridge_task = spawn_publisher(client, config.topic.clone(), rx);

    let mut publisher = ImagePublisher::new(config.clone(), source)?;
    info!(
        "publishing {}x{} at {} fps (capture every {} ticks) on {}",
        config.width, config.height, config.frame_rate, config.capture_divisor, config.topic
    );

    let mut interval = tokio::time::interval(config.update_period());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut frame: u64 = 0;
    let mut last_stats = Instant::now();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("shutting down");
                break;
            }
            _ = interval.tick() => {
                publisher.tick(frame);
                frame += 1;

                match publisher.poll() {
                    Ok(Some(msg)) => {
                        let bytes = msg.data.len();
                        match tx.try_send(msg) {
                            Ok(()) => publisher.record_published(bytes),
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                warn!("bridge channel full, dropping frame");
                                publisher.record_drop();
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                error!("bridge task stopped, exiting");
                                break;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("frame encode failed: {e}"),
                }

                if last_stats.elapsed() >= STATS_PERIOD {
                    let snap = publisher.stats();
                    info!(
                        "published {} frames ({:.1} fps, {} dropped, {:.1} kB/s)",
                        snap.published,
                        snap.fps,
                        snap.dropped,
                        snap.bandwidth_bps as f64 / 1000.0
                    );
                    last_stats = Instant::now();
                }
            }
        }
    }

    drop(tx);
    let _ = bridge_task.await;
    Ok(())
}
