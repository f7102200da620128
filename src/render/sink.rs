/// Output destinations the renderer flushes frames into.
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;
use tracing::{debug, info};

/// Presentation loop of a sink; resolves once the loop is cancelled.
pub type Presentation = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// A presentation backend. The renderer writes every cell through
/// `set_pixel` and then calls `present` once per frame.
pub trait Sink: Send {
    fn name(&self) -> &'static str;

    fn size(&self) -> (u32, u32);

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>);

    /// Show the frame written so far. May block on slow hardware.
    fn present(&mut self) -> Result<()>;

    /// Presentation/event loop, run by the bootstrap once the scheduler is
    /// going. Headless sinks just wait for Ctrl+C.
    fn start(&self) -> Presentation {
        Box::pin(async {
            info!("Press Ctrl+C to quit.");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
            Ok(())
        })
    }
}

/// Discards everything
pub struct NullSink {
    size: (u32, u32),
}

impl NullSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
        }
    }
}

impl Sink for NullSink {
    fn name(&self) -> &'static str {
        "NullSink"
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_pixel(&mut self, _x: u32, _y: u32, _color: Rgb<u8>) {}

    fn present(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory preview image, optionally saved as PNG on every present
pub struct ImageSink {
    image: RgbImage,
    output_path: Option<PathBuf>,
    frames: u64,
}

impl ImageSink {
    pub fn new(width: u32, height: u32, output_path: Option<PathBuf>) -> Self {
        Self {
            image: RgbImage::new(width, height),
            output_path,
            frames: 0,
        }
    }
}

#[cfg(test)]
impl ImageSink {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Sink for ImageSink {
    fn name(&self) -> &'static str {
        "ImageSink"
    }

    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        self.image.put_pixel(x, y, color);
    }

    fn present(&mut self) -> Result<()> {
        self.frames += 1;
        if let Some(path) = &self.output_path {
            self.image
                .save(path)
                .with_context(|| format!("Failed to save preview to {}", path.display()))?;
            debug!("Saved frame {} to {}", self.frames, path.display());
        }
        Ok(())
    }
}

/// Packed RGB frames on stdout, for piping into another process
pub struct RawSink {
    width: u32,
    height: u32,
    frame: Vec<u8>,
}

impl RawSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: vec![0; (width * height * 3) as usize],
        }
    }
}

impl Sink for RawSink {
    fn name(&self) -> &'static str {
        "RawSink"
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        let i = ((y * self.width + x) * 3) as usize;
        self.frame[i..i + 3].copy_from_slice(&color.0);
    }

    fn present(&mut self) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(&self.frame)
            .and_then(|_| stdout.flush())
            .context("Failed to write raw frame to stdout")
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// What a `RecordingSink` has seen so far
    #[derive(Debug)]
    pub struct Recording {
        pub presents: usize,
        pub frame: RgbImage,
    }

    /// Sink that records presented frames for assertions
    #[derive(Clone)]
    pub struct RecordingSink {
        pending: RgbImage,
        recording: Arc<Mutex<Recording>>,
    }

    impl RecordingSink {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                pending: RgbImage::new(width, height),
                recording: Arc::new(Mutex::new(Recording {
                    presents: 0,
                    frame: RgbImage::new(width, height),
                })),
            }
        }

        pub fn presents(&self) -> usize {
            self.recording.lock().unwrap().presents
        }

        pub fn last_frame(&self) -> RgbImage {
            self.recording.lock().unwrap().frame.clone()
        }
    }

    impl Sink for RecordingSink {
        fn name(&self) -> &'static str {
            "RecordingSink"
        }

        fn size(&self) -> (u32, u32) {
            self.pending.dimensions()
        }

        fn set_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
            self.pending.put_pixel(x, y, color);
        }

        fn present(&mut self) -> Result<()> {
            let mut recording = self.recording.lock().unwrap();
            recording.presents += 1;
            recording.frame = self.pending.clone();
            Ok(())
        }
    }
}
