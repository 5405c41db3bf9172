//! Test fixtures: encoded images and a scripted transport.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};
use tokio::sync::Semaphore;
use url::Url;

use crate::download::{ProgressSink, Transport};
use crate::error::TransportFailure;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A 4x4 GIF with one frame per entry of `delays_ms`.
pub(crate) fn gif_bytes(delays_ms: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
            let shade = (i as u8).wrapping_mul(60);
            Frame::from_parts(
                RgbaImage::from_pixel(4, 4, Rgba([shade, 255 - shade, 0, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(ms, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }
    out
}

/// What a [`ScriptedTransport`] does for a fetch.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Writes the first half, parks, then writes everything.
    Bytes(Vec<u8>),
    /// Writes the first half, parks, then fails with a system error.
    Truncated(Vec<u8>),
    /// Custom (application) failure.
    Fail(String),
    /// System failure.
    Io(String),
    Panic,
}

/// Transport double that writes canned bytes and records what it saw.
///
/// A gated transport parks every fetch until [`ScriptedTransport::release`]
/// hands out a permit, which keeps downloads in flight while a test lines up
/// more callers. Byte replies write half of their payload before parking, so
/// a parked download has a partial file on disk.
pub(crate) struct ScriptedTransport {
    reply: Reply,
    gate: Option<Semaphore>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self::build(reply, None, None))
    }

    pub(crate) fn gated(reply: Reply) -> Arc<Self> {
        Arc::new(Self::build(reply, Some(Semaphore::new(0)), None))
    }

    fn build(reply: Reply, gate: Option<Semaphore>, delay: Option<Duration>) -> Self {
        Self {
            reply,
            gate,
            delay,
            fetches: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Ungated transport that holds every fetch for `delay`.
    pub(crate) fn delayed(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(reply, None, Some(delay)))
    }

    /// Let `n` parked fetches proceed.
    pub(crate) fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// URLs in the order their fetches started.
    pub(crate) fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, TransportFailure> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(url.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let partial = match &self.reply {
            Reply::Bytes(bytes) | Reply::Truncated(bytes) => {
                let written = tokio::fs::write(destination, &bytes[..bytes.len() / 2]).await;
                progress.report(0.5);
                written
            }
            _ => Ok(()),
        };

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match (&self.reply, partial) {
            (_, Err(e)) => Err(TransportFailure::from(e)),
            (Reply::Bytes(bytes), Ok(())) => {
                let written = tokio::fs::write(destination, bytes).await;
                progress.report(1.0);
                written
                    .map(|()| destination.to_path_buf())
                    .map_err(TransportFailure::from)
            }
            (Reply::Truncated(_), Ok(())) => {
                Err(TransportFailure::system("connection reset mid-body"))
            }
            (Reply::Fail(reason), Ok(())) => Err(TransportFailure::custom(reason)),
            (Reply::Io(reason), Ok(())) => Err(TransportFailure::system(reason.clone())),
            (Reply::Panic, Ok(())) => panic!("scripted transport panic"),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
