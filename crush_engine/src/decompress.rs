use std::io;
use std::sync::Arc;
use std::time::Instant;

use zstd::stream::raw::{DParameter, Decoder, Operation};
use zstd::zstd_safe::DCtx;

use crate::metrics::MetricsSink;
use crate::EngineStatus;

/// Owned decompression context of the underlying engine.
///
/// Mirrors [`CompressHandle`](crate::CompressHandle): one `ZSTD_DCtx`
/// behind the raw streaming decoder, a scratch buffer of the engine's
/// recommended output size, and drop-time release of the context.
pub struct DecompressHandle {
    decoder: Decoder<'static>,
    scratch: Box<[u8]>,
    metrics: Arc<dyn MetricsSink>,
}

impl DecompressHandle {
    /// Allocate a fresh decompression context.
    pub fn new(metrics: Arc<dyn MetricsSink>) -> io::Result<Self> {
        let decoder = Decoder::new()?;
        Ok(Self {
            decoder,
            scratch: vec![0u8; DCtx::out_size()].into_boxed_slice(),
            metrics,
        })
    }

    /// Allocate a context with `dictionary` loaded.
    pub fn with_dictionary(dictionary: &[u8], metrics: Arc<dyn MetricsSink>) -> io::Result<Self> {
        let decoder = Decoder::with_dictionary(dictionary)?;
        Ok(Self {
            decoder,
            scratch: vec![0u8; DCtx::out_size()].into_boxed_slice(),
            metrics,
        })
    }

    /// Apply one numeric engine parameter (currently the window-log cap).
    pub fn set_parameter(&mut self, parameter: DParameter) -> io::Result<()> {
        self.decoder.set_parameter(parameter)
    }

    /// Decode as much of `input` as one scratch buffer allows,
    /// appending produced bytes to `out`.
    ///
    /// `consumed` may be less than `input.len()`; the caller retains
    /// the tail. `remaining == 0` means a frame boundary was reached
    /// and flushed; feeding further input starts the next frame.
    pub fn step(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<EngineStatus> {
        let t0 = Instant::now();
        let status = self.decoder.run_on_buffers(input, &mut self.scratch)?;
        out.extend_from_slice(&self.scratch[..status.bytes_written]);
        self.metrics
            .record("decompress.step", status.bytes_read, status.bytes_written, t0.elapsed());
        Ok(EngineStatus {
            consumed: status.bytes_read,
            remaining: status.remaining,
        })
    }

    /// Abandon the current frame and prepare for a new one. Parameters
    /// and a loaded dictionary survive.
    pub fn reset_session(&mut self) -> io::Result<()> {
        self.decoder.reinit()
    }
}

/// One-shot decompression of a single frame whose decoded size is known
/// to fit `capacity`.
pub fn decompress_buffer(
    frame: &[u8],
    capacity: usize,
    metrics: &dyn MetricsSink,
) -> io::Result<Vec<u8>> {
    let t0 = Instant::now();
    let data = zstd::bulk::decompress(frame, capacity)?;
    metrics.record("decompress.oneshot", frame.len(), data.len(), t0.elapsed());
    Ok(data)
}

/// One-shot decompression with a dictionary.
pub fn decompress_buffer_with(
    frame: &[u8],
    capacity: usize,
    dictionary: &[u8],
    metrics: &dyn MetricsSink,
) -> io::Result<Vec<u8>> {
    let t0 = Instant::now();
    let mut decompressor = zstd::bulk::Decompressor::with_dictionary(dictionary)?;
    let data = decompressor.decompress(frame, capacity)?;
    metrics.record("decompress.oneshot", frame.len(), data.len(), t0.elapsed());
    Ok(data)
}

/// Read the decompressed size recorded in a frame header.
///
/// `Ok(None)` when the producer did not record a size; streaming
/// producers usually cannot. Errors only when the bytes do not start
/// with a valid frame header.
pub fn frame_decompressed_size(frame: &[u8]) -> io::Result<Option<u64>> {
    zstd::zstd_safe::get_frame_content_size(frame)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "malformed frame header"))
}
