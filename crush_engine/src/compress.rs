use std::io;
use std::sync::Arc;
use std::time::Instant;

use zstd::stream::raw::{CParameter, Encoder, Operation, OutBuffer};
use zstd::zstd_safe::CCtx;

use crate::metrics::MetricsSink;
use crate::EngineStatus;

/// Owned compression context of the underlying engine.
///
/// Wraps one `ZSTD_CCtx` behind the zstd crate's raw streaming encoder.
/// The handle carries a scratch buffer of the engine's recommended
/// output size; every call drains the scratch into the caller's `Vec`,
/// so produced bytes are never held back between calls. Freeing the
/// engine context happens on drop.
pub struct CompressHandle {
    encoder: Encoder<'static>,
    scratch: Box<[u8]>,
    metrics: Arc<dyn MetricsSink>,
}

impl CompressHandle {
    /// Allocate a context configured at `level`.
    pub fn new(level: i32, metrics: Arc<dyn MetricsSink>) -> io::Result<Self> {
        let encoder = Encoder::new(level)?;
        Ok(Self {
            encoder,
            scratch: vec![0u8; CCtx::out_size()].into_boxed_slice(),
            metrics,
        })
    }

    /// Allocate a context configured at `level` with `dictionary` loaded.
    pub fn with_dictionary(
        level: i32,
        dictionary: &[u8],
        metrics: Arc<dyn MetricsSink>,
    ) -> io::Result<Self> {
        let encoder = Encoder::with_dictionary(level, dictionary)?;
        Ok(Self {
            encoder,
            scratch: vec![0u8; CCtx::out_size()].into_boxed_slice(),
            metrics,
        })
    }

    /// Apply one numeric engine parameter (checksum flag, window log, …).
    pub fn set_parameter(&mut self, parameter: CParameter) -> io::Result<()> {
        self.encoder.set_parameter(parameter)
    }

    /// Feed `input` into the current frame, appending any produced
    /// bytes to `out`.
    ///
    /// The engine is free to buffer internally: `out` growing by zero
    /// bytes while the whole input was consumed is normal. Unconsumed
    /// input (`consumed < input.len()`) must be resubmitted by the
    /// caller on the next call.
    pub fn step(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<EngineStatus> {
        let t0 = Instant::now();
        let status = self.encoder.run_on_buffers(input, &mut self.scratch)?;
        out.extend_from_slice(&self.scratch[..status.bytes_written]);
        self.metrics
            .record("compress.step", status.bytes_read, status.bytes_written, t0.elapsed());
        Ok(EngineStatus {
            consumed: status.bytes_read,
            remaining: status.remaining,
        })
    }

    /// Force buffered output out as a complete block, appending to `out`.
    ///
    /// Returns the number of bytes still buffered inside the engine;
    /// nonzero means call again.
    pub fn flush(&mut self, out: &mut Vec<u8>) -> io::Result<usize> {
        let t0 = Instant::now();
        let mut dst = OutBuffer::around(&mut self.scratch[..]);
        let remaining = self.encoder.flush(&mut dst)?;
        let written = dst.pos();
        out.extend_from_slice(&self.scratch[..written]);
        self.metrics.record("compress.flush", 0, written, t0.elapsed());
        Ok(remaining)
    }

    /// Write the frame epilogue (footer and, if enabled, checksum),
    /// appending to `out`.
    ///
    /// Returns the number of bytes still to drain; the frame is valid
    /// only once this reaches zero.
    pub fn end_frame(&mut self, out: &mut Vec<u8>) -> io::Result<usize> {
        let t0 = Instant::now();
        let mut dst = OutBuffer::around(&mut self.scratch[..]);
        let remaining = self.encoder.finish(&mut dst, false)?;
        let written = dst.pos();
        out.extend_from_slice(&self.scratch[..written]);
        self.metrics.record("compress.end", 0, written, t0.elapsed());
        Ok(remaining)
    }

    /// Discard any in-progress frame state. Parameters and a loaded
    /// dictionary survive; only the session resets.
    pub fn reset_session(&mut self) -> io::Result<()> {
        self.encoder.reinit()
    }
}

/// One-shot buffer-to-buffer compression of a single frame.
pub fn compress_buffer(data: &[u8], level: i32, metrics: &dyn MetricsSink) -> io::Result<Vec<u8>> {
    let t0 = Instant::now();
    let frame = zstd::bulk::compress(data, level)?;
    metrics.record("compress.oneshot", data.len(), frame.len(), t0.elapsed());
    Ok(frame)
}

/// One-shot compression with a dictionary.
pub fn compress_buffer_with(
    data: &[u8],
    level: i32,
    dictionary: &[u8],
    metrics: &dyn MetricsSink,
) -> io::Result<Vec<u8>> {
    let t0 = Instant::now();
    let mut compressor = zstd::bulk::Compressor::with_dictionary(level, dictionary)?;
    let frame = compressor.compress(data)?;
    metrics.record("compress.oneshot", data.len(), frame.len(), t0.elapsed());
    Ok(frame)
}
