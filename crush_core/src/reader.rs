use std::io::{Read, Write};

use log::debug;

use crate::context::{DecompressionContext, SessionState};
use crate::error::CodecError;
use crate::stream::{StepOutcome, StreamSummary};

/// Streaming decompressor over an external chunked byte source.
///
/// The source yields chunks at whatever boundaries the transport
/// chose (file reads, HTTP body pieces); those boundaries almost never
/// line up with the engine's appetite per call. This driver owns the
/// carryover discipline: whatever a step leaves unconsumed is retained
/// and prepended to the next chunk, and is never silently dropped.
///
/// # Stall handling
/// When the source ends, the remaining carryover is drained with
/// repeated steps. Two consecutive steps that make zero progress
/// (nothing consumed, nothing produced), or a source that ends while a
/// frame is still open, mean the input was truncated or corrupt and
/// fail with [`CodecError::DecompressionStalled`]; the driver never
/// loops forever. Concatenated frames are decoded back to back.
pub struct FrameReader<R: Read> {
    ctx: DecompressionContext,
    source: R,
    chunk: Box<[u8]>,
    unconsumed: Vec<u8>,
    summary: StreamSummary,
}

impl<R: Read> FrameReader<R> {
    /// Wrap `source`, reading chunks of the engine's preferred size.
    pub fn new(ctx: DecompressionContext, source: R) -> Self {
        Self::with_chunk_size(ctx, source, crush_engine::decompress_chunk_hint())
    }

    /// Wrap `source` with an explicit read-chunk size (useful in tests
    /// and for transports with a fixed frame size).
    pub fn with_chunk_size(ctx: DecompressionContext, source: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0);
        Self {
            ctx,
            source,
            chunk: vec![0u8; chunk_size].into_boxed_slice(),
            unconsumed: Vec::new(),
            summary: StreamSummary::default(),
        }
    }

    /// Decompress the whole source into `sink`.
    pub fn decompress_to<W: Write>(&mut self, sink: &mut W) -> Result<StreamSummary, CodecError> {
        loop {
            let n = self.source.read(&mut self.chunk).map_err(CodecError::Io)?;
            if n == 0 {
                break;
            }
            self.summary.bytes_in += n as u64;

            // Carryover from the previous read is prepended before the
            // engine sees the new chunk.
            let outcome = if self.unconsumed.is_empty() {
                let outcome = self.ctx.step(&self.chunk[..n])?;
                self.unconsumed
                    .extend_from_slice(&self.chunk[outcome.consumed..n]);
                outcome
            } else {
                self.unconsumed.extend_from_slice(&self.chunk[..n]);
                let outcome = self.ctx.step(&self.unconsumed)?;
                self.unconsumed.drain(..outcome.consumed);
                outcome
            };
            self.emit(sink, &outcome)?;
        }

        self.drain(sink)?;
        debug!(
            "decompressed stream: {} bytes in, {} bytes out",
            self.summary.bytes_in, self.summary.bytes_out
        );
        Ok(self.summary)
    }

    /// Drain the carryover after the source is exhausted, detecting
    /// stalls instead of spinning.
    fn drain<W: Write>(&mut self, sink: &mut W) -> Result<(), CodecError> {
        let mut zero_progress = 0u8;
        while !self.unconsumed.is_empty() {
            let outcome = self.ctx.step(&self.unconsumed)?;
            if outcome.consumed == 0 && outcome.output.is_empty() {
                zero_progress += 1;
                if zero_progress == 2 {
                    return Err(CodecError::DecompressionStalled(self.unconsumed.len()));
                }
            } else {
                zero_progress = 0;
                self.unconsumed.drain(..outcome.consumed);
            }
            self.emit(sink, &outcome)?;
        }

        // Input fully consumed; the engine may still hold flushable
        // output from an output-bound final step.
        while self.ctx.state() == SessionState::MidFrame {
            let outcome = self.ctx.step(&[])?;
            self.emit(sink, &outcome)?;
            if outcome.output.is_empty() {
                break;
            }
        }
        if self.ctx.state() == SessionState::MidFrame {
            // Every byte was accepted but the frame never closed:
            // the source was cut off.
            return Err(CodecError::DecompressionStalled(0));
        }
        Ok(())
    }

    fn emit<W: Write>(&mut self, sink: &mut W, outcome: &StepOutcome) -> Result<(), CodecError> {
        if !outcome.output.is_empty() {
            sink.write_all(&outcome.output).map_err(CodecError::Io)?;
            self.summary.bytes_out += outcome.output.len() as u64;
        }
        Ok(())
    }

    /// Byte counters so far.
    pub fn summary(&self) -> StreamSummary {
        self.summary
    }

    /// Recover the context (Idle if the stream decoded cleanly).
    pub fn into_context(self) -> DecompressionContext {
        self.ctx
    }
}

/// Decompress everything `source` yields into `sink`.
pub fn decompress_stream<R: Read, W: Write>(
    ctx: DecompressionContext,
    source: R,
    sink: &mut W,
) -> Result<(DecompressionContext, StreamSummary), CodecError> {
    let mut reader = FrameReader::new(ctx, source);
    let summary = reader.decompress_to(sink)?;
    Ok((reader.into_context(), summary))
}
