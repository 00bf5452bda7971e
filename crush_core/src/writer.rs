use std::io::{Read, Write};

use log::debug;

use crate::context::CompressionContext;
use crate::error::CodecError;
use crate::stream::{EndDirective, StepOutcome, StreamSummary};

/// How each source chunk is pushed through the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Let the engine coalesce chunks for the best ratio. Output lags
    /// input; everything appears by `finish`.
    #[default]
    Coalesce,
    /// Flush after every chunk so the bytes emitted so far always form
    /// a decodable prefix. For network relays and tail-follow readers.
    PerChunk,
}

impl FlushPolicy {
    fn directive(self) -> EndDirective {
        match self {
            FlushPolicy::Coalesce => EndDirective::Continue,
            FlushPolicy::PerChunk => EndDirective::Flush,
        }
    }
}

/// Streaming compressor over an ordered byte sink.
///
/// # Write contract
/// Call [`write`](Self::write) any number of times with
/// arbitrary-sized chunks; each call loops internally until the whole
/// chunk has been accepted, so no input is ever silently dropped.
/// Call [`finish`](Self::finish) to seal the frame: it drives the
/// EndFrame directive until the engine reports nothing outstanding.
/// The concatenation of everything emitted to the sink, in order, is
/// exactly one complete frame.
pub struct FrameWriter<W: Write> {
    ctx: CompressionContext,
    sink: W,
    policy: FlushPolicy,
    summary: StreamSummary,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(ctx: CompressionContext, sink: W, policy: FlushPolicy) -> Self {
        Self {
            ctx,
            sink,
            policy,
            summary: StreamSummary::default(),
        }
    }

    /// Push one chunk through the frame, emitting any produced bytes
    /// to the sink.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), CodecError> {
        let mut offset = 0;
        loop {
            let outcome = self.ctx.step(&chunk[offset..], self.policy.directive())?;
            offset += outcome.consumed;
            self.summary.bytes_in += outcome.consumed as u64;
            self.emit(&outcome)?;
            if offset == chunk.len() && outcome.remaining == 0 {
                return Ok(());
            }
        }
    }

    /// Seal the frame and flush the sink.
    ///
    /// Returns the context (Idle again, reusable for the next frame),
    /// the sink, and the byte counters.
    pub fn finish(mut self) -> Result<(CompressionContext, W, StreamSummary), CodecError> {
        loop {
            let outcome = self.ctx.step(&[], EndDirective::EndFrame)?;
            self.emit(&outcome)?;
            if outcome.remaining == 0 {
                break;
            }
        }
        self.sink.flush().map_err(CodecError::Io)?;
        debug!(
            "sealed frame: {} bytes in, {} bytes out ({:.2}x)",
            self.summary.bytes_in,
            self.summary.bytes_out,
            self.summary.ratio()
        );
        Ok((self.ctx, self.sink, self.summary))
    }

    /// Byte counters so far.
    pub fn summary(&self) -> StreamSummary {
        self.summary
    }

    fn emit(&mut self, outcome: &StepOutcome) -> Result<(), CodecError> {
        if !outcome.output.is_empty() {
            self.sink.write_all(&outcome.output).map_err(CodecError::Io)?;
            self.summary.bytes_out += outcome.output.len() as u64;
        }
        Ok(())
    }
}

/// Compress everything `source` yields into one frame on `sink`.
///
/// Reads chunks of the engine's preferred size; chunk boundaries are
/// arbitrary and do not affect the decoded result.
pub fn compress_stream<R: Read, W: Write>(
    ctx: CompressionContext,
    source: &mut R,
    sink: W,
    policy: FlushPolicy,
) -> Result<(CompressionContext, W, StreamSummary), CodecError> {
    let mut writer = FrameWriter::new(ctx, sink, policy);
    let mut buf = vec![0u8; crush_engine::compress_chunk_hint()];
    loop {
        let n = source.read(&mut buf).map_err(CodecError::Io)?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n])?;
    }
    writer.finish()
}
