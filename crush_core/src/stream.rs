use crate::context::{CompressionContext, DecompressionContext, SessionState};
use crate::error::CodecError;

/// What a compression `step` should do with the frame after consuming
/// its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDirective {
    /// Let the engine buffer freely. Output may be empty even when the
    /// whole input was consumed. Best ratio; use while more input is
    /// coming.
    Continue,
    /// Force everything buffered out as a complete, independently
    /// decodable block. For chunk-synchronous streaming (network
    /// relays) where the peer must be able to decode what it has.
    Flush,
    /// Finalize the frame, writing the footer and checksum. Keep
    /// calling with empty input until `remaining` reaches zero; only
    /// then is the frame complete and valid.
    EndFrame,
}

/// Result of one protocol step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Bytes produced by this step, possibly empty.
    pub output: Vec<u8>,
    /// How much of the input was accepted. Anything beyond this is the
    /// caller's to resubmit; the protocol never buffers input it did
    /// not report consumed.
    pub consumed: usize,
    /// Outstanding work for the requested directive. Zero means the
    /// step fully completed; for `EndFrame` specifically, zero means
    /// the frame is sealed.
    pub remaining: usize,
}

/// Frame headers are untrusted input: a recorded decompressed size
/// guides pre-allocation only up to this cap, beyond which buffers
/// grow incrementally as real data arrives.
pub(crate) const PREALLOC_LIMIT: usize = 64 * 1024 * 1024;

/// Byte counters carried by the carryover drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamSummary {
    /// Raw bytes accepted from the caller or source.
    pub bytes_in: u64,
    /// Bytes emitted to the sink.
    pub bytes_out: u64,
}

impl StreamSummary {
    /// Compression ratio, `bytes_in / bytes_out`. Above 1.0 means the
    /// output is smaller (compression); below 1.0 means it grew.
    pub fn ratio(&self) -> f64 {
        if self.bytes_out == 0 {
            return 1.0;
        }
        self.bytes_in as f64 / self.bytes_out as f64
    }
}

impl CompressionContext {
    /// Advance the current frame with `input` under `directive`.
    ///
    /// State machine: a step that accepts bytes moves the session to
    /// MidFrame; an `EndFrame` step whose `remaining` reaches zero
    /// returns it to Idle. An engine failure poisons the session
    /// (NeedsReset) and is terminal for the current frame.
    pub fn step(
        &mut self,
        input: &[u8],
        directive: EndDirective,
    ) -> Result<StepOutcome, CodecError> {
        if self.state == SessionState::NeedsReset {
            return Err(CodecError::InvalidInput(
                "context poisoned by an earlier stream failure; session-and-parameters reset required"
                    .into(),
            ));
        }
        let mut output = Vec::new();
        match self.step_engine(input, directive, &mut output) {
            Ok((consumed, remaining)) => Ok(StepOutcome {
                output,
                consumed,
                remaining,
            }),
            Err(err) => {
                self.state = SessionState::NeedsReset;
                Err(CodecError::from_stream_compress(err))
            }
        }
    }

    fn step_engine(
        &mut self,
        input: &[u8],
        directive: EndDirective,
        output: &mut Vec<u8>,
    ) -> std::io::Result<(usize, usize)> {
        match directive {
            EndDirective::Continue => {
                let status = self.handle.step(input, output)?;
                if status.consumed > 0 {
                    self.state = SessionState::MidFrame;
                }
                // Buffered input is the engine's own; nothing is
                // outstanding for a Continue step.
                Ok((status.consumed, 0))
            }
            EndDirective::Flush => {
                let status = self.handle.step(input, output)?;
                let mut remaining = self.handle.flush(output)?;
                if status.consumed > 0 || !output.is_empty() {
                    self.state = SessionState::MidFrame;
                }
                if status.consumed < input.len() {
                    // The engine would not take the whole chunk this
                    // call; the caller must come back regardless of how
                    // empty the internal buffer looks.
                    remaining = remaining.max(1);
                }
                Ok((status.consumed, remaining))
            }
            EndDirective::EndFrame => {
                let status = self.handle.step(input, output)?;
                if status.consumed < input.len() {
                    self.state = SessionState::MidFrame;
                    return Ok((status.consumed, status.remaining.max(1)));
                }
                let remaining = self.handle.end_frame(output)?;
                self.state = if remaining == 0 {
                    SessionState::Idle
                } else {
                    SessionState::MidFrame
                };
                Ok((status.consumed, remaining))
            }
        }
    }

    /// Compress `data` into one complete frame on this session.
    ///
    /// Requires an Idle session and returns it to Idle, so the call is
    /// repeatable and honours the session's level, parameters, and
    /// loaded dictionary. Internally this drives the streaming
    /// protocol to convergence.
    pub fn compress(&mut self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if self.state == SessionState::NeedsReset {
            return Err(CodecError::InvalidInput(
                "context poisoned by an earlier stream failure; session-and-parameters reset required"
                    .into(),
            ));
        }
        if self.state != SessionState::Idle {
            return Err(CodecError::InvalidInput(
                "a frame is already in progress; finish it or reset before one-shot compression"
                    .into(),
            ));
        }
        let mut frame = Vec::new();
        let mut offset = 0;
        loop {
            let outcome = self.step(&data[offset..], EndDirective::EndFrame)?;
            offset += outcome.consumed;
            frame.extend_from_slice(&outcome.output);
            if offset == data.len() && outcome.remaining == 0 {
                break;
            }
        }
        Ok(frame)
    }
}

impl DecompressionContext {
    /// Decode as much of `input` as one engine call allows.
    ///
    /// There is no directive: the engine consumes what its internal
    /// output buffer permits and reports it. The caller keeps
    /// `input[consumed..]` for the next call; when the source is
    /// external that bookkeeping is [`FrameReader`](crate::FrameReader)'s
    /// job. `remaining == 0` marks a frame boundary; feeding further
    /// input starts the next frame.
    pub fn step(&mut self, input: &[u8]) -> Result<StepOutcome, CodecError> {
        if self.state == SessionState::NeedsReset {
            return Err(CodecError::InvalidInput(
                "context poisoned by an earlier stream failure; session-and-parameters reset required"
                    .into(),
            ));
        }
        let mut output = Vec::new();
        match self.handle.step(input, &mut output) {
            Ok(status) => {
                if status.remaining == 0 {
                    self.state = SessionState::Idle;
                } else if status.consumed > 0 || !output.is_empty() {
                    self.state = SessionState::MidFrame;
                }
                Ok(StepOutcome {
                    output,
                    consumed: status.consumed,
                    remaining: status.remaining,
                })
            }
            Err(err) => {
                self.state = SessionState::NeedsReset;
                Err(CodecError::from_stream_decompress(err))
            }
        }
    }

    /// Decompress one or more complete, concatenated frames held fully
    /// in memory.
    ///
    /// Requires an Idle session and returns it to Idle. Truncated
    /// input surfaces as [`CodecError::DecompressionStalled`] rather
    /// than looping.
    pub fn decompress(&mut self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if self.state == SessionState::NeedsReset {
            return Err(CodecError::InvalidInput(
                "context poisoned by an earlier stream failure; session-and-parameters reset required"
                    .into(),
            ));
        }
        if self.state != SessionState::Idle {
            return Err(CodecError::InvalidInput(
                "a frame is already in progress; finish it or reset before one-shot decompression"
                    .into(),
            ));
        }
        let capacity = crush_engine::frame_decompressed_size(data)
            .ok()
            .flatten()
            .map(|n| n.min(PREALLOC_LIMIT as u64) as usize)
            .unwrap_or(0);
        let mut out = Vec::with_capacity(capacity);

        let mut offset = 0;
        let mut zero_progress = 0u8;
        while offset < data.len() {
            let outcome = self.step(&data[offset..])?;
            offset += outcome.consumed;
            if outcome.consumed == 0 && outcome.output.is_empty() {
                zero_progress += 1;
                if zero_progress == 2 {
                    return Err(CodecError::DecompressionStalled(data.len() - offset));
                }
            } else {
                zero_progress = 0;
            }
            out.extend_from_slice(&outcome.output);
        }

        // The input is gone but the engine may still hold flushable
        // output when the last step was output-bound.
        while self.state == SessionState::MidFrame {
            let outcome = self.step(&[])?;
            out.extend_from_slice(&outcome.output);
            if outcome.output.is_empty() {
                break;
            }
        }
        if self.state == SessionState::MidFrame {
            // All bytes accepted, frame never closed: truncated source.
            return Err(CodecError::DecompressionStalled(0));
        }
        Ok(out)
    }
}
