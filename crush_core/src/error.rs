use std::io;

use thiserror::Error;

/// Unified error type for every session, streaming, and training
/// operation.
///
/// Creation failures are raised before any engine resource is
/// allocated. Mid-stream engine failures poison the context's current
/// frame; the context reports the failure once and then rejects
/// further work until a session-and-parameters reset. Stalls are kept
/// distinct from engine failures: a stall means the caller's source
/// was truncated or corrupt, not that the protocol misbehaved.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid compression level {level} (supported range {min}..={max})")]
    InvalidCompressionLevel { level: i32, min: i32, max: i32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("stream compression failed: {0}")]
    StreamCompressionFailed(String),

    #[error("stream decompression failed: {0}")]
    StreamDecompressionFailed(String),

    #[error("decompression stalled with {0} unconsumed bytes; source is truncated or corrupt")]
    DecompressionStalled(usize),

    #[error("engine out of memory: {0}")]
    OutOfMemory(String),

    #[error("i/o error: {0}")]
    Io(io::Error),
}

/// The engine reports allocation failure only through its error
/// string, so out-of-memory detection is textual. The match is kept
/// narrow: "window requires too much memory" style errors are real
/// decode failures, not allocation failures.
fn is_out_of_memory(err: &io::Error) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("allocation") || msg.contains("not enough memory")
}

impl CodecError {
    pub(crate) fn from_compress(err: io::Error) -> Self {
        if is_out_of_memory(&err) {
            CodecError::OutOfMemory(err.to_string())
        } else {
            CodecError::CompressionFailed(err.to_string())
        }
    }

    pub(crate) fn from_decompress(err: io::Error) -> Self {
        if is_out_of_memory(&err) {
            CodecError::OutOfMemory(err.to_string())
        } else {
            CodecError::DecompressionFailed(err.to_string())
        }
    }

    pub(crate) fn from_stream_compress(err: io::Error) -> Self {
        if is_out_of_memory(&err) {
            CodecError::OutOfMemory(err.to_string())
        } else {
            CodecError::StreamCompressionFailed(err.to_string())
        }
    }

    pub(crate) fn from_stream_decompress(err: io::Error) -> Self {
        if is_out_of_memory(&err) {
            CodecError::OutOfMemory(err.to_string())
        } else {
            CodecError::StreamDecompressionFailed(err.to_string())
        }
    }

    pub(crate) fn from_train(err: io::Error) -> Self {
        if is_out_of_memory(&err) {
            CodecError::OutOfMemory(err.to_string())
        } else {
            // Trainer failures are input-shaped: too few samples, a
            // corpus too uniform to learn from, target size too small.
            CodecError::InvalidInput(format!("dictionary training failed: {}", err))
        }
    }
}
