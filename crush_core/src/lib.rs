pub mod context;
pub mod dict;
pub mod error;
pub mod lane;
pub mod reader;
pub mod stream;
pub mod writer;

pub use context::{
    CompressConfig, CompressionContext, DecompressionContext, ResetMode, SessionState, Strategy,
};
pub use dict::Dictionary;
pub use error::CodecError;
pub use lane::{decompression_latency_class, LatencyClass};
pub use reader::{decompress_stream, FrameReader};
pub use stream::{EndDirective, StepOutcome, StreamSummary};
pub use writer::{compress_stream, FlushPolicy, FrameWriter};

pub use crush_engine::{MetricsSink, NoopMetrics};
pub use crush_engine::{
    DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL, MAX_WINDOW_LOG, MIN_COMPRESSION_LEVEL,
    MIN_WINDOW_LOG,
};

/// Compress `data` into one frame without setting up a session.
///
/// For repeated calls, configured parameters, or dictionaries, create
/// a [`CompressionContext`] instead and reuse it.
pub fn compress(data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
    if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) {
        return Err(CodecError::InvalidCompressionLevel {
            level,
            min: MIN_COMPRESSION_LEVEL,
            max: MAX_COMPRESSION_LEVEL,
        });
    }
    crush_engine::compress_buffer(data, level, &NoopMetrics).map_err(CodecError::from_compress)
}

/// Decompress a single complete frame without setting up a session.
///
/// Sizes the output from the frame header when the producer recorded
/// it, and falls back to incremental decoding when the header says
/// unknown (streaming producers usually cannot record a size).
pub fn decompress(frame: &[u8]) -> Result<Vec<u8>, CodecError> {
    match frame_decompressed_size(frame)? {
        // The recorded size is untrusted; sizes past the pre-allocation
        // cap go through the incremental path like unknown ones.
        Some(size) if size <= stream::PREALLOC_LIMIT as u64 => {
            crush_engine::decompress_buffer(frame, size as usize, &NoopMetrics)
                .map_err(CodecError::from_decompress)
        }
        _ => {
            let mut ctx = DecompressionContext::new(None)?;
            ctx.decompress(frame)
        }
    }
}

/// Read the decompressed size recorded in a frame header.
///
/// `Ok(None)` when the size was not recorded; `InvalidInput` when the
/// bytes do not start with a valid frame header.
pub fn frame_decompressed_size(frame: &[u8]) -> Result<Option<u64>, CodecError> {
    crush_engine::frame_decompressed_size(frame)
        .map_err(|_| CodecError::InvalidInput("malformed frame header".into()))
}
