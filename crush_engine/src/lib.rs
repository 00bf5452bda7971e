mod compress;
mod decompress;
pub mod metrics;
mod train;

pub use compress::{compress_buffer, compress_buffer_with, CompressHandle};
pub use decompress::{
    decompress_buffer, decompress_buffer_with, frame_decompressed_size, DecompressHandle,
};
pub use metrics::{MetricsSink, NoopMetrics};
pub use train::train_dictionary;

// Parameter enums of the underlying engine, re-exported so the session
// layer can apply checksum/window settings without depending on zstd
// directly.
pub use zstd::stream::raw::{CParameter, DParameter};

/// Lowest compression level the engine accepts through this binding.
pub const MIN_COMPRESSION_LEVEL: i32 = 1;

/// Highest compression level the engine accepts (ZSTD_maxCLevel).
pub const MAX_COMPRESSION_LEVEL: i32 = 22;

/// Level used when the caller expresses no preference (engine default).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Smallest valid window log, shared by compression and decompression
/// (ZSTD_WINDOWLOG_MIN).
pub const MIN_WINDOW_LOG: u32 = 10;

/// Largest valid window log on 64-bit targets (ZSTD_WINDOWLOG_MAX).
pub const MAX_WINDOW_LOG: u32 = 31;

/// Preferred input chunk size for streaming compression
/// (ZSTD_CStreamInSize). Reading sources in chunks of this size keeps
/// every engine call full without over-buffering.
pub fn compress_chunk_hint() -> usize {
    zstd::zstd_safe::CCtx::in_size()
}

/// Preferred input chunk size for streaming decompression
/// (ZSTD_DStreamInSize).
pub fn decompress_chunk_hint() -> usize {
    zstd::zstd_safe::DCtx::in_size()
}

/// Outcome of a single engine call.
///
/// `consumed` is how many input bytes the engine accepted this call —
/// never more than the input length, and anything beyond it is the
/// caller's to resubmit. `remaining` is the engine's progress hint:
/// for compression, bytes still sitting in its internal buffer; for
/// decompression, a nonzero value while the current frame is
/// incomplete and exactly zero at a frame boundary.
#[derive(Debug, Clone, Copy)]
pub struct EngineStatus {
    pub consumed: usize,
    pub remaining: usize,
}
