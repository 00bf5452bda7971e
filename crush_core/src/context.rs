use std::sync::Arc;

use log::debug;

use crush_engine::{
    CParameter, CompressHandle, DParameter, DecompressHandle, MetricsSink, NoopMetrics,
    DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL, MAX_WINDOW_LOG, MIN_COMPRESSION_LEVEL,
    MIN_WINDOW_LOG,
};

use crate::dict::Dictionary;
use crate::error::CodecError;

/// Named compression preset.
///
/// Each strategy selects a default compression level, which in turn
/// selects the engine's underlying search family. An explicit level in
/// [`CompressConfig`] always wins over the strategy default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Cheapest search, largest output. For hot paths.
    Fast,
    /// The engine default. Good ratio at low cost.
    Balanced,
    /// Mixed binary payloads: executables, serialized blobs.
    Binary,
    /// Record-shaped data: JSON, CSV, telemetry rows.
    StructuredData,
    /// Natural-language text and logs.
    Text,
    /// Strongest search the engine offers. Slowest by far.
    Maximum,
}

impl Strategy {
    /// Level applied when the config carries no explicit level.
    pub fn default_level(self) -> i32 {
        match self {
            Strategy::Fast => 1,
            Strategy::Balanced => 3,
            Strategy::Binary => 8,
            Strategy::StructuredData => 12,
            Strategy::Text => 17,
            Strategy::Maximum => 19,
        }
    }

    /// Human-readable strategy name for logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Fast => "fast",
            Strategy::Balanced => "balanced",
            Strategy::Binary => "binary",
            Strategy::StructuredData => "structured-data",
            Strategy::Text => "text",
            Strategy::Maximum => "maximum",
        }
    }
}

/// Configuration for a compression session.
///
/// Effective level resolution: explicit `level` if set, else the
/// strategy's default, else the engine default (3).
#[derive(Debug, Clone, Default)]
pub struct CompressConfig {
    /// Explicit compression level (1 to 22). Overrides the strategy default.
    pub level: Option<i32>,
    /// Named preset supplying a default level and latency class.
    pub strategy: Option<Strategy>,
    /// Append the frame's integrity checksum footer.
    pub checksum: bool,
    /// Explicit window log (10 to 31). Mostly useful to bound decoder
    /// memory for constrained consumers.
    pub window_log: Option<u32>,
}

impl CompressConfig {
    pub fn effective_level(&self) -> i32 {
        self.level
            .or_else(|| self.strategy.map(Strategy::default_level))
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }
}

/// Where a session stands between creation/reset and the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No frame in progress. Any operation may start.
    Idle,
    /// A frame is being produced or consumed. Only `step` calls that
    /// continue the frame (or a reset) are legal.
    MidFrame,
    /// A streaming call failed. The context rejects everything except
    /// a session-and-parameters reset.
    NeedsReset,
}

/// How much of a context a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Drop accumulated frame state; keep parameters and dictionary.
    SessionOnly,
    /// Drop frame state, loaded dictionary, and restore the configured
    /// parameters. Equivalent to a freshly created context.
    SessionAndParameters,
}

// ── Compression ────────────────────────────────────────────────────────────

/// One configured compression session.
///
/// Owns its engine handle exclusively; `&mut self` on every mutating
/// operation is what guarantees a context is never driven by two
/// streaming operations at once. The handle is released when the
/// context drops, on every exit path.
pub struct CompressionContext {
    pub(crate) handle: CompressHandle,
    config: CompressConfig,
    level: i32,
    dictionary: Option<Dictionary>,
    pub(crate) state: SessionState,
    metrics: Arc<dyn MetricsSink>,
}

impl CompressionContext {
    /// Create a session from `config` with metrics discarded.
    pub fn new(config: CompressConfig) -> Result<Self, CodecError> {
        Self::with_metrics(config, Arc::new(NoopMetrics))
    }

    /// Create a session from `config`, reporting engine timings to `metrics`.
    ///
    /// All validation happens before the engine handle is allocated, so
    /// a rejected config leaks nothing.
    pub fn with_metrics(
        config: CompressConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, CodecError> {
        let level = config.effective_level();
        if !(MIN_COMPRESSION_LEVEL..=MAX_COMPRESSION_LEVEL).contains(&level) {
            return Err(CodecError::InvalidCompressionLevel {
                level,
                min: MIN_COMPRESSION_LEVEL,
                max: MAX_COMPRESSION_LEVEL,
            });
        }
        if let Some(w) = config.window_log {
            if !(MIN_WINDOW_LOG..=MAX_WINDOW_LOG).contains(&w) {
                return Err(CodecError::InvalidInput(format!(
                    "window log {} outside supported range {}..={}",
                    w, MIN_WINDOW_LOG, MAX_WINDOW_LOG
                )));
            }
        }

        let mut handle =
            CompressHandle::new(level, metrics.clone()).map_err(CodecError::from_compress)?;
        Self::apply_parameters(&mut handle, &config).map_err(CodecError::from_compress)?;

        debug!(
            "created compression context: level {}, strategy {}",
            level,
            config.strategy.map(Strategy::name).unwrap_or("none"),
        );
        Ok(Self {
            handle,
            config,
            level,
            dictionary: None,
            state: SessionState::Idle,
            metrics,
        })
    }

    fn apply_parameters(handle: &mut CompressHandle, config: &CompressConfig) -> std::io::Result<()> {
        handle.set_parameter(CParameter::ChecksumFlag(config.checksum))?;
        if let Some(w) = config.window_log {
            handle.set_parameter(CParameter::WindowLog(w))?;
        }
        Ok(())
    }

    /// Effective compression level of this session.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Strategy this session was configured with, if any.
    pub fn strategy(&self) -> Option<Strategy> {
        self.config.strategy
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Dictionary currently attached, if any.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    /// Attach `dictionary` for subsequent frames.
    ///
    /// Idle only: the engine binds dictionaries at frame start, so
    /// swapping one in mid-frame is a usage error. Stays attached until
    /// replaced or a session-and-parameters reset. The swap is
    /// all-or-nothing; on failure the context keeps its previous
    /// handle and dictionary.
    pub fn load_dictionary(&mut self, dictionary: &Dictionary) -> Result<(), CodecError> {
        if self.state != SessionState::Idle {
            return Err(CodecError::InvalidInput(
                "cannot load a dictionary while a frame is in progress; reset the session first"
                    .into(),
            ));
        }
        let mut handle =
            CompressHandle::with_dictionary(self.level, dictionary.as_bytes(), self.metrics.clone())
                .map_err(CodecError::from_compress)?;
        Self::apply_parameters(&mut handle, &self.config).map_err(CodecError::from_compress)?;
        self.handle = handle;
        self.dictionary = Some(dictionary.clone());
        debug!(
            "loaded {}-byte dictionary into compression context",
            dictionary.len()
        );
        Ok(())
    }

    /// Clear session state per `mode`. All-or-nothing: on error the
    /// context is left exactly as it was.
    pub fn reset(&mut self, mode: ResetMode) -> Result<(), CodecError> {
        match mode {
            ResetMode::SessionOnly => {
                if self.state == SessionState::NeedsReset {
                    return Err(CodecError::InvalidInput(
                        "session-and-parameters reset required after a stream failure".into(),
                    ));
                }
                self.handle
                    .reset_session()
                    .map_err(CodecError::from_compress)?;
            }
            ResetMode::SessionAndParameters => {
                let mut handle = CompressHandle::new(self.level, self.metrics.clone())
                    .map_err(CodecError::from_compress)?;
                Self::apply_parameters(&mut handle, &self.config)
                    .map_err(CodecError::from_compress)?;
                self.handle = handle;
                self.dictionary = None;
            }
        }
        self.state = SessionState::Idle;
        debug!("reset compression context ({:?})", mode);
        Ok(())
    }
}

// ── Decompression ──────────────────────────────────────────────────────────

/// One configured decompression session.
///
/// Mirrors [`CompressionContext`]: exclusive engine handle, optional
/// window cap, optional dictionary, session state. Carryover of
/// unconsumed source bytes lives in [`FrameReader`](crate::FrameReader),
/// not here; this context only reports how much of each `step` input it
/// accepted.
pub struct DecompressionContext {
    pub(crate) handle: DecompressHandle,
    max_window_log: Option<u32>,
    dictionary: Option<Dictionary>,
    pub(crate) state: SessionState,
    metrics: Arc<dyn MetricsSink>,
}

impl DecompressionContext {
    /// Create a session. `max_window_log = None` applies no limit;
    /// otherwise the value must lie in 10..=31 and frames requiring a
    /// larger window fail to decode.
    pub fn new(max_window_log: Option<u32>) -> Result<Self, CodecError> {
        Self::with_metrics(max_window_log, Arc::new(NoopMetrics))
    }

    /// Like [`new`](Self::new), reporting engine timings to `metrics`.
    pub fn with_metrics(
        max_window_log: Option<u32>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, CodecError> {
        // Validated before the handle exists, so the rejected path
        // allocates nothing.
        if let Some(w) = max_window_log {
            if !(MIN_WINDOW_LOG..=MAX_WINDOW_LOG).contains(&w) {
                return Err(CodecError::InvalidInput(format!(
                    "max window log {} outside supported range {}..={}",
                    w, MIN_WINDOW_LOG, MAX_WINDOW_LOG
                )));
            }
        }
        let mut handle =
            DecompressHandle::new(metrics.clone()).map_err(CodecError::from_decompress)?;
        Self::apply_parameters(&mut handle, max_window_log).map_err(CodecError::from_decompress)?;

        debug!(
            "created decompression context: max window log {:?}",
            max_window_log
        );
        Ok(Self {
            handle,
            max_window_log,
            dictionary: None,
            state: SessionState::Idle,
            metrics,
        })
    }

    fn apply_parameters(
        handle: &mut DecompressHandle,
        max_window_log: Option<u32>,
    ) -> std::io::Result<()> {
        if let Some(w) = max_window_log {
            handle.set_parameter(DParameter::WindowLogMax(w))?;
        }
        Ok(())
    }

    /// Window cap this session was configured with, if any.
    pub fn max_window_log(&self) -> Option<u32> {
        self.max_window_log
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Dictionary currently attached, if any.
    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    /// Attach `dictionary` for subsequent frames. Idle only; same
    /// contract as the compression side.
    pub fn load_dictionary(&mut self, dictionary: &Dictionary) -> Result<(), CodecError> {
        if self.state != SessionState::Idle {
            return Err(CodecError::InvalidInput(
                "cannot load a dictionary while a frame is in progress; reset the session first"
                    .into(),
            ));
        }
        let mut handle =
            DecompressHandle::with_dictionary(dictionary.as_bytes(), self.metrics.clone())
                .map_err(CodecError::from_decompress)?;
        Self::apply_parameters(&mut handle, self.max_window_log)
            .map_err(CodecError::from_decompress)?;
        self.handle = handle;
        self.dictionary = Some(dictionary.clone());
        debug!(
            "loaded {}-byte dictionary into decompression context",
            dictionary.len()
        );
        Ok(())
    }

    /// Clear session state per `mode`. All-or-nothing.
    pub fn reset(&mut self, mode: ResetMode) -> Result<(), CodecError> {
        match mode {
            ResetMode::SessionOnly => {
                if self.state == SessionState::NeedsReset {
                    return Err(CodecError::InvalidInput(
                        "session-and-parameters reset required after a stream failure".into(),
                    ));
                }
                self.handle
                    .reset_session()
                    .map_err(CodecError::from_decompress)?;
            }
            ResetMode::SessionAndParameters => {
                let mut handle = DecompressHandle::new(self.metrics.clone())
                    .map_err(CodecError::from_decompress)?;
                Self::apply_parameters(&mut handle, self.max_window_log)
                    .map_err(CodecError::from_decompress)?;
                self.handle = handle;
                self.dictionary = None;
            }
        }
        self.state = SessionState::Idle;
        debug!("reset decompression context ({:?})", mode);
        Ok(())
    }
}
