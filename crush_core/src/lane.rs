use crate::context::Strategy;

/// Expected-latency class of a codec call.
///
/// Advisory metadata for the caller's dispatcher: it decides whether a
/// compress call may run on a latency-sensitive lane or belongs on a
/// blocking-tolerant one. The classification never changes protocol
/// behavior, and this module deliberately carries no concurrency
/// primitives so it ports across execution models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyClass {
    /// Sub-millisecond per ~100 KB on current hardware. Safe to run
    /// inline.
    Inline,
    /// Single- to double-digit milliseconds per ~100 KB. Place on a
    /// dedicated, blocking-tolerant lane.
    DedicatedLane,
}

impl Strategy {
    /// Latency class of compression under this strategy.
    pub fn latency_class(self) -> LatencyClass {
        match self {
            Strategy::Fast | Strategy::Balanced => LatencyClass::Inline,
            // Binary measures borderline in practice; classified
            // conservatively.
            Strategy::Binary => LatencyClass::DedicatedLane,
            Strategy::StructuredData | Strategy::Text | Strategy::Maximum => {
                LatencyClass::DedicatedLane
            }
        }
    }
}

/// Decompression is playback, not search: inline-safe regardless of
/// the strategy that produced the data.
pub fn decompression_latency_class() -> LatencyClass {
    LatencyClass::Inline
}
