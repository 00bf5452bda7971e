use std::io;
use std::time::Instant;

use crate::metrics::MetricsSink;

/// Run the engine's dictionary trainer over a concatenated sample
/// corpus.
///
/// `sample_sizes` is the parallel length table splitting `corpus` back
/// into individual samples; the two must describe the same bytes. The
/// returned blob is already trimmed to the size the trainer actually
/// produced, which may be smaller than `max_size`.
pub fn train_dictionary(
    corpus: &[u8],
    sample_sizes: &[usize],
    max_size: usize,
    metrics: &dyn MetricsSink,
) -> io::Result<Vec<u8>> {
    let t0 = Instant::now();
    let dict = zstd::dict::from_continuous(corpus, sample_sizes, max_size)?;
    metrics.record("dict.train", corpus.len(), dict.len(), t0.elapsed());
    Ok(dict)
}
