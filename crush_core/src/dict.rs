use std::fmt;
use std::sync::Arc;

use log::debug;

use crush_engine::{MetricsSink, NoopMetrics};

use crate::error::CodecError;

/// An immutable trained dictionary.
///
/// Train once, load many times: the blob lives behind an `Arc`, so
/// cloning is cheap and any number of compression and decompression
/// contexts can hold the same dictionary concurrently. It is never
/// mutated after training, which is why no synchronization is needed.
#[derive(Clone)]
pub struct Dictionary {
    bytes: Arc<[u8]>,
}

impl Dictionary {
    /// Train a dictionary of at most `max_size` bytes from `samples`.
    ///
    /// Samples should be many small, similar records drawn from the
    /// distribution the dictionary will later compress. Fails with
    /// `InvalidInput` on an empty sample set; the engine may also
    /// reject corpora it cannot learn from (too few or too uniform
    /// samples). The produced blob may be smaller than `max_size`.
    pub fn train<S: AsRef<[u8]>>(samples: &[S], max_size: usize) -> Result<Self, CodecError> {
        Self::train_with_metrics(samples, max_size, &NoopMetrics)
    }

    /// Like [`train`](Self::train), reporting trainer timing to `metrics`.
    pub fn train_with_metrics<S: AsRef<[u8]>>(
        samples: &[S],
        max_size: usize,
        metrics: &dyn MetricsSink,
    ) -> Result<Self, CodecError> {
        if samples.is_empty() {
            return Err(CodecError::InvalidInput(
                "dictionary training requires at least one sample".into(),
            ));
        }
        // One continuous corpus plus the parallel length table the
        // trainer uses to find sample boundaries.
        let total: usize = samples.iter().map(|s| s.as_ref().len()).sum();
        let mut corpus = Vec::with_capacity(total);
        let mut sizes = Vec::with_capacity(samples.len());
        for sample in samples {
            let bytes = sample.as_ref();
            corpus.extend_from_slice(bytes);
            sizes.push(bytes.len());
        }

        let blob = crush_engine::train_dictionary(&corpus, &sizes, max_size, metrics)
            .map_err(CodecError::from_train)?;
        debug!(
            "trained {}-byte dictionary from {} samples ({} corpus bytes)",
            blob.len(),
            sizes.len(),
            corpus.len()
        );
        Ok(Self { bytes: blob.into() })
    }

    /// Wrap an already-trained blob, e.g. one loaded from disk.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// The raw dictionary blob.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dictionary({} bytes)", self.bytes.len())
    }
}
