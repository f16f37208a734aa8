//! Decode cache with single-flight semantics
//!
//! One entry per (instrument, sample frequency). The entry is a shared decode
//! future: concurrent requests for the same key await the same decode, and a
//! resolved buffer is kept for the lifetime of the cache. Failed decodes are
//! evicted so a later request can retry.

use crate::audio::{DecodedBuffer, SampleDecoder};
use crate::error::{Error, Result};
use diad_common::models::{SampleData, SampledInstrument};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

type DecodeResult = std::result::Result<Arc<DecodedBuffer>, String>;
type DecodeFuture = Shared<BoxFuture<'static, DecodeResult>>;

/// Cache key: instrument and the recorded frequency of the sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    instrument: SampledInstrument,
    freq_bits: u64,
}

impl CacheKey {
    pub fn new(instrument: SampledInstrument, freq: f64) -> Self {
        Self {
            instrument,
            freq_bits: freq.to_bits(),
        }
    }
}

struct CacheEntry {
    /// Distinguishes a retried entry from the failed one it replaced
    generation: u64,
    future: DecodeFuture,
}

/// Memoized sample decodes
pub struct BufferCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    sample_rate: u32,
    generation: AtomicU64,
    decode_count: AtomicUsize,
}

impl BufferCache {
    /// Cache producing buffers resampled to `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sample_rate,
            generation: AtomicU64::new(0),
            decode_count: AtomicUsize::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decoded buffer for `sample`, decoding at most once per key.
    pub async fn get_or_decode(
        &self,
        instrument: SampledInstrument,
        sample: &SampleData,
    ) -> Result<Arc<DecodedBuffer>> {
        let key = CacheKey::new(instrument, sample.freq);

        let (generation, future) = {
            let mut entries = self.entries();
            match entries.get(&key) {
                Some(entry) => {
                    debug!(?instrument, freq = sample.freq, "decode cache hit");
                    (entry.generation, entry.future.clone())
                }
                None => {
                    debug!(?instrument, freq = sample.freq, "decode cache miss");
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst);
                    let future = self.spawn_decode(sample.data.clone());
                    entries.insert(
                        key,
                        CacheEntry {
                            generation,
                            future: future.clone(),
                        },
                    );
                    (generation, future)
                }
            }
        };

        match future.await {
            Ok(buffer) => Ok(buffer),
            Err(reason) => {
                let mut entries = self.entries();
                if entries.get(&key).map(|e| e.generation) == Some(generation) {
                    warn!(?instrument, freq = sample.freq, "evicting failed decode: {}", reason);
                    entries.remove(&key);
                }
                Err(Error::Decode(reason))
            }
        }
    }

    fn spawn_decode(&self, data: Vec<u8>) -> DecodeFuture {
        let sample_rate = self.sample_rate;
        self.decode_count.fetch_add(1, Ordering::SeqCst);

        async move {
            tokio::task::spawn_blocking(move || SampleDecoder::decode_to_buffer(&data, sample_rate))
                .await
                .map_err(|e| format!("decode task failed: {}", e))?
                .map(Arc::new)
                .map_err(|e| e.to_string())
        }
        .boxed()
        .shared()
    }

    pub fn contains(&self, instrument: SampledInstrument, freq: f64) -> bool {
        self.entries().contains_key(&CacheKey::new(instrument, freq))
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of decodes started since creation
    pub fn decode_count(&self) -> usize {
        self.decode_count.load(Ordering::SeqCst)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries().clear();
    }
}
