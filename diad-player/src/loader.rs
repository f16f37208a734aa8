//! Level catalog and sample table loading
//!
//! Data folder layout:
//!
//! ```text
//! <data_folder>/levels.json
//! <data_folder>/samples/<instrument>/meta.json   {"mappings": {"<file>": freq}}
//! <data_folder>/samples/<instrument>/<file>
//! ```
//!
//! [`DataLoader::serve`] answers `levels:request` and `table:request` on a
//! message channel.

use crate::error::{Error, Result};
use diad_common::channel::{
    MessageChannel, Payload, LEVELS_REQUEST, LEVELS_RESPONSE, TABLE_REQUEST, TABLE_RESPONSE,
};
use diad_common::models::{InstrumentSamples, Levels, SampleData, SampleTable, SampledInstrument};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Sample files read concurrently per instrument
pub const READ_CONCURRENCY: usize = 5;

pub const LEVELS_FILE: &str = "levels.json";
pub const SAMPLES_DIR: &str = "samples";
pub const META_FILE: &str = "meta.json";

#[derive(Debug, Deserialize)]
struct SampleMeta {
    mappings: HashMap<String, f64>,
}

/// Reads levels and samples from the data folder
pub struct DataLoader {
    data_folder: PathBuf,
    table: OnceCell<Arc<SampleTable>>,
}

impl DataLoader {
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            table: OnceCell::new(),
        }
    }

    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    pub async fn load_levels(&self) -> Result<Levels> {
        let path = self.data_folder.join(LEVELS_FILE);
        let content = tokio::fs::read(&path).await.map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let levels: Levels = serde_json::from_slice(&content)?;
        info!(levels = levels.diads.len(), "Loaded level catalog from {}", path.display());
        Ok(levels)
    }

    /// Samples of one instrument, ascending by frequency.
    ///
    /// A missing instrument folder yields an empty list.
    pub async fn load_instrument(&self, instrument: SampledInstrument) -> Result<InstrumentSamples> {
        let dir = self.data_folder.join(SAMPLES_DIR).join(instrument.key());
        let meta_path = dir.join(META_FILE);

        let meta = match tokio::fs::read(&meta_path).await {
            Ok(content) => serde_json::from_slice::<SampleMeta>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(instrument = instrument.key(), "No sample metadata at {}", meta_path.display());
                return Ok(InstrumentSamples::default());
            }
            Err(e) => return Err(e.into()),
        };

        let results: Vec<Result<SampleData>> = stream::iter(meta.mappings)
            .map(|(file_name, freq)| {
                let path = dir.join(&file_name);
                async move {
                    let data = tokio::fs::read(&path).await.map_err(|e| {
                        Error::Config(format!("Cannot read sample {}: {}", path.display(), e))
                    })?;
                    debug!(freq, bytes = data.len(), "read sample {}", file_name);
                    Ok(SampleData { freq, data })
                }
            })
            .buffer_unordered(READ_CONCURRENCY)
            .collect()
            .await;

        let mut samples = results.into_iter().collect::<Result<Vec<_>>>()?;
        samples.sort_by(|a, b| a.freq.total_cmp(&b.freq));
        info!(instrument = instrument.key(), samples = samples.len(), "Loaded samples");

        Ok(InstrumentSamples { samples })
    }

    /// Sample table for every sampled instrument, loaded once.
    ///
    /// An instrument that fails to load gets an empty sample list, so
    /// sessions using it fail on their own while the others still play.
    pub async fn load_table(&self) -> Arc<SampleTable> {
        self.table
            .get_or_init(|| async {
                let mut table = SampleTable::new();
                for &instrument in SampledInstrument::all_variants() {
                    let samples = match self.load_instrument(instrument).await {
                        Ok(samples) => samples,
                        Err(e) => {
                            error!(instrument = instrument.key(), "Failed to load samples: {}", e);
                            InstrumentSamples::default()
                        }
                    };
                    table.insert(instrument, samples);
                }
                Arc::new(table)
            })
            .await
            .clone()
    }

    /// Answer level and table requests on `channel` until it closes.
    ///
    /// Listening starts before this returns, so requests sent afterwards
    /// are never missed.
    pub fn serve(self: Arc<Self>, channel: Arc<dyn MessageChannel>) -> JoinHandle<()> {
        let mut levels_rx = channel.listen(LEVELS_REQUEST);
        let mut table_rx = channel.listen(TABLE_REQUEST);
        info!("Data loader serving {}", self.data_folder.display());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    request = levels_rx.recv() => {
                        if !should_answer(request, LEVELS_REQUEST) {
                            break;
                        }
                        match self.load_levels().await {
                            Ok(levels) => channel.send(LEVELS_RESPONSE, Payload::Levels(Arc::new(levels))),
                            Err(e) => error!("Failed to load levels: {}", e),
                        }
                    }
                    request = table_rx.recv() => {
                        if !should_answer(request, TABLE_REQUEST) {
                            break;
                        }
                        let table = self.load_table().await;
                        channel.send(TABLE_RESPONSE, Payload::SampleTable(table));
                    }
                }
            }
            debug!("Data loader stopped");
        })
    }
}

/// `false` once the request channel is closed
fn should_answer(request: std::result::Result<Payload, broadcast::error::RecvError>, name: &str) -> bool {
    match request {
        Ok(_) => true,
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!("{} listener lagged by {} messages", name, skipped);
            true
        }
        Err(broadcast::error::RecvError::Closed) => false,
    }
}
