//! Audio player: playback sessions over the render graph
//!
//! Every [`PlayerInput`] starts a new session:
//!
//! 1. **Resolve** - each note gets a concrete instrument; sampled notes find
//!    their nearest sample and await its decode through the [`BufferCache`]
//!    (at most `decode_concurrency` in flight, note order preserved).
//! 2. **Commit** - under the active-group lock: a session that is no longer
//!    the latest request is discarded; otherwise the previous group is
//!    stopped and disconnected, and the new voices are scheduled from the
//!    context's current time and connected.
//!
//! A failed session emits `SessionFailed` and leaves the previous group
//! playing.

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::cache::BufferCache;
use crate::playback::context::AudioContext;
use crate::playback::fader::GainEnvelope;
use crate::playback::voice::{VoiceGroup, VoiceNode, VoiceSource};
use crate::playback::{loudness, sampler, scheduler};
use diad_common::channel::{MessageChannel, Payload, TABLE_REQUEST, TABLE_RESPONSE};
use diad_common::events::{DiadEvent, EventBus, PlayerStatus, StateCell};
use diad_common::models::{Instrument, InstrumentType, PlaybackType, SampleTable};
use diad_common::FadeCurve;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One playback request
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInput {
    /// Note frequencies in Hz, root first
    pub freqs: Vec<f64>,
    pub instrument_type: InstrumentType,
    pub playback_type: PlaybackType,
    /// Note length in seconds
    pub duration: f64,
    /// Gap between sequential notes in seconds
    pub pause: f64,
}

/// Consumer of playback requests
pub trait PlaybackSink: Send + Sync {
    fn play(&self, input: PlayerInput);
}

struct ResolvedNote {
    source: VoiceSource,
    level: f32,
}

struct PlayerInner {
    context: AudioContext,
    cache: BufferCache,
    table: watch::Sender<Option<Arc<SampleTable>>>,
    active: tokio::sync::Mutex<Option<VoiceGroup>>,
    next_session: AtomicU64,
    latest_requested: AtomicU64,
    decode_concurrency: usize,
    events: EventBus,
    status: StateCell<PlayerStatus>,
    closed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    runtime: Handle,
}

/// Audio player owning the decode cache and the active voice group.
///
/// Must be created from within a Tokio runtime.
#[derive(Clone)]
pub struct AudioPlayer {
    inner: Arc<PlayerInner>,
}

impl AudioPlayer {
    /// Create a player rendering into `context`.
    ///
    /// Starts listening for the sample table on `channel` and requests it.
    pub fn new(context: AudioContext, channel: &dyn MessageChannel, config: &PlayerConfig) -> Self {
        let (table, _) = watch::channel(None);
        let inner = Arc::new(PlayerInner {
            cache: BufferCache::new(context.sample_rate()),
            context,
            table,
            active: tokio::sync::Mutex::new(None),
            next_session: AtomicU64::new(0),
            latest_requested: AtomicU64::new(0),
            decode_concurrency: config.decode_concurrency.max(1),
            events: EventBus::new(config.event_capacity.max(1)),
            status: StateCell::new(PlayerStatus::Idle),
            closed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            runtime: Handle::current(),
        });

        let table_rx = channel.listen(TABLE_RESPONSE);
        let listener = inner
            .runtime
            .spawn(listen_for_table(Arc::downgrade(&inner), table_rx));
        inner.track(listener);
        channel.send(TABLE_REQUEST, Payload::Empty);

        Self { inner }
    }

    /// Start a new session for `input`, superseding any previous one.
    pub fn play(&self, input: PlayerInput) {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            debug!("Ignoring playback input: player closed");
            return;
        }

        let session_id = inner.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        inner.latest_requested.fetch_max(session_id, Ordering::SeqCst);
        inner.status.set(PlayerStatus::Resolving);
        debug!(
            session_id,
            notes = input.freqs.len(),
            instrument = %input.instrument_type,
            "playback requested"
        );

        let task = inner
            .runtime
            .spawn(Arc::clone(inner).run_session(session_id, input));
        inner.track(task);
    }

    /// Provide the sample table directly instead of over the channel
    pub fn set_sample_table(&self, table: Arc<SampleTable>) {
        self.inner.table.send_replace(Some(table));
    }

    pub fn has_sample_table(&self) -> bool {
        self.inner.table.borrow().is_some()
    }

    /// Stop all voices, close the context, clear the cache and stop
    /// accepting input.
    pub async fn destroy(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        for task in inner.lock_tasks().drain(..) {
            task.abort();
        }
        if let Some(group) = inner.active.lock().await.take() {
            inner.release_group(group);
        }
        inner.context.close();
        inner.cache.clear();
        inner.status.set(PlayerStatus::Closed);
        info!("Audio player destroyed");
    }

    pub fn context(&self) -> &AudioContext {
        &self.inner.context
    }

    pub fn cache(&self) -> &BufferCache {
        &self.inner.cache
    }

    pub fn status(&self) -> PlayerStatus {
        self.inner.status.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PlayerStatus> {
        self.inner.status.subscribe()
    }

    /// Session lifecycle events emitted after this call
    pub fn subscribe_events(&self) -> broadcast::Receiver<DiadEvent> {
        self.inner.events.subscribe()
    }

    /// Id of the most recent `play` request (0 before the first)
    pub fn latest_session(&self) -> u64 {
        self.inner.latest_requested.load(Ordering::SeqCst)
    }

    /// Voices of the currently connected group
    pub async fn active_voices(&self) -> Vec<Arc<VoiceNode>> {
        self.inner
            .active
            .lock()
            .await
            .as_ref()
            .map(|group| group.voices().to_vec())
            .unwrap_or_default()
    }
}

impl PlaybackSink for AudioPlayer {
    fn play(&self, input: PlayerInput) {
        AudioPlayer::play(self, input);
    }
}

impl PlayerInner {
    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.lock_tasks();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    async fn run_session(self: Arc<Self>, session_id: u64, input: PlayerInput) {
        match self.resolve_notes(&input).await {
            Ok(notes) => self.commit(session_id, &input, notes).await,
            Err(e) => self.fail(session_id, e).await,
        }
    }

    async fn resolve_notes(self: &Arc<Self>, input: &PlayerInput) -> Result<Vec<ResolvedNote>> {
        let instruments: Vec<Instrument> = {
            let mut rng = rand::thread_rng();
            input
                .freqs
                .iter()
                .map(|_| input.instrument_type.resolve(&mut rng))
                .collect()
        };

        let table = if instruments
            .iter()
            .any(|i| matches!(i, Instrument::Sampled(_)))
        {
            Some(self.sample_table().await?)
        } else {
            None
        };

        stream::iter(instruments.into_iter().zip(input.freqs.iter().copied()))
            .map(|(instrument, freq)| {
                let inner = Arc::clone(self);
                let table = table.clone();
                async move { inner.resolve_note(table.as_deref(), instrument, freq).await }
            })
            .buffered(self.decode_concurrency)
            .try_collect()
            .await
    }

    /// Wait until a sample table has been received
    async fn sample_table(&self) -> Result<Arc<SampleTable>> {
        let mut rx = self.table.subscribe();
        let table = rx
            .wait_for(|table| table.is_some())
            .await
            .map_err(|_| Error::Closed)?
            .clone();
        table.ok_or(Error::Closed)
    }

    async fn resolve_note(
        &self,
        table: Option<&SampleTable>,
        instrument: Instrument,
        freq: f64,
    ) -> Result<ResolvedNote> {
        let level = loudness::voice_level(instrument, freq);
        let source = match instrument {
            Instrument::Synthesized => VoiceSource::Oscillator { freq },
            Instrument::Sampled(kind) => {
                let table = table.ok_or(Error::SampleNotFound(kind))?;
                let (sample, rate) = sampler::resolve(table, kind, freq)?;
                let buffer = self.cache.get_or_decode(kind, sample).await?;
                VoiceSource::Buffer { buffer, rate }
            }
        };
        Ok(ResolvedNote { source, level })
    }

    async fn commit(&self, session_id: u64, input: &PlayerInput, notes: Vec<ResolvedNote>) {
        let mut active = self.active.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if session_id != self.latest_requested.load(Ordering::SeqCst) {
            debug!(session_id, "discarding superseded session");
            self.events.emit_lossy(DiadEvent::SessionDiscarded {
                session_id,
                timestamp: chrono::Utc::now(),
            });
            return;
        }

        if let Some(previous) = active.take() {
            self.release_group(previous);
        }

        let now = self.context.current_time();
        let timings = {
            let mut rng = rand::thread_rng();
            scheduler::schedule(
                &mut rng,
                input.playback_type,
                now,
                notes.len(),
                input.duration,
                input.pause,
            )
        };

        let voices: Vec<Arc<VoiceNode>> = notes
            .into_iter()
            .zip(timings)
            .map(|(note, timing)| {
                let envelope =
                    GainEnvelope::new(note.level, FadeCurve::Release, timing.start, timing.stop);
                Arc::new(VoiceNode::new(note.source, envelope, timing.start, timing.stop))
            })
            .collect();

        let group = VoiceGroup::new(session_id, voices);
        group.connect(&self.context);
        let voice_count = group.voices().len();
        let start_time = group.start_time().unwrap_or(now);
        *active = Some(group);

        info!(session_id, voice_count, start_time, "session scheduled");
        self.status.set(PlayerStatus::Playing);
        self.events.emit_lossy(DiadEvent::SessionScheduled {
            session_id,
            voice_count,
            start_time,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn fail(&self, session_id: u64, error: Error) {
        let active = self.active.lock().await;
        warn!(session_id, "playback session failed: {}", error);

        if !self.closed.load(Ordering::SeqCst)
            && session_id == self.latest_requested.load(Ordering::SeqCst)
        {
            self.status.set(if active.is_some() {
                PlayerStatus::Playing
            } else {
                PlayerStatus::Idle
            });
        }
        self.events.emit_lossy(DiadEvent::SessionFailed {
            session_id,
            reason: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn release_group(&self, group: VoiceGroup) {
        let session_id = group.session_id();
        let released = group.release(&self.context);
        debug!(session_id, released, "session released");
        self.events.emit_lossy(DiadEvent::SessionReleased {
            session_id,
            timestamp: chrono::Utc::now(),
        });
    }
}

async fn listen_for_table(inner: Weak<PlayerInner>, mut rx: broadcast::Receiver<Payload>) {
    loop {
        match rx.recv().await {
            Ok(Payload::SampleTable(table)) => {
                let Some(inner) = inner.upgrade() else { break };
                info!(instruments = table.len(), "sample table received");
                inner.table.send_replace(Some(table));
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Sample table listener lagged by {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
