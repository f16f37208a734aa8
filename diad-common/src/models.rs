//! Shared data model
//!
//! Level catalog, root ranges, instrument and playback preferences, the
//! generated `Interval` record and the sample table exchanged over the
//! message channel.

use crate::error::Error;
use crate::notation::{IntervalId, PitchNumber};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One generated interval with both tunings precomputed.
///
/// `note_freqs` are equal-tempered; `perfect_freqs` apply the just ratio of
/// `interval_id` to `root_freq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub root: PitchNumber,
    pub notes: Vec<PitchNumber>,
    pub root_freq: f64,
    pub note_freqs: Vec<f64>,
    pub perfect_freqs: Vec<f64>,
    pub root_name: String,
    pub note_names: Vec<String>,
    pub interval_id: IntervalId,
    pub name: String,
}

impl Interval {
    /// Root followed by the tempered note frequencies
    pub fn tempered_voicing(&self) -> Vec<f64> {
        std::iter::once(self.root_freq)
            .chain(self.note_freqs.iter().copied())
            .collect()
    }

    /// Root followed by the just-intonation note frequencies
    pub fn perfect_voicing(&self) -> Vec<f64> {
        std::iter::once(self.root_freq)
            .chain(self.perfect_freqs.iter().copied())
            .collect()
    }

    /// Frequencies for playback in the requested tuning
    pub fn freqs(&self, is_perfect: bool) -> Vec<f64> {
        if is_perfect {
            self.perfect_voicing()
        } else {
            self.tempered_voicing()
        }
    }
}

/// Consonance grouping used by the level catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelGroup {
    Consonant,
    Dissonant,
    All,
}

/// A catalog level: which intervals the learner is quizzed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub id: u32,
    pub name: String,
    pub group: LevelGroup,
    pub intervals: Vec<IntervalId>,
}

/// Level catalog as shipped in `levels.json`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Levels {
    pub diads: Vec<Level>,
}

impl Levels {
    /// Level with `id`, falling back to the first level of the catalog
    pub fn find_or_first(&self, id: u32) -> Option<&Level> {
        self.diads
            .iter()
            .find(|l| l.id == id)
            .or_else(|| self.diads.first())
    }
}

/// Permissible root pitches for interval generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RootRange {
    /// Closed key range `[min, max]`
    Span {
        id: String,
        name: String,
        min: PitchNumber,
        max: PitchNumber,
    },
    /// Explicit set of root keys; may be empty
    Custom {
        id: String,
        name: String,
        roots: Vec<PitchNumber>,
    },
}

impl RootRange {
    pub fn id(&self) -> &str {
        match self {
            RootRange::Span { id, .. } | RootRange::Custom { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RootRange::Span { name, .. } | RootRange::Custom { name, .. } => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, RootRange::Custom { .. })
    }
}

/// Note timing of a playback request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackType {
    /// All notes together ("harmonic")
    #[default]
    Simultaneous,
    /// One note after another ("melodic")
    Sequential,
}

impl PlaybackType {
    pub fn all_variants() -> &'static [PlaybackType] {
        &[PlaybackType::Simultaneous, PlaybackType::Sequential]
    }

    /// Learner-facing label
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackType::Simultaneous => "Harmonic",
            PlaybackType::Sequential => "Melodic",
        }
    }
}

impl FromStr for PlaybackType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simultaneous" | "harmonic" => Ok(PlaybackType::Simultaneous),
            "sequential" | "melodic" => Ok(PlaybackType::Sequential),
            other => Err(Error::InvalidInput(format!("unknown playback type '{}'", other))),
        }
    }
}

/// Instruments backed by recorded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampledInstrument {
    Piano,
    Harpsichord,
    Organ,
}

impl SampledInstrument {
    pub fn all_variants() -> &'static [SampledInstrument] {
        &[
            SampledInstrument::Piano,
            SampledInstrument::Harpsichord,
            SampledInstrument::Organ,
        ]
    }

    /// Folder / JSON key of this instrument
    pub fn key(&self) -> &'static str {
        match self {
            SampledInstrument::Piano => "piano",
            SampledInstrument::Harpsichord => "harpsichord",
            SampledInstrument::Organ => "organ",
        }
    }

    /// Uniformly random sampled instrument
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::all_variants()
            .choose(rng)
            .unwrap_or(&SampledInstrument::Piano)
    }
}

/// Instrument preference as chosen by the learner.
///
/// `Mixed` is only a preference: it is resolved to one concrete
/// [`Instrument`] per note and never reaches the voice graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InstrumentType {
    Sampled(SampledInstrument),
    Mixed,
    Sine,
}

impl InstrumentType {
    pub fn all_variants() -> Vec<InstrumentType> {
        let mut all: Vec<InstrumentType> = SampledInstrument::all_variants()
            .iter()
            .map(|kind| InstrumentType::Sampled(*kind))
            .collect();
        all.push(InstrumentType::Mixed);
        all.push(InstrumentType::Sine);
        all
    }

    /// Resolve to a concrete instrument for one note
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Instrument {
        match self {
            InstrumentType::Sampled(kind) => Instrument::Sampled(*kind),
            InstrumentType::Mixed => Instrument::Sampled(SampledInstrument::random(rng)),
            InstrumentType::Sine => Instrument::Synthesized,
        }
    }
}

impl Default for InstrumentType {
    fn default() -> Self {
        InstrumentType::Mixed
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentType::Sampled(kind) => write!(f, "{}", kind.key()),
            InstrumentType::Mixed => write!(f, "mixed"),
            InstrumentType::Sine => write!(f, "sine"),
        }
    }
}

impl FromStr for InstrumentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "piano" => Ok(InstrumentType::Sampled(SampledInstrument::Piano)),
            "harpsichord" => Ok(InstrumentType::Sampled(SampledInstrument::Harpsichord)),
            "organ" => Ok(InstrumentType::Sampled(SampledInstrument::Organ)),
            "mixed" => Ok(InstrumentType::Mixed),
            "sine" => Ok(InstrumentType::Sine),
            other => Err(Error::InvalidInput(format!("unknown instrument '{}'", other))),
        }
    }
}

impl TryFrom<String> for InstrumentType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstrumentType> for String {
    fn from(value: InstrumentType) -> Self {
        value.to_string()
    }
}

/// A concrete voice source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Sampled(SampledInstrument),
    Synthesized,
}

/// A catalog level joined with the session's playback preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLevel {
    #[serde(flatten)]
    pub level: Level,
    pub instrument_type: InstrumentType,
    pub playback_type: PlaybackType,
    pub root_range: RootRange,
    pub is_perfect: bool,
}

/// One recorded note of a sampled instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleData {
    /// Fundamental frequency of the recording in Hz
    pub freq: f64,
    /// Encoded audio file contents (WAV, MP3, ...)
    pub data: Vec<u8>,
}

/// All samples of one instrument
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentSamples {
    pub samples: Vec<SampleData>,
}

/// Sample table keyed by instrument
pub type SampleTable = HashMap<SampledInstrument, InstrumentSamples>;
