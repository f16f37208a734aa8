//! Random interval generation
//!
//! Picks a root according to the active root-range policy, then a uniformly
//! random interval id from the allowed set, and fills in an [`Interval`]
//! record with tempered and just frequencies.

use crate::error::{Error, Result};
use crate::models::{Interval, RootRange};
use crate::notation::{IntervalId, NotationConverter, PitchNumber, MIDDLE_C};
use rand::seq::SliceRandom;
use rand::Rng;

/// Root used when a custom root set is empty
pub const FALLBACK_ROOT: PitchNumber = MIDDLE_C;

/// Stateless interval generator
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalGenerator;

impl IntervalGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate one interval using the thread-local RNG.
    ///
    /// Root resolution order: `fixed_root`, then the custom set (or
    /// [`FALLBACK_ROOT`] when empty), then a uniform pick in the span.
    pub fn generate(
        &self,
        allowed_ids: &[IntervalId],
        root_range: &RootRange,
        fixed_root: Option<PitchNumber>,
    ) -> Result<Interval> {
        self.generate_with(&mut rand::thread_rng(), allowed_ids, root_range, fixed_root)
    }

    /// Same as [`generate`](Self::generate) with an explicit RNG.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        allowed_ids: &[IntervalId],
        root_range: &RootRange,
        fixed_root: Option<PitchNumber>,
    ) -> Result<Interval> {
        let root = match fixed_root {
            Some(root) => root,
            None => Self::pick_root(rng, root_range),
        };
        let interval_id = *allowed_ids.choose(rng).ok_or(Error::EmptyIntervalSet)?;
        Self::build(root, interval_id)
    }

    fn pick_root<R: Rng + ?Sized>(rng: &mut R, root_range: &RootRange) -> PitchNumber {
        match root_range {
            RootRange::Custom { roots, .. } => {
                roots.choose(rng).copied().unwrap_or(FALLBACK_ROOT)
            }
            RootRange::Span { min, max, .. } => {
                let (lo, hi) = if min <= max { (*min, *max) } else { (*max, *min) };
                rng.gen_range(lo..=hi)
            }
        }
    }

    /// Build the interval record for a known root and id.
    pub fn build(root: PitchNumber, interval_id: IntervalId) -> Result<Interval> {
        let descriptor = NotationConverter::descriptor(interval_id)?;
        let note = root + interval_id;
        let root_freq = NotationConverter::freq_of(root);

        Ok(Interval {
            root,
            notes: vec![note],
            root_freq,
            note_freqs: vec![NotationConverter::freq_of(note)],
            perfect_freqs: vec![descriptor.ratio * root_freq],
            root_name: NotationConverter::note_name(root),
            note_names: vec![NotationConverter::note_name(note)],
            interval_id,
            name: descriptor.name.to_string(),
        })
    }
}
