//! Music-theory conversions
//!
//! Pure functions mapping piano key numbers to frequencies and note names,
//! and interval ids to just-intonation ratios and display labels.
//!
//! Key numbering follows the 88-key piano: key 49 is concert A4 (440 Hz),
//! key 40 is middle C (C4).

use crate::error::{Error, Result};
use serde::Serialize;

/// Tempered piano key number (A4 = 49)
pub type PitchNumber = i32;

/// Interval id: semitone distance from the root (0 = unison .. 12 = octave)
pub type IntervalId = i32;

/// Reference pitch frequency in Hz
pub const REFERENCE_FREQ: f64 = 440.0;

/// Key number of the reference pitch (A4)
pub const REFERENCE_PITCH: PitchNumber = 49;

/// Key number of middle C (C4)
pub const MIDDLE_C: PitchNumber = 40;

const SEMITONES_PER_OCTAVE: i32 = 12;

const NOTE_NAMES: [&str; 12] = [
    "A", "A♯", "B", "C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯",
];

/// One row of the interval table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalDescriptor {
    /// Semitone distance from the root
    pub id: IntervalId,
    /// Display label including the just ratio, e.g. "Perfect Fifth (3/2)"
    pub name: &'static str,
    /// Just-intonation frequency ratio
    pub ratio: f64,
}

const INTERVALS: [IntervalDescriptor; 13] = [
    IntervalDescriptor { id: 0, name: "Unison (1/1)", ratio: 1.0 },
    IntervalDescriptor { id: 1, name: "Minor Second (16/15)", ratio: 16.0 / 15.0 },
    IntervalDescriptor { id: 2, name: "Major Second (9/8)", ratio: 9.0 / 8.0 },
    IntervalDescriptor { id: 3, name: "Minor Third (6/5)", ratio: 6.0 / 5.0 },
    IntervalDescriptor { id: 4, name: "Major Third (5/4)", ratio: 5.0 / 4.0 },
    IntervalDescriptor { id: 5, name: "Perfect Fourth (4/3)", ratio: 4.0 / 3.0 },
    IntervalDescriptor { id: 6, name: "Tritone (45/32)", ratio: 45.0 / 32.0 },
    IntervalDescriptor { id: 7, name: "Perfect Fifth (3/2)", ratio: 3.0 / 2.0 },
    IntervalDescriptor { id: 8, name: "Minor Sixth (8/5)", ratio: 8.0 / 5.0 },
    IntervalDescriptor { id: 9, name: "Major Sixth (5/3)", ratio: 5.0 / 3.0 },
    IntervalDescriptor { id: 10, name: "Minor Seventh (9/5)", ratio: 9.0 / 5.0 },
    IntervalDescriptor { id: 11, name: "Major Seventh (15/8)", ratio: 15.0 / 8.0 },
    IntervalDescriptor { id: 12, name: "Octave (2/1)", ratio: 2.0 },
];

/// Stateless notation converter.
pub struct NotationConverter;

impl NotationConverter {
    /// Equal-temperament frequency of a piano key.
    ///
    /// `440 * 2^((pitch - 49) / 12)`; every 12 keys doubles the frequency.
    pub fn freq_of(pitch: PitchNumber) -> f64 {
        let semitones = (pitch - REFERENCE_PITCH) as f64;
        REFERENCE_FREQ * 2f64.powf(semitones / SEMITONES_PER_OCTAVE as f64)
    }

    /// Scientific note name of a piano key, e.g. `49 -> "A4"`, `40 -> "C4"`.
    ///
    /// The octave digit changes at C, so A0..B0 precede C1.
    pub fn note_name(pitch: PitchNumber) -> String {
        let index = (pitch - 1).rem_euclid(SEMITONES_PER_OCTAVE) as usize;
        let octave = (pitch + 8).div_euclid(SEMITONES_PER_OCTAVE);
        format!("{}{}", NOTE_NAMES[index], octave)
    }

    /// Look up the interval table row for `id`.
    pub fn descriptor(id: IntervalId) -> Result<&'static IntervalDescriptor> {
        INTERVALS
            .iter()
            .find(|d| d.id == id)
            .ok_or(Error::InvalidIntervalId(id))
    }

    /// Apply the just-intonation ratio of `id` to `freq`.
    pub fn perfect_ratio(freq: f64, id: IntervalId) -> Result<f64> {
        Ok(Self::descriptor(id)?.ratio * freq)
    }

    /// Display label of an interval id.
    pub fn interval_name(id: IntervalId) -> Result<&'static str> {
        Ok(Self::descriptor(id)?.name)
    }

    /// The full interval table, ordered by id.
    pub fn intervals() -> &'static [IntervalDescriptor] {
        &INTERVALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_pitch_is_exact() {
        assert_eq!(NotationConverter::freq_of(49), 440.0);
    }

    #[test]
    fn test_octave_doubles_frequency() {
        for pitch in 1..=76 {
            let low = NotationConverter::freq_of(pitch);
            let high = NotationConverter::freq_of(pitch + 12);
            assert!(
                (high - 2.0 * low).abs() < 1e-9 * high,
                "pitch {}: {} vs {}",
                pitch,
                high,
                2.0 * low
            );
        }
    }

    #[test]
    fn test_middle_c_frequency() {
        let c4 = NotationConverter::freq_of(MIDDLE_C);
        assert!((c4 - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_note_names() {
        assert_eq!(NotationConverter::note_name(49), "A4");
        assert_eq!(NotationConverter::note_name(40), "C4");
        assert_eq!(NotationConverter::note_name(41), "C♯4");
        assert_eq!(NotationConverter::note_name(39), "B3");
        assert_eq!(NotationConverter::note_name(1), "A0");
    }

    #[test]
    fn test_note_name_cycle_and_octave() {
        for pitch in 1..=76 {
            let name = NotationConverter::note_name(pitch);
            let next = NotationConverter::note_name(pitch + 12);
            let (letter, octave) = name.split_at(name.len() - 1);
            let (next_letter, next_octave) = next.split_at(next.len() - 1);
            assert_eq!(letter, next_letter);
            let octave: i32 = octave.parse().unwrap();
            let next_octave: i32 = next_octave.parse().unwrap();
            assert_eq!(next_octave, octave + 1, "{} -> {}", name, next);
        }
    }

    #[test]
    fn test_perfect_ratio_bounds() {
        let f = 261.63;
        assert_eq!(NotationConverter::perfect_ratio(f, 0).unwrap(), f);
        assert_eq!(NotationConverter::perfect_ratio(f, 12).unwrap(), 2.0 * f);
        let fifth = NotationConverter::perfect_ratio(200.0, 7).unwrap();
        assert!((fifth - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_interval_id() {
        assert!(matches!(
            NotationConverter::perfect_ratio(440.0, 13),
            Err(Error::InvalidIntervalId(13))
        ));
        assert!(matches!(
            NotationConverter::interval_name(-1),
            Err(Error::InvalidIntervalId(-1))
        ));
    }

    #[test]
    fn test_interval_table_is_complete() {
        let table = NotationConverter::intervals();
        assert_eq!(table.len(), 13);
        for (expected, row) in table.iter().enumerate() {
            assert_eq!(row.id, expected as IntervalId);
        }
        assert_eq!(
            NotationConverter::interval_name(7).unwrap(),
            "Perfect Fifth (3/2)"
        );
    }
}
