//! # Note Naming Module
//!
//! Maps a frequency to the nearest equal-tempered note (A4 = 440 Hz) and its
//! deviation in cents. Used for readouts and session summaries; the pitch
//! pipeline itself works in Hz only.
//!
//! The table spans MIDI notes 21 (A0) to 108 (C8), which comfortably covers
//! the human voice and anything else the detector's band allows.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Lowest MIDI note in the table (A0).
pub const LOWEST_MIDI: u8 = 21;
/// Highest MIDI note in the table (C8).
pub const HIGHEST_MIDI: u8 = 108;

const A4_MIDI: f32 = 69.0;
const A4_HZ: f32 = 440.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Nearest-note lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note name with octave (e.g. "A4", "C#3").
    pub name: String,
    pub midi: u8,
    /// Equal-tempered frequency of the note in Hz.
    pub frequency: f32,
    /// Deviation of the measured frequency from `frequency`, in cents.
    pub cents: f32,
}

#[derive(Debug)]
struct TableEntry {
    name: String,
    midi: u8,
    frequency: f32,
}

/// All notes from A0 to C8, computed once.
static NOTES: Lazy<Vec<TableEntry>> = Lazy::new(|| {
    (LOWEST_MIDI..=HIGHEST_MIDI)
        .map(|midi| {
            let octave = i32::from(midi) / 12 - 1;
            TableEntry {
                name: format!("{}{}", NOTE_NAMES[usize::from(midi % 12)], octave),
                midi,
                frequency: midi_to_frequency(midi),
            }
        })
        .collect()
});

pub fn midi_to_frequency(midi: u8) -> f32 {
    A4_HZ * 2.0_f32.powf((f32::from(midi) - A4_MIDI) / 12.0)
}

/// Finds the closest note to `freq`.
///
/// # Returns
/// * `None` for 0, negative or non-finite input (the "no pitch" state)
/// * Otherwise the closest table entry; frequencies outside the table snap to
///   A0 or C8 with a correspondingly large cents value
pub fn nearest_note(freq: f32) -> Option<Note> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }

    let semitones = A4_MIDI + 12.0 * (freq / A4_HZ).log2();
    let midi = semitones
        .round()
        .clamp(f32::from(LOWEST_MIDI), f32::from(HIGHEST_MIDI)) as u8;
    let entry = &NOTES[usize::from(midi - LOWEST_MIDI)];

    Some(Note {
        name: entry.name.clone(),
        midi: entry.midi,
        frequency: entry.frequency,
        cents: cents_between(freq, entry.frequency),
    })
}

/// Interval from `reference` to `freq` in cents (positive = sharp).
pub fn cents_between(freq: f32, reference: f32) -> f32 {
    1200.0 * (freq / reference).log2()
}
