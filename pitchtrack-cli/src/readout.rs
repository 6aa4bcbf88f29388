//! One-line terminal readout of the published pitch.

use pitchtrack_core::PublishedPitch;
use pitchtrack_core::tuning;

const METER_WIDTH: usize = 21;

/// Formats `value` as `"A3   +12c  221.6 Hz  [.....|....]  conf 0.91 stab 0.98"`.
pub fn format_readout(value: &PublishedPitch) -> String {
    let Some(note) = tuning::nearest_note(value.pitch) else {
        return format!("{:<4} {:>5}  {:>8}  {}", "--", "", "no pitch", meter(None));
    };
    format!(
        "{:<4} {:>+4.0}c  {:>5.1} Hz  {}  conf {:.2} stab {:.2}",
        note.name,
        note.cents,
        value.pitch,
        meter(Some(note.cents)),
        value.confidence,
        value.stability
    )
}

/// A small cents meter, centre = in tune, edges = ±50 cents.
fn meter(cents: Option<f32>) -> String {
    let mut cells = vec!['.'; METER_WIDTH];
    let centre = METER_WIDTH / 2;
    cells[centre] = '|';
    if let Some(cents) = cents {
        let offset = (cents.clamp(-50.0, 50.0) / 50.0 * centre as f32).round() as isize;
        let idx = (centre as isize + offset).clamp(0, METER_WIDTH as isize - 1) as usize;
        cells[idx] = '#';
    }
    format!("[{}]", cells.into_iter().collect::<String>())
}
