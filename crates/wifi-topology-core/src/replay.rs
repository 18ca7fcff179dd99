//! Recording reader and replay pacing.
//!
//! A recording is newline-delimited JSON, one [`Snapshot`] per line. Lines
//! that fail to parse, or parse but are not snapshots, are skipped.
//!
//! Pacing: the delay between entry `i` and `i + 1` is the recorded
//! timestamp delta divided by the replay speed, rounded and clamped to
//! `[40, 15000]` ms. A non-positive delta falls back to the live scan
//! interval.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ReplayError;
use crate::snapshot::Snapshot;

pub const MIN_REPLAY_DELAY_MS: u64 = 40;
pub const MAX_REPLAY_DELAY_MS: u64 = 15_000;
/// Speeds below this are treated as this value.
pub const MIN_REPLAY_SPEED: f64 = 0.1;

/// Unclamped delay between two recorded timestamps at `speed`.
///
/// `None` when the delta is not positive or the result is not finite.
pub fn raw_replay_delay(prev_t: i64, next_t: i64, speed: f64) -> Option<f64> {
    let delta = next_t.checked_sub(prev_t)? as f64;
    if delta <= 0.0 {
        return None;
    }
    let speed = if speed.is_finite() { speed.max(MIN_REPLAY_SPEED) } else { 1.0 };
    let delay = (delta / speed).round();
    delay.is_finite().then_some(delay)
}

/// Paced delay in milliseconds between two recorded entries.
pub fn replay_delay_ms(prev_t: i64, next_t: i64, speed: f64, fallback_ms: u64) -> u64 {
    match raw_replay_delay(prev_t, next_t, speed) {
        Some(delay) => (delay as u64).clamp(MIN_REPLAY_DELAY_MS, MAX_REPLAY_DELAY_MS),
        None => fallback_ms,
    }
}

/// Parse recording text, returning valid snapshots and the number of
/// skipped non-blank lines.
pub fn parse_recording(text: &str) -> (Vec<Snapshot>, usize) {
    let mut entries = Vec::new();
    let mut skipped = 0;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Snapshot>(line) {
            Ok(snap) if snap.is_snapshot() => entries.push(snap),
            Ok(_) => {
                skipped += 1;
                debug!(line = lineno + 1, "skipping non-snapshot line");
            }
            Err(e) => {
                skipped += 1;
                debug!(line = lineno + 1, error = %e, "skipping malformed line");
            }
        }
    }
    (entries, skipped)
}

/// A loaded recording.
#[derive(Debug, Clone)]
pub struct Recording {
    pub path: PathBuf,
    pub entries: Vec<Snapshot>,
    pub skipped: usize,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load a recording. Zero valid entries is an error.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Recording, ReplayError> {
    let path = path.as_ref().to_path_buf();
    let text = fs::read_to_string(&path).map_err(|source| ReplayError::Io {
        path: path.clone(),
        source,
    })?;
    let (entries, skipped) = parse_recording(&text);
    if entries.is_empty() {
        return Err(ReplayError::Empty { path });
    }
    info!(
        path = %path.display(),
        entries = entries.len(),
        skipped,
        "recording loaded"
    );
    Ok(Recording {
        path,
        entries,
        skipped,
    })
}

/// One paced replay step.
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    /// Snapshot stamped with replay metadata.
    pub snapshot: Snapshot,
    /// Wait before the next frame; `None` when the sequence has ended.
    pub delay_ms: Option<u64>,
}

/// Cursor over a recording that yields stamped frames with their pacing.
#[derive(Debug, Clone)]
pub struct ReplayCursor {
    recording: Recording,
    index: usize,
    speed: f64,
    looping: bool,
    finished: bool,
}

impl ReplayCursor {
    pub fn new(recording: Recording, speed: f64, looping: bool) -> Self {
        Self {
            recording,
            index: 0,
            speed,
            looping,
            finished: false,
        }
    }

    pub fn total(&self) -> usize {
        self.recording.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn path(&self) -> &Path {
        &self.recording.path
    }

    /// Emit the current entry and advance.
    ///
    /// At the end of the sequence the cursor wraps to the first entry when
    /// looping (paced with `fallback_ms`, since the delta is negative), or
    /// reports `delay_ms: None` and finishes.
    pub fn next_frame(&mut self, fallback_ms: u64) -> Option<ReplayFrame> {
        if self.finished || self.recording.is_empty() {
            return None;
        }
        let total = self.recording.len();
        let current = &self.recording.entries[self.index];
        let path = self.recording.path.display().to_string();
        let snapshot = current.for_replay(self.index, total, self.speed, &path);

        let delay_ms = if self.index + 1 < total {
            let next = &self.recording.entries[self.index + 1];
            self.index += 1;
            Some(replay_delay_ms(current.t, next.t, self.speed, fallback_ms))
        } else if self.looping {
            let first = &self.recording.entries[0];
            let delay = replay_delay_ms(current.t, first.t, self.speed, fallback_ms);
            self.index = 0;
            Some(delay)
        } else {
            self.finished = true;
            None
        };

        Some(ReplayFrame { snapshot, delay_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_delta_over_speed() {
        assert_eq!(raw_replay_delay(1_000, 1_500, 1.0), Some(500.0));
        assert_eq!(raw_replay_delay(1_000, 1_500, 2.0), Some(250.0));
        assert_eq!(replay_delay_ms(1_000, 1_500, 1.0, 2_000), 500);
    }

    #[test]
    fn delay_clamps() {
        assert_eq!(replay_delay_ms(0, 10, 1.0, 2_000), MIN_REPLAY_DELAY_MS);
        assert_eq!(replay_delay_ms(0, 60_000, 1.0, 2_000), MAX_REPLAY_DELAY_MS);
        // Speed floor: 1000 / 0.1
        assert_eq!(replay_delay_ms(0, 1_000, 0.0, 2_000), 10_000);
    }

    #[test]
    fn non_positive_delta_uses_fallback() {
        assert_eq!(raw_replay_delay(1_000, 1_000, 1.0), None);
        assert_eq!(replay_delay_ms(2_000, 1_000, 1.0, 1_750), 1_750);
        assert_eq!(replay_delay_ms(i64::MIN, i64::MAX, 1.0, 1_750), 1_750);
    }

    #[test]
    fn parse_skips_garbage_and_other_types() {
        let text = "\nnot json\n{\"type\":\"hello\"}\n{\"type\":\"snapshot\"}\n";
        let (entries, skipped) = parse_recording(text);
        assert!(entries.is_empty());
        assert_eq!(skipped, 3);
    }
}
