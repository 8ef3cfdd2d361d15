// Look-ahead scheduler - Coarse polling, sample-accurate placement
//
// Each poll schedules every beat whose target time falls inside the
// schedule-ahead window. The poll itself may run late; the audio output
// places each click on its exact sample regardless, as long as it was
// submitted before its target time. The window must therefore exceed the
// worst polling delay.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use super::params::{BeatParams, ParamStore};

/// Scheduler timing, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time between two polls
    pub poll_interval_ms: u64,
    /// How far past "now" beats are committed to the output
    pub schedule_ahead_ms: u64,
    /// Delay between start() and beat 0
    pub startup_offset_ms: u64,
    /// No beat is placed closer to "now" than this
    pub safety_margin_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            schedule_ahead_ms: 100,
            startup_offset_ms: 50,
            safety_margin_ms: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn schedule_ahead_seconds(&self) -> f64 {
        self.schedule_ahead_ms as f64 / 1000.0
    }

    pub fn startup_offset_seconds(&self) -> f64 {
        self.startup_offset_ms as f64 / 1000.0
    }

    pub fn safety_margin_seconds(&self) -> f64 {
        self.safety_margin_ms as f64 / 1000.0
    }
}

/// A beat ready to be rendered: (index, absolute clock time)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub beat: u64,
    pub time: f64,
}

#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    config: SchedulerConfig,
    next_note_time: f64,
    current_beat: u64,
    reanchors: u64,
}

impl LookaheadScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            next_note_time: 0.0,
            current_beat: 0,
            reanchors: 0,
        }
    }

    /// Restart from beat 0, placed `startup_offset` after `now`
    pub fn reset(&mut self, now: f64) {
        self.current_beat = 0;
        self.next_note_time = now + self.config.startup_offset_seconds();
        self.reanchors = 0;
    }

    /// One poll: emit every beat due before `now + schedule_ahead`
    ///
    /// Parameters are loaded once per emitted beat; the interval to the next
    /// beat comes from the tempo in that snapshot. Returns the number of
    /// beats emitted.
    pub fn tick<F>(&mut self, now: f64, params: &ParamStore, mut emit: F) -> usize
    where
        F: FnMut(&ScheduledNote, &BeatParams),
    {
        let horizon = now + self.config.schedule_ahead_seconds();
        let earliest = now + self.config.safety_margin_seconds();
        let mut emitted = 0;

        while self.next_note_time < horizon {
            if self.next_note_time < earliest {
                warn!(
                    "Scheduler {:.1} ms behind at beat {}, re-anchoring beat grid",
                    (earliest - self.next_note_time) * 1000.0,
                    self.current_beat
                );
                self.next_note_time = earliest;
                self.reanchors += 1;
            }

            let snapshot = params.load();
            let note = ScheduledNote {
                beat: self.current_beat,
                time: self.next_note_time,
            };
            emit(&note, &snapshot);

            self.next_note_time += snapshot.beat_duration_seconds();
            self.current_beat += 1;
            emitted += 1;
        }

        emitted
    }

    /// Index of the next beat to be scheduled
    pub fn current_beat(&self) -> u64 {
        self.current_beat
    }

    pub fn next_note_time(&self) -> f64 {
        self.next_note_time
    }

    /// Times the grid was moved because a poll ran too late
    pub fn reanchor_count(&self) -> u64 {
        self.reanchors
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::{AccentPattern, Tempo};
    use crate::sound::SoundProfile;

    fn store(bpm: u32) -> ParamStore {
        ParamStore::new(BeatParams::new(
            Tempo::new(bpm).unwrap(),
            AccentPattern::from_beats_per_measure(4),
            SoundProfile::Digital,
        ))
    }

    /// Poll every 25ms from `from` to `to`, collecting the notes
    fn run(
        scheduler: &mut LookaheadScheduler,
        params: &ParamStore,
        from: f64,
        to: f64,
    ) -> Vec<ScheduledNote> {
        let mut notes = Vec::new();
        let mut now = from;
        while now < to {
            scheduler.tick(now, params, |note, _| notes.push(*note));
            now += 0.025;
        }
        notes
    }

    #[test]
    fn test_reset_places_first_beat_after_offset() {
        let params = store(60);
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
        scheduler.reset(2.0);

        let mut notes = Vec::new();
        let emitted = scheduler.tick(2.0, &params, |note, _| notes.push(*note));
        assert_eq!(emitted, 1);
        assert_eq!(notes[0].beat, 0);
        assert!((notes[0].time - 2.05).abs() < 1e-9);
        assert_eq!(scheduler.current_beat(), 1);
    }

    #[test]
    fn test_nothing_outside_window() {
        let params = store(60);
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
        scheduler.reset(0.0);
        scheduler.tick(0.0, &params, |_, _| {});

        // Beat 1 is at 1.05s, window ends at 0.5 + 0.1
        assert_eq!(scheduler.tick(0.5, &params, |_, _| {}), 0);
        assert_eq!(scheduler.tick(0.96, &params, |_, _| {}), 1);
    }

    #[test]
    fn test_constant_tempo_spacing() {
        for bpm in [1, 37, 60, 120, 199, 240] {
            let params = store(bpm);
            let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
            scheduler.reset(0.0);

            let horizon = 60.0 / bpm as f64 * 6.0;
            let notes = run(&mut scheduler, &params, 0.0, horizon);
            assert!(notes.len() >= 5, "bpm {} produced {} notes", bpm, notes.len());

            for pair in notes.windows(2) {
                assert_eq!(pair[1].beat, pair[0].beat + 1);
                let interval = pair[1].time - pair[0].time;
                assert!((interval - 60.0 / bpm as f64).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_never_schedules_behind_clock() {
        let params = store(240);
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
        scheduler.reset(0.0);

        let mut now = 0.0;
        while now < 5.0 {
            scheduler.tick(now, &params, |note, _| assert!(note.time >= now + 0.005 - 1e-12));
            now += 0.025;
        }
    }

    #[test]
    fn test_tempo_change_applies_to_next_unscheduled_beat() {
        let params = store(60);
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
        scheduler.reset(0.0);

        let mut notes = run(&mut scheduler, &params, 0.0, 1.0);
        assert_eq!(notes.len(), 2); // beats at 0.05 and 1.05

        params.store(BeatParams::new(
            Tempo::new(120).unwrap(),
            AccentPattern::from_beats_per_measure(4),
            SoundProfile::Digital,
        ));
        notes.extend(run(&mut scheduler, &params, 1.0, 3.0));

        // Beat 1 was scheduled at 60 BPM, so beat 2 keeps the 1s gap
        assert!((notes[2].time - 2.05).abs() < 1e-9);
        // From beat 2 on the new tempo applies
        assert!((notes[3].time - 2.55).abs() < 1e-9);
    }

    #[test]
    fn test_late_poll_reanchors_without_skipping_beats() {
        let params = store(120);
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
        scheduler.reset(0.0);

        let mut notes = Vec::new();
        scheduler.tick(0.0, &params, |note, _| notes.push(*note));
        // Poll stalls for 3 seconds
        scheduler.tick(3.0, &params, |note, _| notes.push(*note));

        assert_eq!(scheduler.reanchor_count(), 1);
        assert_eq!(notes.iter().map(|n| n.beat).collect::<Vec<_>>(), vec![0, 1]);
        assert!((notes[1].time - 3.005).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_loaded_per_beat() {
        let params = store(240);
        let mut scheduler = LookaheadScheduler::new(SchedulerConfig {
            schedule_ahead_ms: 1000,
            ..SchedulerConfig::default()
        });
        scheduler.reset(0.0);

        let mut seen = Vec::new();
        scheduler.tick(0.0, &params, |note, snapshot| {
            seen.push((note.beat, snapshot.is_accent(note.beat)));
        });
        assert_eq!(seen, vec![(0, true), (1, false), (2, false), (3, false)]);
    }
}
