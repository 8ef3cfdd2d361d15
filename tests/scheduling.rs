// Integration test: look-ahead scheduling against the offline output
//
// The scheduler is polled every 25 frames at 1kHz (one poll per 25ms), the
// same cadence the live scheduler thread uses, and the rendered signal is
// checked for click onsets.

use beatkeeper::sequencer::{BeatRenderer, ParamStore};
use beatkeeper::{
    AccentPattern, AudioOutput, BeatParams, LookaheadScheduler, OfflineEngine, SchedulerConfig,
    SoundBank, SoundProfile, Tempo, TimeSignature,
};

const SAMPLE_RATE: u32 = 1000;
const POLL_FRAMES: usize = 25;

fn params(bpm: u32, accents: AccentPattern) -> BeatParams {
    BeatParams::new(Tempo::new(bpm).unwrap(), accents, SoundProfile::Digital)
}

/// Render `frames` with a poll before every block; `at_frame` runs once when
/// the clock reaches the given frame (before that poll)
fn run<F>(store: &ParamStore, frames: usize, at_frame: Option<(usize, F)>) -> Vec<f32>
where
    F: FnOnce(&ParamStore),
{
    let engine = OfflineEngine::new(SAMPLE_RATE);
    let handle = engine.handle();
    let sounds = SoundBank::default();
    let renderer = BeatRenderer::new(&sounds, &handle);

    let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
    scheduler.reset(handle.now());

    let mut hook = at_frame;
    let mut out = Vec::with_capacity(frames);
    while out.len() < frames {
        if hook.as_ref().is_some_and(|(frame, _)| *frame <= out.len())
            && let Some((_, f)) = hook.take()
        {
            f(store);
        }

        scheduler.tick(handle.now(), store, |note, snapshot| renderer.render(note, snapshot));
        let block = POLL_FRAMES.min(frames - out.len());
        out.extend(engine.render(block));
    }
    out
}

/// Indices where a click starts (non-zero sample after silence)
fn onsets(samples: &[f32]) -> Vec<usize> {
    samples
        .iter()
        .enumerate()
        .filter(|&(i, &s)| s != 0.0 && (i == 0 || samples[i - 1] == 0.0))
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn test_clicks_land_on_beat_grid() {
    let store = ParamStore::new(params(120, AccentPattern::from_beats_per_measure(4)));
    let samples = run::<fn(&ParamStore)>(&store, 2100, None);

    // 50ms startup offset, then every 500ms
    assert_eq!(onsets(&samples), vec![50, 550, 1050, 1550, 2050]);
}

#[test]
fn test_tempo_change_applies_from_next_unscheduled_beat() {
    let store = ParamStore::new(params(60, AccentPattern::from_beats_per_measure(4)));

    // Beat 1 (1.05s) was fixed when beat 0 was scheduled; beat 1 itself is
    // scheduled after the change, so the gap after it is 0.5s.
    let samples = run(
        &store,
        2100,
        Some((500, |store: &ParamStore| {
            store.store(params(120, AccentPattern::from_beats_per_measure(4)))
        })),
    );

    assert_eq!(onsets(&samples), vec![50, 1050, 1550, 2050]);
}

#[test]
fn test_accents_follow_time_signature() {
    let signature: TimeSignature = "3/4".parse().unwrap();
    let store = ParamStore::new(params(240, signature.accent_pattern()));
    let samples = run::<fn(&ParamStore)>(&store, 1600, None);

    let starts = onsets(&samples);
    assert_eq!(starts, vec![50, 300, 550, 800, 1050, 1300, 1550]);

    let levels: Vec<f32> = starts.iter().map(|&i| samples[i]).collect();
    let accent = levels[0];
    let regular = levels[1];
    assert!(accent > regular);
    assert_eq!(levels[3], accent);
    assert_eq!(levels[6], accent);
    assert_eq!(levels[2], regular);
    assert_eq!(levels[4], regular);
}

#[test]
fn test_disabled_accents_play_all_regular() {
    let store = ParamStore::new(params(240, AccentPattern::from_beats_per_measure(0)));
    let samples = run::<fn(&ParamStore)>(&store, 1100, None);

    let starts = onsets(&samples);
    assert_eq!(starts.len(), 5);
    assert!(starts.iter().all(|&i| samples[i] == samples[starts[0]]));
}

#[test]
fn test_late_poll_reanchors_instead_of_bursting() {
    let engine = OfflineEngine::new(SAMPLE_RATE);
    let handle = engine.handle();
    let sounds = SoundBank::default();
    let renderer = BeatRenderer::new(&sounds, &handle);
    let store = ParamStore::new(params(60, AccentPattern::from_beats_per_measure(4)));

    let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
    scheduler.reset(handle.now());
    assert_eq!(scheduler.tick(handle.now(), &store, |n, p| renderer.render(n, p)), 1);

    // Stall for two seconds: beat 1 (1.05s) is now in the past
    let mut samples = engine.render(2000);
    let emitted = scheduler.tick(handle.now(), &store, |n, p| renderer.render(n, p));
    assert_eq!(emitted, 1);
    assert_eq!(scheduler.reanchor_count(), 1);

    samples.extend(engine.render(100));
    assert_eq!(onsets(&samples), vec![50, 2005]);
}

#[test]
fn test_no_click_scheduled_past_window() {
    let engine = OfflineEngine::new(SAMPLE_RATE);
    let handle = engine.handle();
    let sounds = SoundBank::default();
    let renderer = BeatRenderer::new(&sounds, &handle);
    let store = ParamStore::new(params(240, AccentPattern::default()));

    let mut scheduler = LookaheadScheduler::new(SchedulerConfig::default());
    scheduler.reset(handle.now());

    for _ in 0..40 {
        scheduler.tick(handle.now(), &store, |note, snapshot| {
            assert!(note.time < handle.now() + 0.1 + 1e-9);
            renderer.render(note, snapshot);
        });
        engine.render(POLL_FRAMES);
    }
    assert_eq!(scheduler.current_beat(), 5);
}
