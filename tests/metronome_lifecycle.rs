// Integration test: start / stop / restart of a running metronome
//
// The metronome runs its real scheduler and notifier threads against an
// offline output whose clock is advanced by a helper thread at roughly real
// time (240 frames every 5ms at 48kHz).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use beatkeeper::{
    AccentPattern, BeatParams, Metronome, MetronomeConfig, OfflineEngine, SoundProfile,
    StopPolicy, Tempo,
};

const SAMPLE_RATE: u32 = 48000;
const STEP_FRAMES: usize = 240;
const BEAT_TIMEOUT: Duration = Duration::from_secs(2);

/// Advances the offline clock and keeps everything it rendered
struct Clock {
    engine: OfflineEngine,
    running: Arc<AtomicBool>,
    rendered: Arc<Mutex<Vec<f32>>>,
    worker: Option<JoinHandle<()>>,
}

impl Clock {
    fn start(engine: OfflineEngine) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let rendered = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let engine = engine.clone();
            let running = Arc::clone(&running);
            let rendered = Arc::clone(&rendered);
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let block = engine.render(STEP_FRAMES);
                    rendered.lock().unwrap().extend(block);
                    thread::sleep(Duration::from_millis(5));
                }
            })
        };

        Self {
            engine,
            running,
            rendered,
            worker: Some(worker),
        }
    }

    fn position(&self) -> u64 {
        self.engine.timing().current_sample()
    }

    fn rendered_from(&self, start: usize) -> Vec<f32> {
        let rendered = self.rendered.lock().unwrap();
        rendered.get(start..).map(<[f32]>::to_vec).unwrap_or_default()
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn setup(policy: StopPolicy) -> (Metronome<OfflineEngine>, Clock, Receiver<u64>) {
    let engine = OfflineEngine::new(SAMPLE_RATE);
    let opened = engine.clone();
    let config = MetronomeConfig {
        stop_policy: policy,
        ..MetronomeConfig::default()
    };
    let metronome = Metronome::new(&config, move || Ok(opened.clone()));

    let (tx, rx) = mpsc::channel();
    metronome.set_params(
        BeatParams::new(
            Tempo::new(240).unwrap(),
            AccentPattern::from_beats_per_measure(4),
            SoundProfile::Digital,
        )
        .with_callback(move |beat| {
            let _ = tx.send(beat);
        }),
    );

    (metronome, Clock::start(engine), rx)
}

fn drain(rx: &Receiver<u64>) -> Vec<u64> {
    rx.try_iter().collect()
}

#[test]
fn test_beats_notified_in_order() {
    let (mut metronome, _clock, rx) = setup(StopPolicy::PlayOut);
    metronome.start().unwrap();

    let beats: Vec<u64> = (0..4).map(|_| rx.recv_timeout(BEAT_TIMEOUT).unwrap()).collect();
    assert_eq!(beats, vec![0, 1, 2, 3]);

    metronome.stop();
}

#[test]
fn test_silence_stop_cancels_pending_clicks() {
    let (mut metronome, clock, rx) = setup(StopPolicy::Silence);
    metronome.start().unwrap();
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 0);
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 1);

    metronome.stop();
    let stopped_at = clock.position() as usize;
    thread::sleep(Duration::from_millis(400));

    // Only a click already sounding may finish its 80ms decay
    let tail_start = stopped_at + SAMPLE_RATE as usize / 10;
    let tail = clock.rendered_from(tail_start);
    assert!(tail.len() > SAMPLE_RATE as usize / 10);
    assert!(tail.iter().all(|&s| s == 0.0));

    drain(&rx);
    thread::sleep(Duration::from_millis(300));
    assert!(drain(&rx).is_empty());
}

#[test]
fn test_play_out_stop_schedules_nothing_new() {
    let (mut metronome, _clock, rx) = setup(StopPolicy::PlayOut);
    metronome.start().unwrap();
    let last_before_stop = (0..3)
        .map(|_| rx.recv_timeout(BEAT_TIMEOUT).unwrap())
        .last()
        .unwrap();

    metronome.stop();
    assert!(!metronome.is_running());

    // Beats already inside the 100ms window still notify, at 240 BPM at most one
    thread::sleep(Duration::from_millis(400));
    let late = drain(&rx);
    assert!(late.len() <= 1, "unexpected beats after stop: {:?}", late);
    assert!(late.iter().all(|&beat| beat == last_before_stop + 1));

    thread::sleep(Duration::from_millis(300));
    assert!(drain(&rx).is_empty());
}

#[test]
fn test_restart_begins_at_beat_zero() {
    let (mut metronome, _clock, rx) = setup(StopPolicy::Silence);
    metronome.start().unwrap();
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 0);
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 1);
    metronome.stop();

    thread::sleep(Duration::from_millis(100));
    drain(&rx);

    metronome.start().unwrap();
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 0);
    metronome.stop();
}

#[test]
fn test_play_out_leftovers_do_not_leak_into_restart() {
    let (mut metronome, _clock, rx) = setup(StopPolicy::PlayOut);
    metronome.start().unwrap();
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 0);
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 1);

    // Beat 2 is 250ms after beat 1, so it is already queued 200ms in
    thread::sleep(Duration::from_millis(200));
    metronome.stop();
    drain(&rx);

    let restarted = Instant::now();
    metronome.start().unwrap();
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 0);
    assert!(restarted.elapsed() >= Duration::from_millis(40));
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 1);

    metronome.stop();
}

#[test]
fn test_new_callback_applies_to_later_beats_only() {
    let (mut metronome, _clock, rx) = setup(StopPolicy::PlayOut);
    metronome.start().unwrap();
    assert_eq!(rx.recv_timeout(BEAT_TIMEOUT).unwrap(), 0);

    let (tx, replaced) = mpsc::channel();
    let params = (*metronome.params()).clone().with_callback(move |beat| {
        let _ = tx.send(beat);
    });
    metronome.set_params(params);

    let first_new = replaced.recv_timeout(BEAT_TIMEOUT).unwrap();
    let second_new = replaced.recv_timeout(BEAT_TIMEOUT).unwrap();
    assert!(first_new >= 1);
    assert_eq!(second_new, first_new + 1);

    // The old callback only saw beats scheduled before the swap
    let old = drain(&rx);
    assert!(old.iter().all(|&beat| beat < first_new));

    metronome.stop();
}
