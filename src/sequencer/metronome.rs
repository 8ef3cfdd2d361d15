// Metronome - Owner of the beat scheduler, its output and its parameters
//
// One Metronome drives one output. The output is opened lazily on the first
// start() or set_custom_sounds() call (a device may refuse to run before a
// user action) and reused afterwards. start() spawns the `beat-scheduler`
// thread; stop() cancels and joins it, so two schedulers never run at once.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::notifier::{BeatNotifier, NotifierHandle};
use super::params::{BeatParams, ParamStore};
use super::renderer::BeatRenderer;
use super::scheduler::{LookaheadScheduler, SchedulerConfig};
use crate::audio::{AudioEngine, AudioError, AudioHandle, AudioOutput, AudioResult};
use crate::config::MetronomeConfig;
use crate::sampler::{DecodedSound, decode_bytes};
use crate::sound::SoundBank;

/// What happens to clicks already handed to the output when stop() runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Submitted clicks and their notifications still happen, until the
    /// next start() discards whatever is left of them
    #[default]
    PlayOut,
    /// Pending clicks and notifications are cancelled; a click already
    /// sounding finishes its decay
    Silence,
}

impl FromStr for StopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "play-out" | "playout" => Ok(StopPolicy::PlayOut),
            "silence" => Ok(StopPolicy::Silence),
            _ => Err(format!("unknown stop policy '{}' (expected play-out or silence)", s)),
        }
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPolicy::PlayOut => f.write_str("play-out"),
            StopPolicy::Silence => f.write_str("silence"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetronomeError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("failed to spawn {name} thread: {source}")]
    Thread {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Result of decoding one custom sound slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    Loaded,
    /// No data supplied; the slot was emptied
    Cleared,
    /// Data could not be decoded; the slot was emptied
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomSoundsOutcome {
    pub accent: SlotOutcome,
    pub regular: SlotOutcome,
    /// False when a newer set_custom_sounds() call superseded this one
    pub installed: bool,
}

/// Completion of a set_custom_sounds() call
pub struct CustomSoundsTask {
    rx: Receiver<CustomSoundsOutcome>,
}

impl CustomSoundsTask {
    /// Block until decoding finished; None if the decoder never ran
    pub fn wait(self) -> Option<CustomSoundsOutcome> {
        self.rx.recv().ok()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<CustomSoundsOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn try_result(&self) -> Option<CustomSoundsOutcome> {
        self.rx.try_recv().ok()
    }
}

type OutputOpener<O> = Box<dyn FnMut() -> AudioResult<O>>;

pub struct Metronome<O: AudioOutput> {
    config: SchedulerConfig,
    stop_policy: StopPolicy,
    params: Arc<ParamStore>,
    sounds: Arc<RwLock<SoundBank>>,
    custom_generation: Arc<AtomicU64>,
    opener: OutputOpener<O>,
    output: Option<O>,
    notifier: Option<BeatNotifier>,
    task: Option<SchedulerTask>,
}

impl Metronome<AudioEngine> {
    /// Metronome on the configured cpal output device
    pub fn with_default_output(config: &MetronomeConfig) -> Self {
        let output = config.output.clone();
        Self::new(config, move || AudioEngine::open(&output))
    }
}

impl<O: AudioOutput> Metronome<O> {
    /// `opener` is called once, the first time an output is needed
    pub fn new<F>(config: &MetronomeConfig, opener: F) -> Self
    where
        F: FnMut() -> AudioResult<O> + 'static,
    {
        Self {
            config: config.scheduler,
            stop_policy: config.stop_policy,
            params: Arc::new(ParamStore::new(config.defaults.to_params())),
            sounds: Arc::new(RwLock::new(SoundBank::new(&config.sounds))),
            custom_generation: Arc::new(AtomicU64::new(0)),
            opener: Box::new(opener),
            output: None,
            notifier: None,
            task: None,
        }
    }

    /// Replace the live parameters; applies from the next unscheduled beat
    pub fn set_params(&self, params: BeatParams) {
        debug!("Params: {:?}", params);
        self.params.store(params);
    }

    pub fn params(&self) -> Arc<BeatParams> {
        self.params.load()
    }

    pub fn stop_policy(&self) -> StopPolicy {
        self.stop_policy
    }

    pub fn set_stop_policy(&mut self, policy: StopPolicy) {
        self.stop_policy = policy;
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// The output, once it has been opened
    pub fn output(&self) -> Option<&O> {
        self.output.as_ref()
    }

    /// Read access to the sound bank (custom buffers included)
    pub fn with_sounds<R>(&self, f: impl FnOnce(&SoundBank) -> R) -> R {
        f(&self.sounds.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Start from beat 0; a no-op while already running
    ///
    /// Clicks and notifications still playing out from the previous run are
    /// dropped so the first notification is beat 0. Only failing to open or
    /// start the audio output is reported.
    pub fn start(&mut self) -> Result<(), MetronomeError> {
        if self.task.is_some() {
            debug!("Metronome already running");
            return Ok(());
        }

        self.discard_pending();
        let output = self.ensure_output()?.handle();
        let notifier = self.ensure_notifier()?;

        let mut scheduler = LookaheadScheduler::new(self.config);
        scheduler.reset(output.now());

        let task = SchedulerTask::spawn(
            scheduler,
            Arc::clone(&self.params),
            Arc::clone(&self.sounds),
            output,
            notifier,
        )
        .map_err(|source| MetronomeError::Thread {
            name: "beat-scheduler",
            source,
        })?;
        self.task = Some(task);

        let params = self.params.load();
        info!(
            "Metronome started: {}, {}, {} sound",
            params.tempo, params.accents, params.profile
        );
        Ok(())
    }

    /// Stop scheduling; a no-op while stopped
    pub fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let last_beat = task.stop();

        if self.stop_policy == StopPolicy::Silence {
            self.discard_pending();
        }

        info!("Metronome stopped after {} beats ({})", last_beat, self.stop_policy);
    }

    /// Decode and install custom accent / regular sounds in the background
    ///
    /// `None` clears a slot. Undecodable data clears the slot and is logged;
    /// beats with an empty slot fall back to the Digital click.
    pub fn set_custom_sounds(
        &mut self,
        accent: Option<Vec<u8>>,
        regular: Option<Vec<u8>>,
    ) -> CustomSoundsTask {
        if let Err(e) = self.ensure_output() {
            warn!("Audio output unavailable while loading custom sounds: {}", e);
        }

        let generation = self.custom_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel();
        let job = CustomSoundsJob {
            accent,
            regular,
            generation,
            current: Arc::clone(&self.custom_generation),
            sounds: Arc::clone(&self.sounds),
        };

        let spawned = thread::Builder::new()
            .name("custom-sounds".to_string())
            .spawn(move || {
                let _ = tx.send(job.run());
            });
        if let Err(e) = spawned {
            error!("Could not spawn custom sound decoder: {}", e);
        }

        CustomSoundsTask { rx }
    }

    // Clicks not yet started and notifications not yet fired
    fn discard_pending(&self) {
        if let Some(output) = self.output.as_ref()
            && let Err(e) = output.handle().cancel_pending()
        {
            warn!("Could not cancel pending clicks: {}", e);
        }
        if let Some(notifier) = self.notifier.as_ref() {
            notifier.handle().cancel_pending();
        }
    }

    fn ensure_output(&mut self) -> AudioResult<&O> {
        let output = match self.output.take() {
            Some(output) => output,
            None => {
                info!("Opening audio output");
                (self.opener)()?
            }
        };
        let output = self.output.insert(output);
        output.resume()?;
        Ok(output)
    }

    fn ensure_notifier(&mut self) -> Result<NotifierHandle, MetronomeError> {
        if let Some(notifier) = self.notifier.as_ref() {
            return Ok(notifier.handle());
        }
        let notifier = BeatNotifier::spawn().map_err(|source| MetronomeError::Thread {
            name: "beat-notifier",
            source,
        })?;
        Ok(self.notifier.insert(notifier).handle())
    }
}

impl<O: AudioOutput> Drop for Metronome<O> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The repeating poll: tick, then wait one poll interval or until cancelled
struct SchedulerTask {
    cancel: Sender<()>,
    worker: JoinHandle<u64>,
}

impl SchedulerTask {
    fn spawn(
        mut scheduler: LookaheadScheduler,
        params: Arc<ParamStore>,
        sounds: Arc<RwLock<SoundBank>>,
        output: AudioHandle,
        notifier: NotifierHandle,
    ) -> std::io::Result<Self> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let poll_interval = scheduler.config().poll_interval();

        let worker = thread::Builder::new()
            .name("beat-scheduler".to_string())
            .spawn(move || {
                loop {
                    {
                        let sounds = sounds.read().unwrap_or_else(PoisonError::into_inner);
                        let renderer = BeatRenderer::new(&sounds, &output).with_notifier(&notifier);
                        scheduler.tick(output.now(), &params, |note, snapshot| {
                            renderer.render(note, snapshot)
                        });
                    }

                    match cancelled.recv_timeout(poll_interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                if scheduler.reanchor_count() > 0 {
                    warn!(
                        "Scheduler re-anchored {} times during the run",
                        scheduler.reanchor_count()
                    );
                }
                scheduler.current_beat()
            })?;

        Ok(Self { cancel, worker })
    }

    /// Cancel the poll and wait for the thread; returns beats scheduled
    fn stop(self) -> u64 {
        let _ = self.cancel.send(());
        match self.worker.join() {
            Ok(beats) => beats,
            Err(_) => {
                error!("Scheduler thread panicked");
                0
            }
        }
    }
}

struct CustomSoundsJob {
    accent: Option<Vec<u8>>,
    regular: Option<Vec<u8>>,
    generation: u64,
    current: Arc<AtomicU64>,
    sounds: Arc<RwLock<SoundBank>>,
}

impl CustomSoundsJob {
    fn run(self) -> CustomSoundsOutcome {
        let (accent, accent_outcome) = decode_slot("accent", self.accent);
        let (regular, regular_outcome) = decode_slot("regular", self.regular);

        let mut sounds = self.sounds.write().unwrap_or_else(PoisonError::into_inner);
        let installed = self.current.load(Ordering::SeqCst) == self.generation;
        if installed {
            sounds.set_custom_sounds(accent, regular);
            info!(
                "Custom sounds installed (accent: {:?}, regular: {:?})",
                accent_outcome, regular_outcome
            );
        } else {
            debug!("Custom sounds #{} superseded, discarded", self.generation);
        }

        CustomSoundsOutcome {
            accent: accent_outcome,
            regular: regular_outcome,
            installed,
        }
    }
}

fn decode_slot(slot: &str, data: Option<Vec<u8>>) -> (Option<DecodedSound>, SlotOutcome) {
    let Some(bytes) = data else {
        return (None, SlotOutcome::Cleared);
    };
    match decode_bytes(bytes, None) {
        Ok(sound) => {
            debug!(
                "Decoded {} sound: {:.3}s at {} Hz",
                slot,
                sound.duration_seconds(),
                sound.sample_rate()
            );
            (Some(sound), SlotOutcome::Loaded)
        }
        Err(e) => {
            warn!("Could not decode {} sound, using Digital click: {}", slot, e);
            (None, SlotOutcome::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OfflineEngine;

    fn offline_metronome() -> (Metronome<OfflineEngine>, OfflineEngine) {
        let engine = OfflineEngine::new(48000);
        let shared = engine.clone();
        let metronome = Metronome::new(&MetronomeConfig::default(), move || Ok(shared.clone()));
        (metronome, engine)
    }

    #[test]
    fn test_stop_policy_parse() {
        assert_eq!("play-out".parse(), Ok(StopPolicy::PlayOut));
        assert_eq!("PLAY_OUT".parse(), Ok(StopPolicy::PlayOut));
        assert_eq!("silence".parse(), Ok(StopPolicy::Silence));
        assert!("later".parse::<StopPolicy>().is_err());
        assert_eq!(StopPolicy::default(), StopPolicy::PlayOut);
    }

    #[test]
    fn test_double_start_and_double_stop_are_noops() {
        let (mut metronome, _engine) = offline_metronome();
        assert!(!metronome.is_running());

        metronome.stop();
        metronome.start().unwrap();
        metronome.start().unwrap();
        assert!(metronome.is_running());

        metronome.stop();
        metronome.stop();
        assert!(!metronome.is_running());
    }

    #[test]
    fn test_output_opened_once() {
        let engine = OfflineEngine::new(48000);
        let opened = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&opened);
        let mut metronome = Metronome::new(&MetronomeConfig::default(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(engine.clone())
        });

        assert!(metronome.output().is_none());
        metronome.start().unwrap();
        metronome.stop();
        metronome.start().unwrap();
        let _ = metronome.set_custom_sounds(None, None).wait();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_failure_is_reported_by_start() {
        let mut metronome: Metronome<OfflineEngine> =
            Metronome::new(&MetronomeConfig::default(), || Err(AudioError::NoDevice));

        assert!(matches!(
            metronome.start(),
            Err(MetronomeError::Audio(AudioError::NoDevice))
        ));
        assert!(!metronome.is_running());
    }

    #[test]
    fn test_garbage_custom_sound_is_cleared_not_raised() {
        let (mut metronome, _engine) = offline_metronome();
        let outcome = metronome
            .set_custom_sounds(Some(b"not audio".to_vec()), None)
            .wait()
            .unwrap();

        assert_eq!(outcome.accent, SlotOutcome::Failed);
        assert_eq!(outcome.regular, SlotOutcome::Cleared);
        assert!(outcome.installed);
        assert!(metronome.with_sounds(|bank| bank.custom().accent().is_none()));
    }

    #[test]
    fn test_params_roundtrip() {
        let (metronome, _engine) = offline_metronome();
        let mut params = (*metronome.params()).clone();
        params.tempo = crate::sequencer::Tempo::new(77).unwrap();
        metronome.set_params(params);
        assert_eq!(metronome.params().tempo.bpm(), 77);
    }
}
