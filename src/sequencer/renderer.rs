// Beat renderer - Turns a scheduled note into a click and a notification

use std::sync::Arc;

use log::warn;

use super::notifier::NotifierHandle;
use super::params::BeatParams;
use super::scheduler::ScheduledNote;
use crate::audio::AudioHandle;
use crate::sound::SoundBank;

pub struct BeatRenderer<'a> {
    sounds: &'a SoundBank,
    output: &'a AudioHandle,
    notifier: Option<&'a NotifierHandle>,
}

impl<'a> BeatRenderer<'a> {
    pub fn new(sounds: &'a SoundBank, output: &'a AudioHandle) -> Self {
        Self {
            sounds,
            output,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a NotifierHandle) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Submit the click for `note` and queue its beat notification
    ///
    /// Never blocks. A click that cannot be queued is logged and dropped;
    /// the notification for that beat is still sent.
    pub fn render(&self, note: &ScheduledNote, params: &BeatParams) {
        let accent = params.is_accent(note.beat);
        let voice = self
            .sounds
            .get(params.profile)
            .voice(accent, self.output.sample_rate() as f32);

        if let Err(e) = self.output.schedule(note.time, note.beat, voice) {
            warn!("Beat {} not scheduled: {}", note.beat, e);
        }

        if let (Some(notifier), Some(on_beat)) = (self.notifier, params.on_beat.as_ref()) {
            let delay = self.output.timing().delay_until(note.time);
            notifier.notify_after(note.beat, delay, Arc::clone(on_beat));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioOutput, OfflineEngine};
    use crate::sequencer::notifier::BeatNotifier;
    use crate::sequencer::timeline::{AccentPattern, Tempo};
    use crate::sound::SoundProfile;
    use std::sync::mpsc;
    use std::time::Duration;

    fn params(profile: SoundProfile) -> BeatParams {
        BeatParams::new(
            Tempo::new(60).unwrap(),
            AccentPattern::from_beats_per_measure(4),
            profile,
        )
    }

    #[test]
    fn test_click_lands_at_note_time() {
        let engine = OfflineEngine::new(48000);
        let handle = engine.handle();
        let sounds = SoundBank::default();

        BeatRenderer::new(&sounds, &handle).render(
            &ScheduledNote {
                beat: 0,
                time: 0.01,
            },
            &params(SoundProfile::Digital),
        );

        let out = engine.render(1000);
        let first = out.iter().position(|&s| s != 0.0);
        assert_eq!(first, Some(480));
    }

    #[test]
    fn test_notification_sent_with_beat_index() {
        let engine = OfflineEngine::new(48000);
        let handle = engine.handle();
        let sounds = SoundBank::default();
        let notifier = BeatNotifier::spawn().unwrap();
        let notifier_handle = notifier.handle();

        let (tx, rx) = mpsc::channel();
        let params = params(SoundProfile::Wood).with_callback(move |beat| {
            let _ = tx.send(beat);
        });

        let renderer = BeatRenderer::new(&sounds, &handle).with_notifier(&notifier_handle);
        renderer.render(&ScheduledNote { beat: 5, time: 0.0 }, &params);

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(5));
    }

    #[test]
    fn test_full_queue_does_not_panic() {
        let engine = OfflineEngine::with_capacity(48000, 1);
        let handle = engine.handle();
        let sounds = SoundBank::default();
        let renderer = BeatRenderer::new(&sounds, &handle);

        for beat in 0..3 {
            renderer.render(
                &ScheduledNote {
                    beat,
                    time: beat as f64,
                },
                &params(SoundProfile::Metallic),
            );
        }
        assert_eq!(handle.queued(), 1);
    }
}
