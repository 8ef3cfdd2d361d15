// Beat parameters - Live tempo / accent / profile / callback snapshot
//
// The control side replaces the whole snapshot at once; the scheduler loads
// it once per beat it schedules, so a change applies from the next
// unscheduled beat and never to a beat already handed to the audio output.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::timeline::{AccentPattern, Tempo};
use crate::sound::SoundProfile;

/// Called with the beat index when that beat becomes audible
pub type BeatCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Clone, Default)]
pub struct BeatParams {
    pub tempo: Tempo,
    pub accents: AccentPattern,
    pub profile: SoundProfile,
    pub on_beat: Option<BeatCallback>,
}

impl BeatParams {
    pub fn new(tempo: Tempo, accents: AccentPattern, profile: SoundProfile) -> Self {
        Self {
            tempo,
            accents,
            profile,
            on_beat: None,
        }
    }

    pub fn with_callback<F>(mut self, on_beat: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.on_beat = Some(Arc::new(on_beat));
        self
    }

    #[inline]
    pub fn is_accent(&self, beat: u64) -> bool {
        self.accents.is_accent(beat)
    }

    pub fn beat_duration_seconds(&self) -> f64 {
        self.tempo.beat_duration_seconds()
    }
}

impl fmt::Debug for BeatParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeatParams")
            .field("tempo", &self.tempo)
            .field("accents", &self.accents)
            .field("profile", &self.profile)
            .field("on_beat", &self.on_beat.as_ref().map(|_| "Fn(u64)"))
            .finish()
    }
}

/// Shared slot holding the current snapshot
pub struct ParamStore {
    current: Mutex<Arc<BeatParams>>,
}

impl ParamStore {
    pub fn new(params: BeatParams) -> Self {
        Self {
            current: Mutex::new(Arc::new(params)),
        }
    }

    pub fn load(&self) -> Arc<BeatParams> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn store(&self, params: BeatParams) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(params);
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new(BeatParams::default())
    }
}

impl fmt::Debug for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParamStore").field(&self.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_store_replaces_snapshot_whole() {
        let store = ParamStore::default();
        let before = store.load();

        store.store(BeatParams::new(
            Tempo::new(90).unwrap(),
            AccentPattern::Disabled,
            SoundProfile::Wood,
        ));
        let after = store.load();

        // Earlier loads are unaffected
        assert_eq!(before.tempo.bpm(), 120);
        assert_eq!(after.tempo.bpm(), 90);
        assert_eq!(after.profile, SoundProfile::Wood);
        assert!(!after.is_accent(0));
    }

    #[test]
    fn test_callback_is_carried() {
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let params = BeatParams::default().with_callback(move |beat| {
            counter.fetch_add(beat + 1, Ordering::SeqCst);
        });

        if let Some(cb) = params.on_beat.as_ref() {
            cb(4);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 5);
        assert!(format!("{:?}", params).contains("Fn(u64)"));
    }
}
