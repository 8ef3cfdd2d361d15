// Audio Export - Offline rendering of a metronome run to WAV
//
// Drives the same look-ahead scheduler and beat renderer as live playback,
// against an OfflineEngine instead of a device. Processing runs as fast as
// possible; the scheduler is polled once per block.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{WavSpec, WavWriter};
use log::info;

use super::format_conversion::f32_to_i16;
use super::offline::{DEFAULT_COMMAND_CAPACITY, OfflineEngine};
use super::{AudioError, AudioOutput, AudioResult};
use crate::sequencer::params::{BeatParams, ParamStore};
use crate::sequencer::renderer::BeatRenderer;
use crate::sequencer::scheduler::{LookaheadScheduler, SchedulerConfig};
use crate::sound::SoundBank;

/// Frames rendered between two scheduler polls
pub const BLOCK_SIZE: usize = 512;

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_path: PathBuf,
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// 1 = mono, 2 = the mono click duplicated on both channels
    pub channels: u16,
    pub volume: f32,
    pub scheduler: SchedulerConfig,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("metronome.wav"),
            sample_rate: 48000,
            channels: 2,
            volume: 0.8,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Progress callback for export (reports 0.0 to 1.0)
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub frames: u64,
    pub beats: u64,
}

pub struct AudioExporter {
    settings: ExportSettings,
}

impl AudioExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Render `duration_seconds` of clicks to the configured WAV file
    ///
    /// Beat 0 lands after the scheduler's startup offset, as it does live.
    pub fn export(
        &self,
        params: &BeatParams,
        sounds: &SoundBank,
        duration_seconds: f64,
        mut progress: Option<ProgressCallback>,
    ) -> AudioResult<ExportReport> {
        let total_frames = self.total_frames(duration_seconds)?;
        if !(1..=2).contains(&self.settings.channels) {
            return Err(AudioError::InvalidExport(format!(
                "{} channels (expected 1 or 2)",
                self.settings.channels
            )));
        }

        let spec = WavSpec {
            channels: self.settings.channels,
            sample_rate: self.settings.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = self.settings.output_path.as_path();
        let mut writer = WavWriter::create(path, spec)?;

        info!(
            "Exporting {:.2}s ({} frames) at {} Hz to {}",
            duration_seconds,
            total_frames,
            self.settings.sample_rate,
            path.display()
        );

        let channels = self.settings.channels;
        let beats = self.render_blocks(
            params,
            sounds,
            total_frames,
            |block| write_block(&mut writer, block, channels),
            progress.as_mut(),
        )?;
        writer.finalize()?;

        info!("Export complete: {} beats", beats);
        Ok(ExportReport {
            path: path.to_path_buf(),
            frames: total_frames,
            beats,
        })
    }

    /// Same render, kept in memory as mono f32
    pub fn render_samples(
        &self,
        params: &BeatParams,
        sounds: &SoundBank,
        duration_seconds: f64,
    ) -> AudioResult<Vec<f32>> {
        let total_frames = self.total_frames(duration_seconds)?;
        let mut samples = Vec::with_capacity(total_frames as usize);
        self.render_blocks(
            params,
            sounds,
            total_frames,
            |block| {
                samples.extend_from_slice(block);
                Ok(())
            },
            None,
        )?;
        Ok(samples)
    }

    fn total_frames(&self, duration_seconds: f64) -> AudioResult<u64> {
        if !(duration_seconds > 0.0 && duration_seconds.is_finite()) {
            return Err(AudioError::InvalidExport(format!(
                "duration {} s must be > 0",
                duration_seconds
            )));
        }
        if self.settings.sample_rate == 0 {
            return Err(AudioError::InvalidExport("sample rate must be > 0".into()));
        }
        Ok((duration_seconds * self.settings.sample_rate as f64).round() as u64)
    }

    /// Returns the number of beats starting inside `total_frames`
    fn render_blocks<S>(
        &self,
        params: &BeatParams,
        sounds: &SoundBank,
        total_frames: u64,
        mut sink: S,
        mut progress: Option<&mut ProgressCallback>,
    ) -> AudioResult<u64>
    where
        S: FnMut(&[f32]) -> AudioResult<()>,
    {
        let engine = OfflineEngine::with_capacity(self.settings.sample_rate, DEFAULT_COMMAND_CAPACITY)
            .with_gain(self.settings.volume);
        let handle = engine.handle();
        let store = ParamStore::new(params.clone());
        let renderer = BeatRenderer::new(sounds, &handle);

        let mut scheduler = LookaheadScheduler::new(self.settings.scheduler);
        scheduler.reset(handle.now());

        let end_time = total_frames as f64 / self.settings.sample_rate as f64;
        let mut beats: u64 = 0;

        let mut buffer = [0.0f32; BLOCK_SIZE];
        let mut rendered: u64 = 0;
        let progress_interval = self.settings.sample_rate as u64;
        let mut next_progress = progress_interval;

        while rendered < total_frames {
            scheduler.tick(handle.now(), &store, |note, snapshot| {
                // The window may reach past the end of the file
                if note.time < end_time {
                    beats += 1;
                }
                renderer.render(note, snapshot)
            });

            let frames = BLOCK_SIZE.min((total_frames - rendered) as usize);
            engine.render_into(&mut buffer[..frames]);
            sink(&buffer[..frames])?;
            rendered += frames as u64;

            if rendered >= next_progress {
                next_progress += progress_interval;
                if let Some(callback) = progress.as_mut() {
                    callback(rendered as f32 / total_frames as f32);
                }
            }
        }

        if let Some(callback) = progress.as_mut() {
            callback(1.0);
        }

        Ok(beats)
    }
}

fn write_block(
    writer: &mut WavWriter<BufWriter<File>>,
    block: &[f32],
    channels: u16,
) -> AudioResult<()> {
    for &sample in block {
        let value = f32_to_i16(sample);
        for _ in 0..channels {
            writer.write_sample(value)?;
        }
    }
    Ok(())
}

/// Convenience: export with default settings to `path`
pub fn export_to_wav(
    path: &Path,
    params: &BeatParams,
    sounds: &SoundBank,
    duration_seconds: f64,
) -> AudioResult<ExportReport> {
    AudioExporter::new(ExportSettings {
        output_path: path.to_path_buf(),
        ..ExportSettings::default()
    })
    .export(params, sounds, duration_seconds, None)
}
