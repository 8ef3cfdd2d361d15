// Audio engine - cpal output stream carrying the click bus
//
// # Format Support
//
// The device's preferred sample format is detected with `sample_format()`:
// - **F32**: native, no conversion
// - **I16**: common on Windows/WASAPI
// - **U16**: rare
//
// Clicks are mixed in mono f32 and converted while being written to the
// interleaved output frame (`write_mono_to_interleaved_frame`), allocation-free.
//
// # Clock
//
// The callback advances the shared `AudioTiming` by the frames it produced,
// so the scheduler reads the same clock the clicks are placed on. The stream
// is built paused and only plays once `resume()` is called; until then the
// clock stands still.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is not Send/Sync. The engine therefore
// stays on the thread that opened it and hands out an `AudioHandle` instead.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{debug, error, info};

use super::device::AudioDeviceManager;
use super::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use super::format_conversion::write_mono_to_interleaved_frame;
use super::handle::AudioHandle;
use super::mixer::ClickMixer;
use super::parameters::Volume;
use super::status::{AtomicDeviceStatus, DeviceStatus};
use super::timing::AudioTiming;
use super::{AudioError, AudioOutput, AudioResult};
use crate::config::OutputConfig;
use crate::messaging::create_command_channel;

/// Volume smoothing time constant
const VOLUME_SMOOTHING_MS: f32 = 10.0;

pub struct AudioEngine {
    _device: Device,
    stream: Stream,
    handle: AudioHandle,
    device_name: String,
    channels: u16,
    pub volume: Volume,
    pub status: AtomicDeviceStatus,
}

impl AudioEngine {
    /// Open the configured output device and build a paused stream on it
    pub fn open(config: &OutputConfig) -> AudioResult<Self> {
        let device = AudioDeviceManager::new().output_device(config.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Audio device: {}", device_name);

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        debug!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();
        let stream_config: StreamConfig = supported_config.into();

        let timing = AudioTiming::new(sample_rate);
        let (producer, consumer) = create_command_channel(config.command_capacity);
        let mixer = ClickMixer::new(consumer);

        let volume = Volume::new(config.volume);
        let status = AtomicDeviceStatus::new(DeviceStatus::Connecting);

        let callback = StreamParts {
            mixer,
            timing: timing.clone(),
            volume: volume.clone(),
            smoother: OnePoleSmoother::new(volume.get(), VOLUME_SMOOTHING_MS, sample_rate as f32),
            status: status.clone(),
            channels: channels.max(1) as usize,
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, callback),
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, callback),
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, callback),
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        }?;

        // Some hosts start streams on creation
        if let Err(e) = stream.pause() {
            debug!("Stream pause not supported: {}", e);
        }

        info!("Audio engine ready: {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            _device: device,
            stream,
            handle: AudioHandle::new(timing, producer),
            device_name,
            channels,
            volume,
            status,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.handle.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Build an output stream for sample type `T`
    ///
    /// The mixer is generated in f32 and converted per frame.
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        parts: StreamParts,
    ) -> AudioResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let StreamParts {
            mut mixer,
            timing,
            volume,
            mut smoother,
            status,
            channels,
        } = parts;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // ========== SACRED ZONE ==========
                // No allocations, No I/O, No blocking locks

                mixer.drain_commands();

                let mut frames = 0;
                for frame in data.chunks_mut(channels) {
                    let gain = smoother.process(volume.get());

                    let mut sample = flush_denormals_to_zero(mixer.next_sample());
                    sample = soft_clip(sample * gain);

                    write_mono_to_interleaved_frame(sample, frame);
                    frames += 1;
                }

                timing.advance(frames);
                // ========== SACRED ZONE END ==========
            },
            move |err| {
                // ========== ERROR CALLBACK ==========
                // Runs outside the audio callback, I/O is fine here
                error!("Audio stream error: {}", err);
                status.set(DeviceStatus::Error);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl AudioOutput for AudioEngine {
    fn handle(&self) -> AudioHandle {
        self.handle.clone()
    }

    fn resume(&self) -> AudioResult<()> {
        if self.status.get() == DeviceStatus::Connected {
            return Ok(());
        }
        self.stream.play()?;
        self.status.set(DeviceStatus::Connected);
        info!("Audio stream running on {}", self.device_name);
        Ok(())
    }
}

/// Everything the realtime callback owns
struct StreamParts {
    mixer: ClickMixer,
    timing: AudioTiming,
    volume: Volume,
    smoother: OnePoleSmoother,
    status: AtomicDeviceStatus,
    channels: usize,
}
