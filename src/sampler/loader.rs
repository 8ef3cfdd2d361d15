// Custom sound decoding - Encoded audio bytes to a playable mono buffer
//
// Any container/codec enabled in symphonia's default registry is accepted
// (WAV/PCM, FLAC, Vorbis, MP3). Multichannel input is averaged down to mono;
// the source sample rate is kept and compensated at playback time.

use std::io::{self, Cursor};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Custom sound decoding errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unrecognised audio format: {0}")]
    UnsupportedFormat(#[source] SymphoniaError),

    #[error("No decodable audio track")]
    NoTrack,

    #[error("Decoding failed: {0}")]
    Codec(#[source] SymphoniaError),

    #[error("Decoded stream contains no samples")]
    Empty,

    #[error("Decoded stream reports a sample rate of 0 Hz")]
    ZeroSampleRate,

    #[error("Malformed audio data")]
    Malformed,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A fully decoded, ready-to-play mono sound
#[derive(Debug, Clone)]
pub struct DecodedSound {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedSound {
    pub fn new(samples: Arc<[f32]>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Mono samples
    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the source before downmixing
    pub fn source_channels(&self) -> u16 {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Decode an in-memory encoded sound
///
/// `extension` is an optional format hint ("wav", "mp3", ...); probing works
/// without it for formats with a recognisable header.
///
/// Malformed headers can make the demuxer panic (a zero sample rate in a WAV
/// `fmt` chunk does); that is reported as `DecodeError::Malformed`.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedSound, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    panic::catch_unwind(AssertUnwindSafe(|| decode_stream(bytes, extension)))
        .map_err(|_| DecodeError::Malformed)?
}

fn decode_stream(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedSound, DecodeError> {

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let stream = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(DecodeError::UnsupportedFormat)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(DecodeError::Codec(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!("skipping corrupt packet: {reason}");
                continue;
            }
            Err(err) => return Err(DecodeError::Codec(err)),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity() as u64;
        sample_rate.get_or_insert(spec.rate);
        if channels == 0 {
            channels = spec.channels.count();
        }

        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(capacity, spec));
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    let sample_rate = sample_rate.ok_or(DecodeError::Empty)?;
    if sample_rate == 0 {
        return Err(DecodeError::ZeroSampleRate);
    }
    let samples = downmix_to_mono(&interleaved, channels.max(1));
    if samples.is_empty() {
        return Err(DecodeError::Empty);
    }

    debug!(
        "decoded {} frames ({} ch @ {} Hz)",
        samples.len(),
        channels,
        sample_rate
    );

    Ok(DecodedSound {
        samples: samples.into(),
        sample_rate,
        channels: channels as u16,
    })
}

/// Read and decode a sound file, using its extension as a format hint
pub fn load_sound(path: &Path) -> Result<DecodedSound, DecodeError> {
    let bytes = std::fs::read(path)?;
    let extension = path.extension().and_then(|ext| ext.to_str());
    let sound = decode_bytes(bytes, extension)?;
    info!(
        "loaded sound {:?} ({:.3}s)",
        path.file_name().unwrap_or_default(),
        sound.duration_seconds()
    );
    Ok(sound)
}

fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
