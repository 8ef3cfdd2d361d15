// Format conversion - f32 mix → device / file sample formats
//
// The click bus is mixed in mono f32. cpal devices may want f32, i16 or u16
// interleaved frames; WAV export writes 16-bit PCM. All conversions are
// allocation-free and safe to call from the audio callback.

use cpal::{FromSample, Sample};

/// Convert an f32 sample to i16, clamping to [-1, 1]
///
/// Positive values scale by i16::MAX and negative by 32768 so both ends of
/// the range are reachable.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Write a mono sample to every channel of one interleaved output frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(internal_sample);
    }
}
