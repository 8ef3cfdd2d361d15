// Module synth - Click synthesis building blocks

pub mod envelope;
pub mod filter;
pub mod noise;
pub mod oscillator;
pub mod voice;

pub use voice::{ClickVoice, NoiseBurst, Partial, SampleVoice, SynthVoice};
