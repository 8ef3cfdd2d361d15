pub mod loader;

pub use loader::{DecodeError, DecodedSound, decode_bytes, load_sound};
