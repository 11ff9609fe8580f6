mod output;
mod voice;

pub use output::{CpalOutput, CpalPlayer, NullPlayer, PlayerError};
pub use voice::{AdsrConfig, Voice};

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}
