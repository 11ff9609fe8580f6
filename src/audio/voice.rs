/// Minimal ADSR-shaped sine voice for the built-in player. Synthesis
/// quality is a non-goal; this exists so the demo binary is audible and
/// the note-on/off path has a real consumer.

#[derive(Debug, Clone, Copy)]
pub struct AdsrConfig {
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
    /// 0.0 -> 1.0
    pub sustain: f32,
    /// Seconds
    pub release: f32,
}

impl Default for AdsrConfig {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.08,
            sustain: 0.6,
            release: 0.12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub pitch: u8,
    velocity: u8,
    phase: f32,
    stage: Stage,
    stage_time: f32,
    level: f32,
    /// Envelope level captured at note-off, faded out over `release`.
    release_from: f32,
}

impl Voice {
    pub fn new(pitch: u8, velocity: u8) -> Self {
        Self {
            pitch,
            velocity,
            phase: 0.0,
            stage: Stage::Attack,
            stage_time: 0.0,
            level: 0.0,
            release_from: 0.0,
        }
    }

    pub fn release(&mut self) {
        if self.stage != Stage::Release {
            self.stage = Stage::Release;
            self.stage_time = 0.0;
            self.release_from = self.level;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Release && self.level <= 1e-4
    }

    /// Renders one mono sample and advances phase and envelope by 1/rate.
    pub fn next_sample(&mut self, adsr: &AdsrConfig, sample_rate: f32) -> f32 {
        let dt = 1.0 / sample_rate;

        let envelope = match self.stage {
            Stage::Attack => {
                let level = if adsr.attack == 0.0 {
                    1.0
                } else {
                    (self.stage_time / adsr.attack).min(1.0)
                };
                if self.stage_time >= adsr.attack {
                    self.stage = Stage::Decay;
                    self.stage_time = 0.0;
                }
                level
            }
            Stage::Decay => {
                let progress = if adsr.decay == 0.0 {
                    1.0
                } else {
                    (self.stage_time / adsr.decay).min(1.0)
                };
                if self.stage_time >= adsr.decay {
                    self.stage = Stage::Sustain;
                }
                1.0 - (1.0 - adsr.sustain) * progress
            }
            Stage::Sustain => adsr.sustain,
            Stage::Release => {
                let progress = if adsr.release == 0.0 {
                    1.0
                } else {
                    (self.stage_time / adsr.release).min(1.0)
                };
                self.release_from * (1.0 - progress)
            }
        };

        self.level = envelope;

        let sample = (self.phase * 2.0 * std::f32::consts::PI).sin();
        self.phase += super::midi_to_freq(self.pitch) / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.stage_time += dt;

        sample * envelope * (self.velocity as f32 / 127.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_ramps_from_silence() {
        let adsr = AdsrConfig {
            attack: 0.01,
            ..AdsrConfig::default()
        };
        let mut voice = Voice::new(69, 127);
        let first = voice.next_sample(&adsr, 44_100.0);
        assert!(first.abs() < 0.01);
        assert!(!voice.is_finished());
    }

    #[test]
    fn released_voice_decays_to_silence() {
        let adsr = AdsrConfig::default();
        let mut voice = Voice::new(60, 100);
        for _ in 0..4410 {
            voice.next_sample(&adsr, 44_100.0);
        }
        voice.release();
        for _ in 0..44_100 {
            voice.next_sample(&adsr, 44_100.0);
        }
        assert!(voice.is_finished());
    }
}
