//! Rendering of a [`VowelGrid`] into a waveform.

use klatt::{FrameParms, GlottalSourceType, MainParms, generate_sound};
use rand::{SeedableRng, rngs::SmallRng};
use tracing::debug;

use crate::error::{Error, Result};
use crate::grid::VowelGrid;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_SEED: u64 = 69;

/// Mono samples at a fixed sample rate. Immutable once rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Turns a vowel grid into samples.
pub trait Synthesizer: Send + Sync {
    /// # Errors
    ///
    /// [`Error::Synthesis`] when the grid cannot be rendered, e.g. a formant at
    /// or above the Nyquist frequency or a non-positive bandwidth.
    fn render(&self, grid: &VowelGrid) -> Result<SampleBuffer>;
}

/// Cascade Klatt synthesizer. Every render starts from the same seed, so equal
/// grids give equal samples.
#[derive(Debug, Clone, Copy)]
pub struct KlattSynthesizer {
    sample_rate: u32,
    glottal_source: GlottalSourceType,
    seed: u64,
}

impl Default for KlattSynthesizer {
    fn default() -> Self {
        KlattSynthesizer::new(DEFAULT_SAMPLE_RATE, GlottalSourceType::Impulsive, DEFAULT_SEED)
    }
}

impl KlattSynthesizer {
    pub fn new(sample_rate: u32, glottal_source: GlottalSourceType, seed: u64) -> Self {
        KlattSynthesizer {
            sample_rate,
            glottal_source,
            seed,
        }
    }

    fn frame(grid: &VowelGrid) -> FrameParms {
        FrameParms {
            duration: grid.duration,
            f0: grid.pitch,
            flutter_level: 0.25,
            open_phase_ratio: 0.7,
            breathiness_db: -25.0,
            tilt_db: 0.0,
            // AGC, the encoder rescales to full range anyway
            gain_db: f64::NAN,
            agc_rms_level: 0.18,
            oral_formant_freq: grid.formants.iter().map(|f| f.frequency).collect(),
            oral_formant_bw: grid.formants.iter().map(|f| f.bandwidth).collect(),
            voicing_db: 0.0,
            aspiration_db: -99.0,
            aspiration_mod: 0.5,
        }
    }
}

impl Synthesizer for KlattSynthesizer {
    fn render(&self, grid: &VowelGrid) -> Result<SampleBuffer> {
        let m_parms = MainParms {
            sample_rate: self.sample_rate as usize,
            glottal_source_type: self.glottal_source,
        };
        let rng = SmallRng::seed_from_u64(self.seed);
        let samples = generate_sound(&m_parms, &[Self::frame(grid)], rng)
            .map_err(|err| Error::Synthesis(err.to_owned()))?;

        debug!(
            name = %grid.name,
            samples = samples.len(),
            formants = grid.formants.len(),
            "rendered vowel"
        );
        Ok(SampleBuffer::new(samples, self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Formant, GridLimits};
    use crate::params::SynthesisRequest;

    fn default_grid() -> VowelGrid {
        let limits = GridLimits {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_duration: 10.0,
        };
        VowelGrid::from_request(&SynthesisRequest::default(), &limits).unwrap()
    }

    #[test]
    fn renders_half_a_second() {
        let buffer = KlattSynthesizer::default().render(&default_grid()).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.len(), 22050);
        assert!(buffer.samples().iter().any(|s| *s != 0.0));
        assert!(buffer.samples().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn renders_are_repeatable() {
        let synth = KlattSynthesizer::new(16000, GlottalSourceType::Natural, 5);
        let grid = VowelGrid {
            formants: default_grid().formants[..4].to_vec(),
            ..default_grid()
        };
        assert_eq!(synth.render(&grid).unwrap(), synth.render(&grid).unwrap());
    }

    #[test]
    fn zero_pitch_is_silent() {
        let grid = VowelGrid {
            pitch: 0.0,
            ..default_grid()
        };
        let buffer = KlattSynthesizer::default().render(&grid).unwrap();
        assert!(buffer.samples().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn engine_rejections_are_synthesis_errors() {
        let mut grid = default_grid();
        grid.formants[0] = Formant {
            frequency: 30000.0,
            bandwidth: 50.0,
        };
        assert!(matches!(
            KlattSynthesizer::default().render(&grid),
            Err(Error::Synthesis(_))
        ));

        grid.formants[0] = Formant {
            frequency: 800.0,
            bandwidth: -1.0,
        };
        assert!(matches!(
            KlattSynthesizer::default().render(&grid),
            Err(Error::Synthesis(_))
        ));
    }
}
