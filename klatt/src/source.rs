//! Excitation signals: glottal pulse trains and noise.

use core::f64::consts::PI;
use libm::{cos, pow, sqrt};
use rand::Rng;

use crate::filter::{LpFilter1, Resonator};

/// Returns a random number within the range -1 .. 1.
pub(crate) fn white_noise<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(-1.0..=1.0)
}

/// A low-pass filtered noise source.
pub(crate) struct LpNoiseSource<R> {
    lp_filter: LpFilter1,
    rng: R,
}

impl<R: Rng> LpNoiseSource<R> {
    pub fn new(sample_rate: usize, rng: R) -> Result<Self, &'static str> {
        // The classic synthesizer used a first order LP filter with b=0.75 at 10 kHz.
        // Keep its gain at 1000 Hz and rescale for our sample rate.
        let old_b = 0.75;
        let old_sample_rate = 10000.0;
        let f = 1000.0;
        let g = (1.0 - old_b)
            / sqrt(1.0 - 2.0 * old_b * cos(2.0 * PI * f / old_sample_rate) + pow(old_b, 2.0));

        // compensate amplitude for output range -1 .. +1
        let extra_gain = 2.5 * pow(sample_rate as f64 / old_sample_rate, 0.33);

        let mut lp_filter = LpFilter1::new(sample_rate);
        lp_filter.set(f, g, extra_gain)?;
        Ok(LpNoiseSource { lp_filter, rng })
    }

    pub fn next(&mut self) -> f64 {
        let x = white_noise(&mut self.rng);
        self.lp_filter.step(x)
    }
}

/// Shape of the voicing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlottalSourceType {
    /// LP filtered pulse train.
    Impulsive,
    /// KLGLOTT88 glottal flow derivative.
    Natural,
    /// White noise, for whispered vowels.
    Noise,
}

/// Generates a glottal source signal by LP filtering a pulse train.
pub(crate) struct ImpulsiveGlottalSource {
    sample_rate: usize,
    /// resonator used as an LP filter, `None` while voicing is off
    resonator: Option<Resonator>,
    /// current sample position within F0 period
    position_in_period: usize,
}

impl ImpulsiveGlottalSource {
    fn new(sample_rate: usize) -> Self {
        ImpulsiveGlottalSource {
            sample_rate,
            resonator: None,
            position_in_period: 0,
        }
    }

    /// `open_phase_length` is the open glottis phase of the F0 period, in samples.
    fn start_period(&mut self, open_phase_length: usize) -> Result<(), &'static str> {
        if open_phase_length == 0 {
            self.resonator = None;
            return Ok(());
        }
        let bw = (self.sample_rate as f64) / (open_phase_length as f64);
        let resonator = self
            .resonator
            .get_or_insert_with(|| Resonator::new(self.sample_rate));
        resonator.set(0.0, bw, 1.0)?;
        resonator.adjust_impulse_gain(1.0);
        self.position_in_period = 0;
        Ok(())
    }

    fn next(&mut self) -> f64 {
        let Some(resonator) = self.resonator.as_mut() else {
            return 0.0;
        };
        let pulse = match self.position_in_period {
            1 => 1.0,
            2 => -1.0,
            _ => 0.0,
        };
        self.position_in_period += 1;
        resonator.step(pulse)
    }
}

/// Generates a "natural" glottal source signal according to the KLGLOTT88 model.
/// Formula of the glottal flow: `t^2 - t^3`
/// Formula of the derivative: `2 * t - 3 * t^2`
/// The derivative is used as the glottal source.
pub(crate) struct NaturalGlottalSource {
    /// current signal value
    x: f64,
    /// current first derivative
    a: f64,
    /// current second derivative
    b: f64,
    /// open glottis phase length in samples
    open_phase_length: usize,
    /// current sample position within F0 period
    position_in_period: usize,
}

impl NaturalGlottalSource {
    fn new() -> Self {
        NaturalGlottalSource {
            x: 0.0,
            a: 0.0,
            b: 0.0,
            open_phase_length: 0,
            position_in_period: 0,
        }
    }

    fn start_period(&mut self, open_phase_length: usize) {
        let amplification = 5.0;
        self.open_phase_length = open_phase_length;
        self.x = 0.0;
        self.position_in_period = 0;
        if open_phase_length == 0 {
            self.a = 0.0;
            self.b = 0.0;
            return;
        }
        self.b = -amplification / pow(open_phase_length as f64, 2.0);
        self.a = -self.b * open_phase_length as f64 / 3.0;
    }

    fn next(&mut self) -> f64 {
        self.position_in_period += 1;
        if self.position_in_period >= self.open_phase_length {
            self.x = 0.0;
            return 0.0;
        }
        self.a += self.b;
        self.x += self.a;
        self.x
    }
}

pub(crate) enum GlottalSource {
    Impulsive(ImpulsiveGlottalSource),
    Natural(NaturalGlottalSource),
    Noise,
}

impl GlottalSource {
    pub fn new(kind: GlottalSourceType, sample_rate: usize) -> Self {
        match kind {
            GlottalSourceType::Impulsive => {
                GlottalSource::Impulsive(ImpulsiveGlottalSource::new(sample_rate))
            }
            GlottalSourceType::Natural => GlottalSource::Natural(NaturalGlottalSource::new()),
            GlottalSourceType::Noise => GlottalSource::Noise,
        }
    }

    pub fn start_period(&mut self, open_phase_length: usize) -> Result<(), &'static str> {
        match self {
            GlottalSource::Impulsive(source) => source.start_period(open_phase_length),
            GlottalSource::Natural(source) => {
                source.start_period(open_phase_length);
                Ok(())
            }
            GlottalSource::Noise => Ok(()),
        }
    }

    pub fn next<R: Rng>(&mut self, rng: &mut R) -> f64 {
        match self {
            GlottalSource::Impulsive(source) => source.next(),
            GlottalSource::Natural(source) => source.next(),
            GlottalSource::Noise => white_noise(rng),
        }
    }
}
