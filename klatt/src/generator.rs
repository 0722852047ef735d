use alloc::{vec, vec::Vec};
use core::f64::consts::PI;
use libm::{pow, round, sin, sqrt};
use rand::Rng;

use crate::filter::{LpFilter1, Resonator};
use crate::source::{GlottalSource, GlottalSourceType, LpNoiseSource, white_noise};

pub const MAX_ORAL_FORMANTS: usize = 6;

/// Parameters for the whole sound.
pub struct MainParms {
    /// sample rate in Hz
    pub sample_rate: usize,
    pub glottal_source_type: GlottalSourceType,
}

/// Parameters for a sound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameParms {
    /// frame duration in seconds
    pub duration: f64,
    /// fundamental frequency in Hz, 0 or below for an unvoiced frame
    pub f0: f64,
    /// F0 flutter level, 0 .. 1, typically 0.25
    pub flutter_level: f64,
    /// relative length of the open phase of the glottis, 0 .. 1, typically 0.7
    pub open_phase_ratio: f64,
    /// breathiness in voicing (turbulence) in dB, positive to amplify or negative to attenuate
    pub breathiness_db: f64,
    /// spectral tilt for glottal source in dB. Attenuation at 3 kHz in dB. 0 = no tilt.
    pub tilt_db: f64,
    /// overall gain (output gain) in dB, positive to amplify, negative to attenuate, NaN for automatic gain control (AGC)
    pub gain_db: f64,
    /// RMS level for automatic gain control (AGC), only relevant when `gain_db` is NaN
    pub agc_rms_level: f64,
    /// oral formant frequencies in Hz, or NaN
    pub oral_formant_freq: Vec<f64>,
    /// oral formant bandwidths in Hz, or NaN
    pub oral_formant_bw: Vec<f64>,
    /// voicing amplitude in dB
    pub voicing_db: f64,
    /// aspiration (glottis noise) amplitude in dB, -99 or below to disable
    pub aspiration_db: f64,
    /// amplitude modulation factor for aspiration, 0 = no modulation, 1 = maximum modulation
    pub aspiration_mod: f64,
}

impl FrameParms {
    // a duration is always positive here, so the rounded value fits
    #[allow(clippy::cast_sign_loss)]
    fn sample_count(&self, sample_rate: usize) -> Result<usize, &'static str> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err("Invalid frame duration.");
        }
        Ok(round(self.duration * sample_rate as f64) as usize)
    }
}

/// Linear levels of the currently active frame.
#[derive(Default)]
struct FrameState {
    breathiness_lin: f64,
    gain_lin: f64,
    voicing_lin: f64,
    aspiration_lin: f64,
    aspiration_mod: f64,
}

impl FrameState {
    fn new(f_parms: &FrameParms) -> Self {
        // AGC frames are rendered at unity gain and scaled afterwards.
        let gain_db = if f_parms.gain_db.is_finite() {
            f_parms.gain_db
        } else {
            0.0
        };
        FrameState {
            breathiness_lin: db_to_lin(f_parms.breathiness_db),
            gain_lin: db_to_lin(gain_db),
            voicing_lin: db_to_lin(f_parms.voicing_db),
            aspiration_lin: db_to_lin(f_parms.aspiration_db),
            aspiration_mod: f_parms.aspiration_mod,
        }
    }
}

/// F0 period state
#[derive(Default)]
struct PeriodState {
    /// period length in samples
    period_length: usize,
    /// open glottis phase length in samples
    open_phase_length: usize,
    /// current sample position within F0 period
    position_in_period: usize,
}

/// Sound generator controller.
struct Generator<'a, R> {
    m_parms: &'a MainParms,
    /// currently active frame parameters
    f_parms: Option<&'a FrameParms>,
    /// new frame parameters for start of next F0 period
    new_f_parms: Option<&'a FrameParms>,
    f_state: FrameState,
    p_state: PeriodState,
    /// current absolute sample position
    abs_position: usize,
    /// spectral tilt filter
    tilt_filter: LpFilter1,
    /// output low-pass filter
    output_lp_filter: Resonator,
    /// random value for flutter time offset, in seconds
    flutter_time_offset: f64,
    glottal_source: GlottalSource,
    aspiration_source: LpNoiseSource<R>,
    oral_formants: Vec<Resonator>,
    rng: R,
}

impl<'a, R: Rng + Clone> Generator<'a, R> {
    fn new(m_parms: &'a MainParms, mut rng: R) -> Result<Self, &'static str> {
        let sample_rate = m_parms.sample_rate;
        let mut output_lp_filter = Resonator::new(sample_rate);
        output_lp_filter.set(0.0, sample_rate as f64 / 2.0, 1.0)?;

        Ok(Generator {
            m_parms,
            f_parms: None,
            new_f_parms: None,
            f_state: FrameState::default(),
            p_state: PeriodState::default(),
            abs_position: 0,
            tilt_filter: LpFilter1::new(sample_rate),
            output_lp_filter,
            flutter_time_offset: f64::from(rng.random_range(0..=1000_u32)),
            glottal_source: GlottalSource::new(m_parms.glottal_source_type, sample_rate),
            aspiration_source: LpNoiseSource::new(sample_rate, rng.clone())?,
            oral_formants: (0..MAX_ORAL_FORMANTS)
                .map(|_| Resonator::new(sample_rate))
                .collect(),
            rng,
        })
    }

    /// Fills `out_buf` with the next part of the sound.
    /// The length of the frame is `out_buf.len()`; `f_parms.duration` is ignored.
    fn generate_frame(
        &mut self,
        f_parms: &'a FrameParms,
        out_buf: &mut [f64],
    ) -> Result<(), &'static str> {
        self.new_f_parms = Some(f_parms);
        for out in out_buf.iter_mut() {
            if self.p_state.position_in_period >= self.p_state.period_length {
                self.start_new_period()?;
            }
            *out = self.next_sample();
            self.p_state.position_in_period += 1;
            self.abs_position += 1;
        }

        // automatic gain control (AGC)
        if f_parms.gain_db.is_nan() {
            adjust_signal_gain(out_buf, f_parms.agc_rms_level);
        }
        Ok(())
    }

    fn next_sample(&mut self) -> f64 {
        let p_state = &self.p_state;

        let mut voice = self.glottal_source.next(&mut self.rng);
        voice = self.tilt_filter.step(voice);
        if p_state.position_in_period < p_state.open_phase_length {
            voice += white_noise(&mut self.rng) * self.f_state.breathiness_lin;
        }

        let aspiration_mod = if p_state.position_in_period >= p_state.period_length / 2 {
            self.f_state.aspiration_mod
        } else {
            0.0
        };
        let aspiration = self.aspiration_source.next()
            * self.f_state.aspiration_lin
            * (1.0 - aspiration_mod);

        let mut v = voice * self.f_state.voicing_lin + aspiration;
        for formant in &mut self.oral_formants {
            v = formant.step(v);
        }
        self.output_lp_filter.step(v) * self.f_state.gain_lin
    }

    // period_length is derived from a positive f0 only
    #[allow(clippy::cast_sign_loss)]
    fn start_new_period(&mut self) -> Result<(), &'static str> {
        if let Some(new_f_parms) = self.new_f_parms.take() {
            // New frame parameters are only activated at the start of a F0 period to reduce glitches.
            self.start_using_frame_parameters(new_f_parms)?;
            self.f_parms = Some(new_f_parms);
        }
        let Some(f_parms) = self.f_parms else {
            return Err("No frame parameters.");
        };

        let sample_rate = self.m_parms.sample_rate as f64;
        let flutter_time = self.abs_position as f64 / sample_rate + self.flutter_time_offset;
        let f0 = perform_frequency_modulation(f_parms.f0, f_parms.flutter_level, flutter_time);

        let period_length = if f0 > 0.0 {
            round(sample_rate / f0) as usize
        } else {
            1
        };
        let open_phase_length = if period_length > 1 {
            round(period_length as f64 * f_parms.open_phase_ratio) as usize
        } else {
            0
        };

        self.p_state = PeriodState {
            period_length,
            open_phase_length,
            position_in_period: 0,
        };
        self.glottal_source.start_period(open_phase_length)
    }

    fn start_using_frame_parameters(&mut self, f_parms: &FrameParms) -> Result<(), &'static str> {
        self.f_state = FrameState::new(f_parms);

        if f_parms.tilt_db == 0.0 {
            self.tilt_filter.set_passthrough();
        } else {
            self.tilt_filter
                .set(3000.0, db_to_lin(-f_parms.tilt_db), 1.0)?;
        }

        for (i, formant) in self.oral_formants.iter_mut().enumerate() {
            let f = f_parms.oral_formant_freq.get(i).copied().unwrap_or(f64::NAN);
            let bw = f_parms.oral_formant_bw.get(i).copied().unwrap_or(f64::NAN);
            if f.is_finite() && bw.is_finite() {
                formant.set(f, bw, 1.0)?;
            } else {
                formant.set_passthrough();
            }
        }
        Ok(())
    }
}

/// Modulates the fundamental frequency (F0).
///
/// Sine-wave frequencies of 12.7, 7.1 and 4.7 Hz were chosen so as to ensure
/// a long period before repetition of the perturbation that is introduced.
/// A value of flutterLevel = 0.25 results in synthetic vowels with a quite
/// realistic deviation from constant pitch.
///
/// ### params
/// ```text
///    f0 = Fundamental frequency.
///    flutter_level = Flutter level between 0 and 1.
///    time = Relative signal position in seconds.
/// ```
pub(crate) fn perform_frequency_modulation(f0: f64, flutter_level: f64, time: f64) -> f64 {
    if flutter_level <= 0.0 {
        return f0;
    }
    let w = 2.0 * PI * time;
    let a = sin(12.7 * w) + sin(7.1 * w) + sin(4.7 * w);
    f0 * (1.0 + a * flutter_level / 50.0)
}

/// Convert a dB value into a linear value.
/// dB values of -99 and below or NaN are converted to 0.
pub(crate) fn db_to_lin(db: f64) -> f64 {
    if db <= -99.0 || db.is_nan() {
        0.0
    } else {
        pow(10.0, db / 20.0)
    }
}

fn adjust_signal_gain(buf: &mut [f64], target_rms: f64) {
    if buf.is_empty() {
        return;
    }
    let rms = compute_rms(buf);
    if rms == 0.0 {
        return;
    }
    let r = target_rms / rms;
    for b_i in buf.iter_mut() {
        *b_i *= r;
    }
}

pub(crate) fn compute_rms(buf: &[f64]) -> f64 {
    sqrt(buf.iter().map(|f| pow(*f, 2.0)).sum::<f64>() / buf.len() as f64)
}

/// Generates a sound that consists of multiple frames.
///
/// # Errors
///
/// Returns a static str if a frame has an invalid duration or filter parameters
/// (formants at or above the Nyquist frequency, non-positive bandwidths).
pub fn generate_sound<R: Rng + Clone>(
    m_parms: &MainParms,
    f_parms_a: &[FrameParms],
    rng: R,
) -> Result<Vec<f64>, &'static str> {
    let frame_lengths = f_parms_a
        .iter()
        .map(|f_parms| f_parms.sample_count(m_parms.sample_rate))
        .collect::<Result<Vec<_>, _>>()?;
    let mut out_buf = vec![0.0; frame_lengths.iter().sum()];

    let mut generator = Generator::new(m_parms, rng)?;
    let mut out_buf_pos = 0;
    for (f_parms, frame_len) in f_parms_a.iter().zip(frame_lengths) {
        let frame_buf = &mut out_buf[out_buf_pos..out_buf_pos + frame_len];
        generator.generate_frame(f_parms, frame_buf)?;
        out_buf_pos += frame_len;
    }
    Ok(out_buf)
}
