//! Vowel grid creation.
//!
//! A [`VowelGrid`] is the parametric description of one steady vowel: pitch,
//! duration and the oral formant ladder. Above F4 the ladder continues at
//! `formant_frequency_interval` steps with bandwidths proportional to frequency.

use crate::error::{Error, Result};
use crate::params::{ParamValue, SynthesisRequest};

pub const MAX_FORMANTS: usize = klatt::MAX_ORAL_FORMANTS;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formant {
    /// Hz
    pub frequency: f64,
    /// Hz
    pub bandwidth: f64,
}

/// Bounds that depend on the deployment rather than on the request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLimits {
    pub sample_rate: u32,
    /// longest vowel accepted, in seconds
    pub max_duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VowelGrid {
    pub name: String,
    /// seconds
    pub duration: f64,
    /// Hz
    pub pitch: f64,
    pub formants: Vec<Formant>,
}

fn number(name: &str, value: &ParamValue) -> Result<f64> {
    match value {
        ParamValue::Number(n) if n.is_finite() => Ok(*n),
        ParamValue::Number(n) => Err(Error::validation(name, format!("{n} is not finite"))),
        ParamValue::Text(text) => Err(Error::validation(
            name,
            format!("expected a number, got {text:?}"),
        )),
    }
}

impl VowelGrid {
    /// # Errors
    ///
    /// [`Error::Validation`] when a numeric field holds text or a non-finite
    /// number, or the duration is outside `(0, max_duration]`.
    pub fn from_request(request: &SynthesisRequest, limits: &GridLimits) -> Result<Self> {
        let duration = number("duration", &request.duration)?;
        let pitch = number("pitch", &request.pitch)?;
        let f1 = number("f1", &request.f1)?;
        let b1 = number("b1", &request.b1)?;
        let f2 = number("f2", &request.f2)?;
        let b2 = number("b2", &request.b2)?;
        let f3 = number("f3", &request.f3)?;
        let b3 = number("b3", &request.b3)?;
        let f4 = number("f4", &request.f4)?;
        let bandwidth_fraction = number("bandwidth_fraction", &request.bandwidth_fraction)?;
        let interval = number(
            "formant_frequency_interval",
            &request.formant_frequency_interval,
        )?;

        if duration <= 0.0 || duration > limits.max_duration {
            return Err(Error::validation(
                "duration",
                format!("must be within (0, {}] seconds", limits.max_duration),
            ));
        }

        let mut formants: Vec<Formant> = [(f1, b1), (f2, b2), (f3, b3), (f4, f4 * bandwidth_fraction)]
            .into_iter()
            .filter(|(frequency, _)| *frequency > 0.0)
            .map(|(frequency, bandwidth)| Formant {
                frequency,
                bandwidth,
            })
            .collect();

        let nyquist = f64::from(limits.sample_rate) / 2.0;
        if f4 > 0.0 && interval > 0.0 {
            let mut frequency = f4 + interval;
            while formants.len() < MAX_FORMANTS && frequency < nyquist {
                formants.push(Formant {
                    frequency,
                    bandwidth: frequency * bandwidth_fraction,
                });
                frequency += interval;
            }
        }

        Ok(VowelGrid {
            name: request.label.clone(),
            duration,
            pitch,
            formants,
        })
    }
}
