//! Recursive filters used by the synthesizer.
//!
//! Every filter starts out in passthrough mode, where `step` returns its input.

use core::f64::consts::PI;
use libm::{cos, exp, pow, sqrt};

/// A first-order IIR LP filter.
///
/// # Formulas:
/// ```text
///    y[n] = a * x[n] + b * y[n-1]
///    H(w) = a / ( 1 - b * e^(-jw) )
///    |H(0)| = a / (1 - b)                                 for b < 1
/// ```
/// ## Determine b for a given gain g at frequency f and |H(0)| = 1:
/// ```text
///    q = (1 - g^2 * cos(w)) / (1 - g^2)
///    b = q - sqrt(q^2 - 1)
/// ```
pub(crate) struct LpFilter1 {
    sample_rate: usize,
    /// filter coefficient a
    a: f64,
    /// filter coefficient b
    b: f64,
    /// y[n-1], last output value
    y1: f64,
    passthrough: bool,
}

impl LpFilter1 {
    pub fn new(sample_rate: usize) -> Self {
        LpFilter1 {
            sample_rate,
            a: 0.0,
            b: 0.0,
            y1: 0.0,
            passthrough: true,
        }
    }

    /// Adjusts the filter parameters without resetting the inner state.
    /// ### params
    /// ```text
    ///    f = Frequency at which the gain is specified.
    ///    g = Gain at frequency f. Between 0 and 1.
    ///    extra_gain = Resulting DC gain.
    /// ```
    pub fn set(&mut self, f: f64, g: f64, extra_gain: f64) -> Result<(), &'static str> {
        if f.is_nan()
            || g.is_nan()
            || f <= 0.0
            || f >= self.sample_rate as f64 / 2.0
            || g <= 0.0
            || g >= 1.0
            || !extra_gain.is_finite()
        {
            return Err("Invalid filter parameters.");
        }

        let w = 2.0 * PI * f / (self.sample_rate as f64);
        let g2 = pow(g, 2.0);
        let q = (1.0 - g2 * cos(w)) / (1.0 - g2);
        self.b = q - sqrt(pow(q, 2.0) - 1.0);
        self.a = (1.0 - self.b) * extra_gain;
        self.passthrough = false;
        Ok(())
    }

    pub fn set_passthrough(&mut self) {
        self.passthrough = true;
        self.y1 = 0.0;
    }

    pub fn step(&mut self, x: f64) -> f64 {
        if self.passthrough {
            return x;
        }
        let y = self.a * x + self.b * self.y1;
        self.y1 = y;
        y
    }
}

/// A Klatt resonator.
/// This is a second order IIR filter.
/// With f=0 it can also be used as a low-pass filter.
///
/// # Formulas:
/// ```text
///    r = exp(- PI * bw / sampleRate)
///    y[n] = a * x[n] + b * y[n-1] + c * y[n-2]
///    H(w) = a / ( 1 - b * e^(-jw) - c * e^(-2jw) )
///    |H(0)| = a / (1 - c - b)
/// ```
pub(crate) struct Resonator {
    sample_rate: usize,
    /// filter coefficient a
    a: f64,
    /// filter coefficient b
    b: f64,
    /// filter coefficient c
    c: f64,
    /// y[n-1], last output value
    y1: f64,
    /// y[n-2], second-last output value
    y2: f64,
    passthrough: bool,
}

impl Resonator {
    pub fn new(sample_rate: usize) -> Self {
        Resonator {
            sample_rate,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            y1: 0.0,
            y2: 0.0,
            passthrough: true,
        }
    }

    /// Adjusts the filter parameters without resetting the inner state.
    /// ### params
    /// ```text
    /// f = Frequency of resonator in Hz. May be 0 for LP filtering.
    /// bw = Bandwidth of resonator in Hz.
    /// dc_gain = DC gain level.
    /// ```
    pub fn set(&mut self, f: f64, bw: f64, dc_gain: f64) -> Result<(), &'static str> {
        if f.is_nan()
            || bw.is_nan()
            || dc_gain.is_nan()
            || f < 0.0
            || f >= self.sample_rate as f64 / 2.0
            || bw <= 0.0
            || dc_gain <= 0.0
            || bw.is_infinite()
            || dc_gain.is_infinite()
        {
            return Err("Invalid resonator parameters.");
        }
        let r = exp(-PI * bw / (self.sample_rate as f64));
        let w = 2.0 * PI * f / (self.sample_rate as f64);
        self.c = -pow(r, 2.0);
        self.b = 2.0 * r * cos(w);
        self.a = (1.0 - self.b - self.c) * dc_gain;
        self.passthrough = false;
        Ok(())
    }

    pub fn set_passthrough(&mut self) {
        self.passthrough = true;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn adjust_impulse_gain(&mut self, new_a: f64) {
        self.a = new_a;
    }

    pub fn step(&mut self, x: f64) -> f64 {
        if self.passthrough {
            return x;
        }
        let y = self.a * x + self.b * self.y1 + self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
