//! Klatt formant vowels over HTTP.
//!
//! A request names a vowel by its pitch, duration and formant ladder; the
//! service renders it with the [`klatt`] cascade synthesizer and answers with
//! a 16-bit mono WAV file.
//!
//! The pipeline per request is linear:
//! [`params`] → [`grid`] → [`synth`] → [`wav`], orchestrated by [`handler`].

#![deny(clippy::all, clippy::pedantic, unsafe_code)]
// sample rates and sample counts stay far below 2^52
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod error;
pub mod grid;
pub mod handler;
pub mod params;
pub mod synth;
pub mod wav;

pub use config::{Args, Config};
pub use error::{Error, Result};
pub use grid::VowelGrid;
pub use handler::{AppState, router};
pub use params::{ParamMap, ParamValue, SynthesisRequest};
pub use synth::{KlattSynthesizer, SampleBuffer, Synthesizer};
pub use wav::{WavPayload, encode};
