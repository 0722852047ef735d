//! Klatt cascade formant synthesis.
//!
//! *NOTE*: This is _not_ a text-to-speech engine.
//! Sound is generated from parametric frames only: a glottal source, optional
//! aspiration noise and a chain of oral formant resonators.
//!
//! ## `no_std`
//!
//! This library is unconditionally `no_std` compatible.
//! `alloc` is required for the output buffer.

#![no_std]
#![deny(clippy::cargo, clippy::pedantic, unsafe_code)]
// sample positions and periods are converted back and forth with f64
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

extern crate alloc;

mod filter;
mod generator;
mod source;

pub use generator::{FrameParms, MAX_ORAL_FORMANTS, MainParms, generate_sound};
pub use source::GlottalSourceType;

#[cfg(test)]
mod lib_tests;
