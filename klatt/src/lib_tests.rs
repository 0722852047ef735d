use alloc::vec;
use libm::fabs;
use rand::{SeedableRng, rngs::SmallRng};

use crate::generator::{compute_rms, db_to_lin, perform_frequency_modulation};
use crate::{FrameParms, GlottalSourceType, MainParms, generate_sound};

const EPSILON: f64 = 1E-12;

fn m_parms(glottal_source_type: GlottalSourceType) -> MainParms {
    MainParms {
        sample_rate: 44100,
        glottal_source_type,
    }
}

fn vowel(duration: f64, f0: f64) -> FrameParms {
    FrameParms {
        duration,
        f0,
        flutter_level: 0.25,
        open_phase_ratio: 0.7,
        breathiness_db: -25.0,
        tilt_db: 0.0,
        gain_db: f64::NAN,
        agc_rms_level: 0.18,
        oral_formant_freq: vec![800.0, 1200.0, 2300.0, 3000.0],
        oral_formant_bw: vec![50.0, 50.0, 100.0, 150.0],
        voicing_db: 0.0,
        aspiration_db: -99.0,
        aspiration_mod: 0.5,
    }
}

#[test]
fn db_to_lin_works() {
    assert!(fabs(db_to_lin(-20f64) - 0.1) < EPSILON);
    assert!(fabs(db_to_lin(-25f64) - 0.056_234_132_519_034_91) < EPSILON);
    assert!(fabs(db_to_lin(0f64) - 1.0) < EPSILON);
    assert_eq!(db_to_lin(-99f64), 0.0);
    assert_eq!(db_to_lin(f64::NAN), 0.0);
}

#[test]
fn frequency_modulation_is_bounded() {
    assert_eq!(perform_frequency_modulation(247.0, 0.0, 661.44), 247.0);
    for step in 0..1000 {
        let f0 = perform_frequency_modulation(120.0, 0.25, f64::from(step) * 0.013);
        // three sines at most add up to 3, scaled by flutter / 50
        assert!(fabs(f0 - 120.0) <= 120.0 * 3.0 * 0.25 / 50.0 + EPSILON);
    }
}

#[test]
fn fractional_durations_are_rounded_to_samples() {
    let sound = generate_sound(
        &m_parms(GlottalSourceType::Impulsive),
        &[vowel(0.5, 120.0)],
        SmallRng::seed_from_u64(69),
    )
    .unwrap();
    assert_eq!(sound.len(), 22050);

    let sound = generate_sound(
        &m_parms(GlottalSourceType::Impulsive),
        &[vowel(0.25, 120.0), vowel(0.1, 140.0)],
        SmallRng::seed_from_u64(69),
    )
    .unwrap();
    assert_eq!(sound.len(), 11025 + 4410);
}

#[test]
fn agc_sets_rms_level() {
    for source in [
        GlottalSourceType::Impulsive,
        GlottalSourceType::Natural,
        GlottalSourceType::Noise,
    ] {
        let sound = generate_sound(&m_parms(source), &[vowel(0.2, 120.0)], SmallRng::seed_from_u64(1))
            .unwrap();
        assert!(fabs(compute_rms(&sound) - 0.18) < 1E-9, "{source:?}");
    }
}

#[test]
fn same_seed_same_sound() {
    let a = generate_sound(
        &m_parms(GlottalSourceType::Impulsive),
        &[vowel(0.1, 100.0)],
        SmallRng::seed_from_u64(7),
    )
    .unwrap();
    let b = generate_sound(
        &m_parms(GlottalSourceType::Impulsive),
        &[vowel(0.1, 100.0)],
        SmallRng::seed_from_u64(7),
    )
    .unwrap();
    assert_eq!(a, b);
}

#[test]
fn unvoiced_frame_without_noise_is_silent() {
    let sound = generate_sound(
        &m_parms(GlottalSourceType::Impulsive),
        &[vowel(0.1, 0.0)],
        SmallRng::seed_from_u64(3),
    )
    .unwrap();
    assert_eq!(sound.len(), 4410);
    assert!(sound.iter().all(|s| *s == 0.0));
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut above_nyquist = vowel(0.1, 120.0);
    above_nyquist.oral_formant_freq[3] = 30000.0;
    assert_eq!(
        generate_sound(
            &m_parms(GlottalSourceType::Impulsive),
            &[above_nyquist],
            SmallRng::seed_from_u64(0),
        ),
        Err("Invalid resonator parameters.")
    );

    let mut zero_bandwidth = vowel(0.1, 120.0);
    zero_bandwidth.oral_formant_bw[0] = 0.0;
    assert!(
        generate_sound(
            &m_parms(GlottalSourceType::Natural),
            &[zero_bandwidth],
            SmallRng::seed_from_u64(0),
        )
        .is_err()
    );

    assert_eq!(
        generate_sound(
            &m_parms(GlottalSourceType::Impulsive),
            &[vowel(f64::NAN, 120.0)],
            SmallRng::seed_from_u64(0),
        ),
        Err("Invalid frame duration.")
    );
}

#[test]
fn missing_formants_pass_through() {
    let mut two_formants = vowel(0.1, 120.0);
    two_formants.oral_formant_freq.truncate(2);
    two_formants.oral_formant_bw = vec![50.0, f64::NAN];
    let sound = generate_sound(
        &m_parms(GlottalSourceType::Impulsive),
        &[two_formants],
        SmallRng::seed_from_u64(0),
    )
    .unwrap();
    assert!(sound.iter().all(|s| s.is_finite()));
}
