use hound::{SampleFormat, WavSpec, WavWriter};
use klatt::{FrameParms, GlottalSourceType, MainParms, generate_sound};
use rand::{SeedableRng, rngs::SmallRng};

fn main() {
    let m_parms = MainParms {
        sample_rate: 16000,
        glottal_source_type: GlottalSourceType::Natural,
    };
    // an [a]-like vowel
    let f_parms = FrameParms {
        duration: 1.0,
        f0: 120.0,
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
    };

    let sound = match generate_sound(&m_parms, &[f_parms], SmallRng::seed_from_u64(69)) {
        Ok(sound) => sound,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    };

    let mut wav = WavWriter::create(
        "out.wav",
        WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )
    .unwrap();
    for sample in sound {
        wav.write_sample(sample as f32).unwrap();
    }
    wav.finalize().unwrap();
}
