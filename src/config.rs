//! Process configuration.
//!
//! Loaded once at startup from the command line, the environment and an
//! optional TOML file, then shared read-only by every request.

use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use clap::Parser;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::grid::GridLimits;
use crate::synth::{DEFAULT_SAMPLE_RATE, DEFAULT_SEED, KlattSynthesizer};

/// Lowest rate whose Nyquist frequency still clears the default F4.
pub const MIN_SAMPLE_RATE: u32 = 8000;
/// Upper bound for `max_duration`, in seconds.
pub const MAX_DURATION_LIMIT: f64 = 60.0;

#[derive(Parser, Debug)]
#[command(name = "klatt-api", version)]
#[command(about = "Synthesizes Klatt formant vowels and serves them as WAV files")]
pub struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "KLATT_API_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000, env = "KLATT_API_PORT")]
    pub port: u16,

    /// TOML configuration file
    #[arg(short, long, env = "KLATT_API_CONFIG")]
    pub config: Option<PathBuf>,

    /// Accepted API key, repeatable or comma separated. No keys disables the check.
    #[arg(long = "api-key", env = "KLATT_API_KEYS", value_delimiter = ',')]
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlottalSource {
    #[default]
    Impulsive,
    Natural,
    Noise,
}

impl From<GlottalSource> for klatt::GlottalSourceType {
    fn from(source: GlottalSource) -> Self {
        match source {
            GlottalSource::Impulsive => klatt::GlottalSourceType::Impulsive,
            GlottalSource::Natural => klatt::GlottalSourceType::Natural,
            GlottalSource::Noise => klatt::GlottalSourceType::Noise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Accepted `X-API-KEY` values. Empty means no authentication.
    pub api_keys: Vec<String>,
    /// `Access-Control-Allow-Origin` sent with every WAV response.
    pub cors_origin: String,
    pub sample_rate: u32,
    pub glottal_source: GlottalSource,
    /// RNG seed for noise and flutter.
    pub seed: u64,
    /// Longest vowel accepted, in seconds.
    pub max_duration: f64,
    /// File stem used when the request carries no label.
    pub default_filename: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_keys: Vec::new(),
            cors_origin: "*".to_owned(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            glottal_source: GlottalSource::default(),
            seed: DEFAULT_SEED,
            max_duration: 10.0,
            default_filename: "vowel".to_owned(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
        Config::from_toml(&text)
    }

    /// File settings first, then keys given on the command line or in the environment.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        config.api_keys.extend(
            args.api_keys
                .iter()
                .map(|key| key.trim())
                .filter(|key| !key.is_empty())
                .map(str::to_owned),
        );
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate < MIN_SAMPLE_RATE {
            return Err(Error::Config(format!(
                "sample_rate must be at least {MIN_SAMPLE_RATE}"
            )));
        }
        if !(self.max_duration > 0.0 && self.max_duration <= MAX_DURATION_LIMIT) {
            return Err(Error::Config(format!(
                "max_duration must be within (0, {MAX_DURATION_LIMIT}] seconds"
            )));
        }
        if HeaderValue::from_str(&self.cors_origin).is_err() {
            return Err(Error::Config(format!(
                "cors_origin {:?} is not a valid header value",
                self.cors_origin
            )));
        }
        if self.default_filename.is_empty() {
            return Err(Error::Config("default_filename must not be empty".into()));
        }
        Ok(())
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    pub fn is_authorized(&self, key: Option<&str>) -> bool {
        if !self.auth_enabled() {
            return true;
        }
        key.is_some_and(|key| self.api_keys.iter().any(|allowed| allowed == key))
    }

    pub fn grid_limits(&self) -> GridLimits {
        GridLimits {
            sample_rate: self.sample_rate,
            max_duration: self.max_duration,
        }
    }

    pub fn synthesizer(&self) -> KlattSynthesizer {
        KlattSynthesizer::new(self.sample_rate, self.glottal_source.into(), self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn file_settings() {
        let config = Config::from_toml(
            r#"
            api_keys = ["k1", "k2"]
            cors_origin = "*.nyoeghau.com"
            sample_rate = 22050
            glottal_source = "natural"
            max_duration = 2.5
            "#,
        )
        .unwrap();
        assert_eq!(config.api_keys, vec!["k1", "k2"]);
        assert_eq!(config.cors_origin, "*.nyoeghau.com");
        assert_eq!(config.sample_rate, 22050);
        assert_eq!(config.glottal_source, GlottalSource::Natural);
        assert_eq!(config.max_duration, 2.5);
        assert_eq!(config.seed, DEFAULT_SEED);
    }

    #[test]
    fn bad_files_are_config_errors() {
        for text in [
            "sample_rate = 0",
            "sample_rate = 2000",
            "sample_rate = 7999",
            "max_duration = -1.0",
            "max_duration = 1e6",
            "max_duration = nan",
            "glottal_source = \"buzz\"",
            "cors_origin = \"a\\nb\"",
            "colour = \"blue\"",
            "api_keys = 3",
        ] {
            assert!(
                matches!(Config::from_toml(text), Err(Error::Config(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn limits_are_inclusive() {
        let config = Config::from_toml("sample_rate = 8000\nmax_duration = 60.0").unwrap();
        assert_eq!(config.sample_rate, MIN_SAMPLE_RATE);
        assert_eq!(config.max_duration, MAX_DURATION_LIMIT);
    }

    #[test]
    fn auth_is_disabled_without_keys() {
        let config = Config::default();
        assert!(!config.auth_enabled());
        assert!(config.is_authorized(None));
        assert!(config.is_authorized(Some("anything")));
    }

    #[test]
    fn auth_checks_the_allow_list() {
        let config = Config {
            api_keys: vec!["secret".into()],
            ..Config::default()
        };
        assert!(config.is_authorized(Some("secret")));
        assert!(!config.is_authorized(Some("Secret")));
        assert!(!config.is_authorized(Some("")));
        assert!(!config.is_authorized(None));
    }

    #[test]
    fn command_line_keys_extend_file_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_keys = [\"from-file\"]").unwrap();

        let path = file.path().to_str().unwrap();
        let args = Args::parse_from([
            "klatt-api",
            "--config",
            path,
            "--api-key",
            "a, b",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.api_keys, vec!["from-file", "a", "b"]);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let args = Args::parse_from(["klatt-api", "--config", "/definitely/not/here.toml"]);
        assert!(matches!(Config::from_args(&args), Err(Error::Config(_))));
    }
}
