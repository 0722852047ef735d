//! HTTP surface: `POST /` with a JSON body, `GET /` with a query string.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::grid::VowelGrid;
use crate::params::{ParamMap, SynthesisRequest};
use crate::synth::Synthesizer;
use crate::wav::{self, WavPayload};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Characters left as-is in the attachment file name; everything else is percent-escaped.
const FILENAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Per-process state. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let synthesizer = Arc::new(config.synthesizer());
        AppState::with_synthesizer(config, synthesizer)
    }

    pub fn with_synthesizer(config: Config, synthesizer: Arc<dyn Synthesizer>) -> Self {
        AppState {
            config: Arc::new(config),
            synthesizer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);
    Router::new()
        .route("/", get(vowel_from_query).post(vowel_from_json))
        .layer(cors)
        .with_state(state)
}

/// Answers preflights and stamps `Access-Control-Allow-Origin` on every
/// response, error envelopes included.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else if let Ok(value) = HeaderValue::from_str(origin) {
        AllowOrigin::exact(value)
    } else {
        warn!(origin, "unusable CORS origin, cross-origin requests will be refused");
        AllowOrigin::list([])
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}

async fn vowel_from_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    authorize(&state.config, &headers)?;
    let params = ParamMap::from_json(&body)?;
    synthesize_vowel(state, params).await
}

async fn vowel_from_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response> {
    authorize(&state.config, &headers)?;
    let Query(pairs) = query.map_err(|rejection| Error::validation("query", rejection.body_text()))?;
    synthesize_vowel(state, ParamMap::from_pairs(pairs)).await
}

fn authorize(config: &Config, headers: &HeaderMap) -> Result<()> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if config.is_authorized(key) {
        Ok(())
    } else {
        Err(Error::Auth)
    }
}

async fn synthesize_vowel(state: AppState, params: ParamMap) -> Result<Response> {
    for key in params.unknown_keys() {
        debug!(key, "ignoring unknown parameter");
    }
    let request = SynthesisRequest::from_params(&params);
    let grid = VowelGrid::from_request(&request, &state.config.grid_limits())?;

    let started = Instant::now();
    let synthesizer = Arc::clone(&state.synthesizer);
    let wav = tokio::task::spawn_blocking(move || {
        let samples = synthesizer.render(&grid)?;
        wav::encode(&samples)
    })
    .await
    .map_err(|err| Error::Synthesis(format!("synthesis task failed: {err}")))??;

    info!(
        label = %request.label,
        bytes = wav.len(),
        elapsed = ?started.elapsed(),
        "synthesized vowel"
    );

    let filename = attachment_filename(params.label(), &state.config.default_filename);
    Ok(wav_response(wav, &filename))
}

/// `<label>.wav` with the label percent-escaped, or `<default_stem>.wav`.
pub fn attachment_filename(label: Option<&str>, default_stem: &str) -> String {
    let stem = label.filter(|label| !label.is_empty()).unwrap_or(default_stem);
    format!("{}.wav", utf8_percent_encode(stem, FILENAME))
}

fn wav_response(wav: WavPayload, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        wav.into_bytes(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_escaped() {
        assert_eq!(attachment_filename(Some("eh#1"), "vowel"), "eh%231.wav");
        assert_eq!(attachment_filename(Some("a b/c"), "vowel"), "a%20b%2Fc.wav");
        assert_eq!(attachment_filename(Some("\"x\""), "vowel"), "%22x%22.wav");
        assert_eq!(attachment_filename(Some("ɛ"), "vowel"), "%C9%9B.wav");
        assert_eq!(attachment_filename(Some("i_1.v-2~"), "vowel"), "i_1.v-2~.wav");
    }

    #[test]
    fn missing_label_uses_default_stem() {
        assert_eq!(attachment_filename(None, "vowel"), "vowel.wav");
        assert_eq!(attachment_filename(Some(""), "klatt"), "klatt.wav");
    }

    #[test]
    fn api_key_header_is_checked() {
        let config = Config {
            api_keys: vec!["k".into()],
            ..Config::default()
        };
        let mut headers = HeaderMap::new();
        assert!(matches!(authorize(&config, &headers), Err(Error::Auth)));

        headers.insert(API_KEY_HEADER, "k".parse().unwrap());
        assert!(authorize(&config, &headers).is_ok());

        assert!(authorize(&Config::default(), &HeaderMap::new()).is_ok());
    }
}
