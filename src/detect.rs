//! Detection backend client.
//! Uploads the capture and its tagged corners as one multipart POST to `{api_url}/detect`
//! and decodes the returned position.
//! One request per submission: no retries, no cancellation. Every failure collapses
//! into a single user-facing message on the result stage.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::Config;
use crate::corners::{ChessboardCorners, CornersPayload};

const DETECT_PATH: &str = "detect";
const IMAGE_FILE_NAME: &str = "chessboard.jpg";
const UNKNOWN_ERROR: &str = "Unknown error occurred";

// *************** Request/Response Types ***************

/// Position returned by the backend. Immutable once received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub fen: String,
    pub lichess_url: String,
    pub board_matrix: Vec<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid backend URL '{url}': {reason}")]
    BadUrl { url: String, reason: String },
    #[error("failed to read image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build request: {0}")]
    Request(String),
    #[error("could not reach detection service: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("detection service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response from detection service: {0}")]
    Decode(String),
}

impl DetectError {
    /// The single string shown to the user, whatever went wrong.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }
}

// *************** Client ***************

pub struct DetectionClient {
    client: Client,
    endpoint: Url,
}

impl DetectionClient {
    pub fn new(config: &Config) -> Result<Self, DetectError> {
        let endpoint = detect_endpoint(&config.api_url)?;
        // Per-phase limits: the upload plus backend inference may exceed one period in total.
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(DetectError::Transport)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Reads the JPEG named by `corners.image_path` and submits it.
    pub async fn detect(&self, corners: &ChessboardCorners) -> Result<DetectionResult, DetectError> {
        let jpeg = tokio::fs::read(&corners.image_path)
            .await
            .map_err(|source| DetectError::Image {
                path: corners.image_path.display().to_string(),
                source,
            })?;
        self.detect_bytes(jpeg, corners).await
    }

    pub async fn detect_bytes(
        &self,
        jpeg: Vec<u8>,
        corners: &ChessboardCorners,
    ) -> Result<DetectionResult, DetectError> {
        let form = build_form(jpeg, corners)?;
        let start = Instant::now();
        tracing::debug!(endpoint = %self.endpoint, "submitting detection request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(DetectError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(DetectError::Transport)?;
        tracing::debug!(%status, latency = ?start.elapsed(), bytes = body.len(), "detection response");
        tracing::trace!(%body, "detection response body");

        if !status.is_success() {
            return Err(DetectError::Status { status, body });
        }
        serde_json::from_str(&body).map_err(|e| DetectError::Decode(e.to_string()))
    }
}

// *************** Internal Functions ***************

/// Resolves `detect` against the base URL, tolerating a missing trailing slash.
fn detect_endpoint(api_url: &str) -> Result<Url, DetectError> {
    let bad = |reason: String| DetectError::BadUrl {
        url: api_url.to_string(),
        reason,
    };
    let mut base = Url::parse(api_url.trim()).map_err(|e| bad(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(bad(format!("unsupported scheme '{}'", base.scheme())));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(DETECT_PATH).map_err(|e| bad(e.to_string()))
}

fn build_form(jpeg: Vec<u8>, corners: &ChessboardCorners) -> Result<Form, DetectError> {
    let corners_json = serde_json::to_string(&CornersPayload::from(corners))
        .map_err(|e| DetectError::Request(e.to_string()))?;
    tracing::trace!(%corners_json, "corners part");

    let image = Part::bytes(jpeg)
        .file_name(IMAGE_FILE_NAME)
        .mime_str("image/jpeg")
        .map_err(|e| DetectError::Request(e.to_string()))?;

    Ok(Form::new()
        .part("image", image)
        .part("corners", text_part(corners_json)?)
        .part("original_width", text_part(corners.original_width.to_string())?)
        .part("original_height", text_part(corners.original_height.to_string())?))
}

fn text_part(value: String) -> Result<Part, DetectError> {
    Part::text(value)
        .mime_str("text/plain")
        .map_err(|e| DetectError::Request(e.to_string()))
}

// *************** Tests ***************
