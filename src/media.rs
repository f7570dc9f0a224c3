//! Forwarding of staged uploads to the external media host.

use std::{fs::File, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use crate::config::MediaHostConfig;

/// What the media host hands back for a stored file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    /// Seconds; only reported for audio/video.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Blocking upload of a local file. Called from the blocking pool.
pub trait MediaUploader: Send + Sync {
    fn upload(&self, path: &Path, file_name: Option<&str>) -> Result<UploadedMedia>;
}

/// Posts the raw file body to the configured endpoint and expects a JSON
/// `{ "url": ..., "duration": ... }` reply.
pub struct HttpMediaHost {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMediaHost {
    pub fn new(cfg: &MediaHostConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(cfg.timeout).build();
        Self {
            agent,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

impl MediaUploader for HttpMediaHost {
    fn upload(&self, path: &Path, file_name: Option<&str>) -> Result<UploadedMedia> {
        let mime = file_name
            .and_then(|name| mime_guess::from_path(name).first())
            .unwrap_or_else(|| mime_guess::from_path(path).first_or_octet_stream());
        let file = File::open(path)
            .with_context(|| format!("opening staged upload {}", path.display()))?;

        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", mime.essence_str());
        if let Some(name) = file_name {
            request = request.set("X-File-Name", name);
        }
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }

        let response = match request.send(file) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                bail!("media host rejected upload with status {code}: {body}");
            }
            Err(err) => return Err(anyhow!(err).context("sending upload to media host")),
        };

        let uploaded: UploadedMedia = response
            .into_json()
            .context("parsing media host response")?;
        if uploaded.url.is_empty() {
            bail!("media host returned an empty url");
        }
        Ok(uploaded)
    }
}

/// Stand-in used when no media host is configured; every upload fails.
pub struct NoMediaHost;

impl MediaUploader for NoMediaHost {
    fn upload(&self, _path: &Path, _file_name: Option<&str>) -> Result<UploadedMedia> {
        bail!("no media host configured")
    }
}
