//! Patch sources and how to open them
//!
//! A plain URL is fetched with a single GET. Files hosted on the
//! document-sharing provider sit behind a large-file warning and need the
//! confirmation handshake in [`super::drive`] before the bytes are served.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::drive;
use crate::patch::error::PatchError;

/// Default download endpoint of the document-sharing provider
pub const DRIVE_ENDPOINT: &str = "https://docs.google.com/uc";

fn default_drive_endpoint() -> String {
    DRIVE_ENDPOINT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Direct {
        url: String,
    },
    Drive {
        file_id: String,
        #[serde(default = "default_drive_endpoint")]
        endpoint: String,
    },
}

impl Source {
    /// Issue the request(s) needed to get a response whose body is the archive.
    ///
    /// Non-2xx responses are turned into [`PatchError::Status`] here so the
    /// streaming code never sees an error page.
    pub async fn open(&self, client: &reqwest::Client) -> Result<reqwest::Response, PatchError> {
        let response = match self {
            Source::Direct { url } => client
                .get(url)
                .send()
                .await
                .map_err(|e| PatchError::transport(url.as_str(), e))?,
            Source::Drive { file_id, endpoint } => drive::open(client, endpoint, file_id).await?,
        };

        ensure_success(response)
    }

    /// Reject URLs that could never be downloaded over HTTP(S)
    pub fn validate(&self) -> Result<(), String> {
        let raw = match self {
            Source::Direct { url } => url,
            Source::Drive { endpoint, .. } => endpoint,
        };
        let parsed = url::Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(format!("unsupported scheme '{other}' in '{raw}'")),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Direct { url } => f.write_str(url),
            Source::Drive { file_id, endpoint } => write!(f, "{endpoint}?id={file_id}"),
        }
    }
}

/// A named release channel, e.g. the default patch or a beta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub source: Source,
}

pub(super) fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, PatchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PatchError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}
