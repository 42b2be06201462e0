//! Large-file confirmation handshake
//!
//! The provider answers the first request for a large file with a warning
//! page and a `download_warning*` cookie. Repeating the request with the
//! cookie value as `confirm` returns the actual file. Small files come back
//! directly on the first request.

use log::debug;

use crate::patch::error::PatchError;

const WARNING_COOKIE_PREFIX: &str = "download_warning";

pub(super) async fn open(
    client: &reqwest::Client,
    endpoint: &str,
    file_id: &str,
) -> Result<reqwest::Response, PatchError> {
    let transport = |e: reqwest::Error| PatchError::transport(format!("{endpoint}?id={file_id}"), e);

    let first = client
        .get(endpoint)
        .query(&[("export", "download"), ("id", file_id)])
        .send()
        .await
        .map_err(transport)?;

    let Some(token) = confirm_token(&first) else {
        return Ok(first);
    };

    debug!("Download of {file_id} needs confirmation, retrying with token");
    // Discard the warning page before reissuing the request
    drop(first);

    client
        .get(endpoint)
        .query(&[("export", "download"), ("id", file_id), ("confirm", token.as_str())])
        .send()
        .await
        .map_err(transport)
}

fn confirm_token(response: &reqwest::Response) -> Option<String> {
    response
        .cookies()
        .find(|c| c.name().starts_with(WARNING_COOKIE_PREFIX))
        .map(|c| c.value().to_string())
}
