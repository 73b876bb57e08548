mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::{HttpClient, HttpResponse};

use crate::error::PipelineError;
use tracing::{debug, warn};

/// Downloads the archive at `url`.
///
/// Any status other than 200 is a [`PipelineError::DownloadFailed`] carrying
/// the status and the response text. Transport faults are not classified
/// further.
#[tracing::instrument(skip(client))]
pub fn fetch_archive<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, PipelineError> {
    let url = reqwest::Url::parse(url).map_err(|e| PipelineError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::blocking::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req)?;
    if resp.status != 200 {
        let message = String::from_utf8_lossy(&resp.body).into_owned();
        warn!(status = resp.status, "Archive download refused");
        return Err(PipelineError::DownloadFailed {
            status: resp.status,
            message,
        });
    }

    debug!(bytes = resp.body.len(), "Archive downloaded");
    Ok(resp.body)
}
