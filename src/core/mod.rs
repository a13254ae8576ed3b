pub mod credential;
pub mod graph;
pub mod query;

use reqwest::Url;

use crate::error::{AzrgError, Result};

/// Parse an endpoint into a base URL that `Url::join` treats as a directory.
pub(crate) fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| AzrgError::Config(format!("invalid endpoint '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AzrgError::Config(format!(
            "invalid endpoint '{}': expected an http(s) URL",
            raw
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
