//! Error types for the fetch → load pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while downloading a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The input is not an absolute URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// DNS, connection, timeout or body-read failure.
    #[error("network error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {code} fetching {url}")]
    HttpStatus { url: String, code: u16 },
}

/// Errors raised while turning downloaded bytes into a table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The extension hint is not one of csv, xls, xlsx, json.
    #[error("unsupported file format '{hint}'")]
    UnsupportedFormat { hint: String },

    /// The content is not valid for the declared format.
    #[error("failed to parse {format}: {details}")]
    ParseFailure {
        format: &'static str,
        details: String,
    },

    /// The parsed table could not be written to disk.
    #[error("failed to save table to {path}: {message}")]
    PersistFailure { path: PathBuf, message: String },
}

/// Any failure of a fetch + load round.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl PipelineError {
    /// Short headline suitable for the status line.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Fetch(FetchError::InvalidUrl { .. }) => "That does not look like a valid URL.",
            Self::Fetch(FetchError::Transport { .. }) => {
                "Could not reach the server. Please check the URL and your connection."
            }
            Self::Fetch(FetchError::HttpStatus { .. }) => "The server refused the download.",
            Self::Load(LoadError::UnsupportedFormat { .. }) => {
                "Only .csv, .xls, .xlsx and .json files are supported."
            }
            Self::Load(LoadError::ParseFailure { .. }) => "The file could not be parsed.",
            Self::Load(LoadError::PersistFailure { .. }) => {
                "The file was parsed but could not be saved locally."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_code() {
        let err = PipelineError::from(FetchError::HttpStatus {
            url: "http://example.com/a.csv".into(),
            code: 404,
        });
        assert_eq!(err.to_string(), "HTTP 404 fetching http://example.com/a.csv");
        assert_eq!(err.user_message(), "The server refused the download.");
    }

    #[test]
    fn unsupported_format_message() {
        let err = LoadError::UnsupportedFormat { hint: "txt".into() };
        assert_eq!(err.to_string(), "unsupported file format 'txt'");
    }
}
