//! Error types surfaced by data states.
//!
//! Every failure that reaches a [`Root`](crate::Root) is normalized into a
//! [`DataError`]: a message plus the errors it was built from. Fetch-level
//! failures of the default HTTP fetcher are typed as [`FetchError`] first.

use std::fmt;

use smallvec::SmallVec;

/// The single error representation stored in `Root::Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataError {
    message: String,
    causes: SmallVec<[Box<DataError>; 2]>,
}

impl DataError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: SmallVec::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> impl Iterator<Item = &DataError> {
        self.causes.iter().map(|c| &**c)
    }

    /// Attaches the errors this one was derived from.
    pub fn caused_by(mut self, causes: impl IntoIterator<Item = DataError>) -> Self {
        self.causes.extend(causes.into_iter().map(Box::new));
        self
    }

    /// Prepends `prefix` to the message in place: `"price:"` + `"timeout"`
    /// becomes `"price: timeout"`.
    pub fn prefix(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        self.message = format!("{prefix} {}", self.message);
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix(prefix);
        self
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| &**c as &(dyn std::error::Error + 'static))
    }
}

impl From<&str> for DataError {
    fn from(raw: &str) -> Self {
        DataError::new(raw)
    }
}

impl From<String> for DataError {
    fn from(raw: String) -> Self {
        DataError::new(raw)
    }
}

impl From<anyhow::Error> for DataError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DataError>() {
            Ok(data) => data,
            Err(err) => DataError::new(format!("{err:#}")),
        }
    }
}

impl From<FetchError> for DataError {
    fn from(err: FetchError) -> Self {
        DataError::new(err.to_string())
    }
}

/// Failures of the default GET-JSON fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} is not valid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {url} has an empty result")]
    Empty { url: String },

    #[error("result from {url} has an unexpected shape: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn prefix_is_separated_by_a_space() {
        let err = DataError::new("x").with_prefix("prefix:");
        assert_eq!(err.message(), "prefix: x");
        assert_eq!(DataError::new("x").with_prefix("").message(), "x");
    }

    #[test]
    fn anyhow_keeps_existing_data_errors() {
        let original = DataError::new("inner").caused_by([DataError::new("root cause")]);
        let converted = DataError::from(anyhow::Error::new(original.clone()));
        assert_eq!(converted, original);
        assert_eq!(
            converted.source().map(|s| s.to_string()).as_deref(),
            Some("root cause")
        );
    }

    #[test]
    fn anyhow_context_chain_is_flattened() {
        let err = anyhow::anyhow!("connection reset").context("fetching balance");
        assert_eq!(
            DataError::from(err).message(),
            "fetching balance: connection reset"
        );
    }

    #[test]
    fn status_error_mentions_code() {
        let err = FetchError::Status {
            url: "https://api.example/gas".into(),
            status: 404,
        };
        assert!(DataError::from(err).message().contains("404"));
    }
}
