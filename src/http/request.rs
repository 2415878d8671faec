//! Request body helpers
//!
//! Size-limited body collection plus urlencoded form and JSON decoding.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::StatusCode;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Body(BoxError),

    #[error("missing form field '{0}'")]
    MissingField(String),

    #[error("form is empty")]
    EmptyForm,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl RequestError {
    /// Status the router answers with
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_) | Self::MissingField(_) | Self::EmptyForm | Self::Json(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

/// Collect a request body, failing once more than `limit` bytes arrive
///
/// Covers chunked bodies that carry no Content-Length.
pub async fn collect_limited<B>(body: B, limit: usize) -> Result<Bytes, RequestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(RequestError::TooLarge { limit })
        }
        Err(e) => Err(RequestError::Body(e)),
    }
}

/// Decoded `application/x-www-form-urlencoded` body, fields in wire order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        Self {
            fields: form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    /// First value submitted under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn require(&self, name: &str) -> Result<&str, RequestError> {
        self.get(name)
            .ok_or_else(|| RequestError::MissingField(name.to_string()))
    }

    /// Value of the first field, whatever its name
    pub fn first_value(&self) -> Result<&str, RequestError> {
        self.fields
            .first()
            .map(|(_, value)| value.as_str())
            .ok_or(RequestError::EmptyForm)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse a JSON body regardless of the declared Content-Type
pub fn parse_json(body: &[u8]) -> Result<serde_json::Value, RequestError> {
    Ok(serde_json::from_slice(body)?)
}
