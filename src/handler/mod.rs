//! Request handler module
//!
//! Routing dispatch plus the page, search, inference and static asset
//! handlers. Handlers return `Result<_, HandlerError>`; the router turns
//! errors into plain-text responses.

pub mod inference;
pub mod pages;
pub mod router;
pub mod search;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;

use crate::http::{self, RequestError};
use crate::logger;
use crate::model::PredictError;
use crate::search::SearchError;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("failed to read template '{path}': {source}")]
    Template {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl HandlerError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Request(e) => e.status(),
            // Rows that reach the model but cannot be scored are server errors
            Self::Predict(_) | Self::Search(_) | Self::Template { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Log and convert into a response
    ///
    /// Server-side failures keep their detail in the error log only.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            logger::log_error(&self.to_string());
            http::build_error_response(status, "the server could not complete the request")
        } else {
            logger::log_warning(&format!("Rejected request: {self}"));
            http::build_error_response(status, &self.to_string())
        }
    }
}
