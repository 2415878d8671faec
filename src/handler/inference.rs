//! Prediction handlers
//!
//! - `POST /predict`: classify free text from a form and render the page
//! - `POST /results`: classify a JSON object of feature values

use super::{pages, HandlerError};
use crate::config::AppState;
use crate::http::{self, request, FormData};
use crate::logger;
use crate::model::dense_row_from_json;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// The first submitted field is the quote, whatever it is named
pub async fn handle_predict(
    body: &[u8],
    state: &AppState,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    let form = FormData::parse(body);
    let quote = form.first_value()?;

    let prediction = state.models.predict_text(quote);
    let label = state.label_for(prediction.class_index, &prediction.class);
    logger::log_debug(&format!(
        "[Predict] class={} label={label} chars={}",
        prediction.class,
        quote.chars().count()
    ));

    let html = pages::render_index(
        state,
        &[("prediction_text", label.as_str()), ("quote_text", quote)],
    )
    .await?;
    Ok(http::build_html_response(html, false))
}

/// Body is JSON regardless of Content-Type; values in key order form the row
pub fn handle_results(
    body: &[u8],
    state: &AppState,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    let payload = request::parse_json(body)?;
    let features = dense_row_from_json(&payload)?;
    let prediction = state.models.predict_features(&features)?;

    logger::log_debug(&format!(
        "[Results] class={} features={}",
        prediction.class,
        features.len()
    ));

    Ok(http::build_json_response(StatusCode::OK, &prediction.class))
}
