// POST /search handler

use super::HandlerError;
use crate::config::AppState;
use crate::http::{self, FormData};
use crate::logger;
use crate::search;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};

/// Filter the list chosen by `category` with `term`, answer a JSON array
pub async fn handle_search(
    body: &[u8],
    state: &AppState,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    let form = FormData::parse(body);
    let term = form.require("term")?;
    let category = form.require("category")?;

    let hits = search::search(&state.json_dir, category, term).await?;
    logger::log_debug(&format!(
        "[Search] category={category} term={term:?} matches={}",
        hits.len()
    ));

    Ok(http::build_json_response(StatusCode::OK, &hits))
}
