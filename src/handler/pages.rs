// HTML page rendering
// The single page template is read from disk on every render

use super::HandlerError;
use crate::config::AppState;
use crate::http;
use crate::template;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// `GET /`: the page with every placeholder empty
pub async fn index(state: &AppState, is_head: bool) -> Result<Response<Full<Bytes>>, HandlerError> {
    let html = render_index(state, &[]).await?;
    Ok(http::build_html_response(html, is_head))
}

/// Render `index.html` with the given placeholder values
pub async fn render_index(
    state: &AppState,
    vars: &[(&str, &str)],
) -> Result<String, HandlerError> {
    let path = state.config.index_template_path();
    let source = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| HandlerError::Template {
            path: path.display().to_string(),
            source,
        })?;
    Ok(template::render(&source, vars))
}
