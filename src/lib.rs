//! quotelens: quote authenticity classifier behind a small hyper server.
//!
//! - `config`: layered settings and shared state
//! - `model`: TF-IDF vectorizer and classifiers loaded from JSON artifacts
//! - `search`: autocomplete over the author and context lists
//! - `template`: `{{ name }}` page rendering
//! - `http` / `handler` / `server`: protocol helpers, routing, accept loop
//! - `logger`: leveled and access logging

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod model;
pub mod search;
pub mod server;
pub mod template;
