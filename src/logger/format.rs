//! Access log format module
//!
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format)
//! - `json` (one JSON object per line)
//! - any other string is a pattern with `$variable` substitution

use chrono::{DateTime, Local};
use serde::Serialize;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Parsed `logging.access_log_format`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Combined,
    Common,
    Json,
    Custom(String),
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "combined" => Self::Combined,
            "common" => Self::Common,
            "json" => Self::Json,
            pattern => Self::Custom(pattern.to_string()),
        }
    }
}

/// Access log entry containing request/response information
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

fn serialize_time<S: serde::Serializer>(time: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.to_rfc3339())
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Path plus query string
    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.request_uri(), self.http_version)
    }

    /// Format the log entry
    pub fn format(&self, format: &LogFormat) -> String {
        match format {
            LogFormat::Common => self.format_common(),
            LogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            LogFormat::Json => serde_json::to_string(self)
                .unwrap_or_else(|e| format!(r#"{{"error":"unserializable access log entry: {e}"}}"#)),
            LogFormat::Custom(pattern) => self.format_custom(pattern),
        }
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Substitute `$name` variables; unknown names are left as written
    ///
    /// Supported: `remote_addr`, `time_local`, `time_iso8601`, `request`,
    /// `request_method`, `request_uri`, `request_time` (seconds, 3 decimals),
    /// `status`, `body_bytes_sent`, `http_referer`, `http_user_agent`.
    fn format_custom(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 32);
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            let len = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tail.len());
            let name = &tail[..len];
            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &tail[len..];
        }

        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format(CLF_TIME).to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => self.request_line(),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let secs = self.request_time_us as f64 / 1_000_000.0;
                format!("{secs:.3}")
            }
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "http_referer" => self.referer.clone().unwrap_or_else(|| "-".into()),
            "http_user_agent" => self.user_agent.clone().unwrap_or_else(|| "-".into()),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7".to_string(),
            "POST".to_string(),
            "/search".to_string(),
        );
        entry.query = Some("debug=1".to_string());
        entry.status = 200;
        entry.body_bytes = 42;
        entry.referer = Some("http://localhost:5000/".to_string());
        entry.user_agent = Some("curl/8.0".to_string());
        entry.request_time_us = 2500;
        entry
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("combined"), LogFormat::Combined);
        assert_eq!(
            LogFormat::parse("$status"),
            LogFormat::Custom("$status".to_string())
        );
    }

    #[test]
    fn test_format_combined_and_common() {
        let entry = create_test_entry();
        let combined = entry.format(&LogFormat::Combined);
        assert!(combined.starts_with("10.0.0.7 - - ["));
        assert!(combined.contains("\"POST /search?debug=1 HTTP/1.1\" 200 42"));
        assert!(combined.ends_with("\"http://localhost:5000/\" \"curl/8.0\""));

        let common = entry.format(&LogFormat::Common);
        assert!(common.contains("\"POST /search?debug=1 HTTP/1.1\" 200 42"));
        assert!(!common.contains("curl/8.0"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format(&LogFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "10.0.0.7");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 42);
        assert_eq!(value["query"], "debug=1");
        assert!(value["time"].is_string());
    }

    #[test]
    fn test_format_custom() {
        let entry = create_test_entry();
        let log = entry.format(&LogFormat::Custom(
            "$remote_addr $request_method $status $request_time $unknown $".to_string(),
        ));
        assert_eq!(log, "10.0.0.7 POST 200 0.003 $unknown $");
    }
}
