//! Task message: the request handed to the queue control plane.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::options::{RoutingOptions, TaskOptions};

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const PAYLOAD_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
}

/// HTTP call the queue makes against the runner endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Raw payload bytes (a number array in JSON form).
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub routing: RoutingOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub name: String,
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<DateTime<Utc>>,
    pub http_request: HttpRequest,
}

impl TaskMessage {
    /// Builds the message for `body` from canonical options.
    ///
    /// Extra headers are merged over the base content-type header.
    pub fn build(body: Vec<u8>, options: &TaskOptions) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE_HEADER.to_string(), PAYLOAD_CONTENT_TYPE.to_string());
        for (key, value) in options.extra_headers() {
            headers.insert(key.clone(), value.clone());
        }

        Self {
            name: options.name().to_string(),
            create_time: options.created_at(),
            schedule_time: options.eta(),
            http_request: HttpRequest {
                method: HttpMethod::Post,
                path: options.handler_path().to_string(),
                body,
                headers,
                routing: options.routing().clone(),
            },
        }
    }

    pub fn body_len(&self) -> usize {
        self.http_request.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::options::TaskOptions;
    use chrono::TimeZone;

    fn options() -> TaskOptions {
        let mut extra = BTreeMap::new();
        extra.insert("X-Tenant".to_string(), "acme".to_string());
        extra.insert(CONTENT_TYPE_HEADER.to_string(), "application/json".to_string());
        TaskOptions {
            name: "demo:1-deadbeef".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            small_task: false,
            transactional: None,
            connection_name: "default".to_string(),
            countdown: None,
            eta: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap()),
            routing: RoutingOptions {
                version: Some("v7".to_string()),
                service: None,
                instance: None,
            },
            handler_path: "/_tasks/deferred".to_string(),
            extra_headers: extra,
            queue_name: "default".to_string(),
        }
    }

    #[test]
    fn build_copies_options_into_message() {
        let opts = options();
        let msg = TaskMessage::build(b"abc".to_vec(), &opts);
        assert_eq!(msg.name, "demo:1-deadbeef");
        assert_eq!(msg.create_time, opts.created_at());
        assert_eq!(msg.schedule_time, opts.eta());
        assert_eq!(msg.http_request.method, HttpMethod::Post);
        assert_eq!(msg.http_request.path, "/_tasks/deferred");
        assert_eq!(msg.http_request.routing.version.as_deref(), Some("v7"));
        assert_eq!(msg.body_len(), 3);
    }

    #[test]
    fn extra_headers_override_base_headers() {
        let msg = TaskMessage::build(Vec::new(), &options());
        let headers = &msg.http_request.headers;
        assert_eq!(headers.get(CONTENT_TYPE_HEADER).map(String::as_str), Some("application/json"));
        assert_eq!(headers.get("X-Tenant").map(String::as_str), Some("acme"));
    }
}
