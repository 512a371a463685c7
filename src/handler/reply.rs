//! JSON reply bodies shared by the sheet and dev-server endpoints.
//!
//! Every reply carries `"status": "success" | "error"`.

use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::http::{self, HttpResponse};
use crate::process::DevServerStatus;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// `{"status": ..., "message": ...}`
#[derive(Debug, Serialize)]
pub struct MessageReply<'a> {
    pub status: &'static str,
    pub message: &'a str,
}

/// `{"status": "success", "content": ...}`
#[derive(Debug, Serialize)]
pub struct ContentReply<'a> {
    pub status: &'static str,
    pub content: &'a Value,
}

/// `{"status": "success", "dev_server": {"state": ...}}`
#[derive(Debug, Serialize)]
pub struct DevServerReply {
    pub status: &'static str,
    pub dev_server: DevServerStatus,
}

pub fn success(message: &str) -> HttpResponse {
    http::build_json_response(
        StatusCode::OK,
        &MessageReply {
            status: STATUS_SUCCESS,
            message,
        },
    )
}

pub fn error(status: StatusCode, message: &str) -> HttpResponse {
    http::build_json_response(
        status,
        &MessageReply {
            status: STATUS_ERROR,
            message,
        },
    )
}
