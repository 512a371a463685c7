//! Endpoints driving the dev-server supervisor.

use hyper::StatusCode;

use super::reply::{self, DevServerReply, STATUS_SUCCESS};
use crate::config::AppState;
use crate::http::{self, HttpResponse};
use crate::logger;
use crate::process::StartOutcome;

pub const STARTED_MESSAGE: &str = "React app started";

/// `GET /start-react`
///
/// Replies as soon as the spawn call returns; an already-running child
/// counts as started.
pub async fn start(state: &AppState) -> HttpResponse {
    match state.dev_server.start().await {
        Ok(outcome) => {
            if matches!(outcome, StartOutcome::AlreadyRunning { .. }) {
                logger::log_dev_server_reused(outcome.pid());
            }
            reply::success(STARTED_MESSAGE)
        }
        Err(e) => reply::error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// `GET /dev-server/status`
pub async fn status(state: &AppState) -> HttpResponse {
    http::build_json_response(
        StatusCode::OK,
        &DevServerReply {
            status: STATUS_SUCCESS,
            dev_server: state.dev_server.status().await,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use serde_json::Value;

    fn state_with(program: &str, args: &[&str]) -> AppState {
        let mut cfg = Config::load_from("definitely/not/a/config/file").unwrap();
        cfg.dev_server.program = program.to_string();
        cfg.dev_server.args = args.iter().map(ToString::to_string).collect();
        cfg.dev_server.working_dir = ".".to_string();
        AppState::new(&cfg)
    }

    async fn json_of(resp: HttpResponse) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_start_without_tool_is_500() {
        let state = state_with("zxcel-no-such-dev-server-binary", &["start"]);

        let resp = start(&state).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = json_of(resp).await;
        assert_eq!(value["status"], "error");
        assert!(!value["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_when_never_started() {
        let state = state_with("zxcel-no-such-dev-server-binary", &[]);
        let value = json_of(status(&state).await).await;
        assert_eq!(value["status"], "success");
        assert_eq!(value["dev_server"]["state"], "stopped");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_twice_then_status() {
        let state = state_with("sleep", &["30"]);

        for _ in 0..2 {
            let resp = start(&state).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                json_of(resp).await,
                serde_json::json!({"status": "success", "message": "React app started"})
            );
        }

        let value = json_of(status(&state).await).await;
        assert_eq!(value["dev_server"]["state"], "running");
        assert!(value["dev_server"]["pid"].is_u64());

        state.dev_server.stop().await.unwrap();
    }
}
