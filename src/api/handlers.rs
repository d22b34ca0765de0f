//! API request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::error::TimecardError;
use crate::types::TimecardRequest;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const TIMECARD_DISPOSITION: &str = "attachment; filename=\"Timecard.xlsx\"";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(path: &str, method: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "Timecard API Server".to_string(),
        version: state.version.clone(),
        description: "Fills the timecard spreadsheet template from JSON".to_string(),
        endpoints: vec![
            endpoint("/health", "GET", "Health check endpoint"),
            endpoint("/version", "GET", "Get server version"),
            endpoint("/excel", "POST", "Generate a populated Timecard.xlsx"),
        ],
    }))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec!["excel".to_string()],
    }))
}

/// OPTIONS /excel - bare preflight without CORS request headers
pub async fn excel_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// POST /excel - Populate the template and return it as a download
pub async fn excel(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = match TimecardRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let worker = Arc::clone(&state);
    let populated =
        tokio::task::spawn_blocking(move || worker.populator.populate(&request)).await;

    match populated {
        Ok(Ok(bytes)) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
                (header::CONTENT_DISPOSITION, TIMECARD_DISPOSITION),
            ],
            bytes,
        )
            .into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("populate task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::err("populate task failed")),
            )
                .into_response()
        }
    }
}

/// Map a population error onto a status code and error envelope.
pub fn error_response(err: &TimecardError) -> Response {
    let status = if err.is_client_error() {
        warn!("rejected timecard request: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        error!("timecard generation failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::<()>::err(err.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ApiResponse Tests ====================

    #[test]
    fn test_api_response_ok_creates_success_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test data".to_string());

        assert!(response.success);
        assert_eq!(response.data, Some("test data".to_string()));
        assert!(response.error.is_none());
        // Verify UUID format (8-4-4-4-12)
        assert_eq!(response.request_id.len(), 36);
    }

    #[test]
    fn test_api_response_err_creates_error_response() {
        let response: ApiResponse<()> = ApiResponse::err("Something went wrong");

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_api_response_request_id_is_unique() {
        let response1: ApiResponse<String> = ApiResponse::ok("test1".to_string());
        let response2: ApiResponse<String> = ApiResponse::ok("test2".to_string());

        assert_ne!(response1.request_id, response2.request_id);
    }

    #[test]
    fn test_api_response_err_omits_data_in_json() {
        let response: ApiResponse<()> = ApiResponse::err("bad json: eof");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "bad json: eof");
        assert!(json.get("data").is_none());
    }

    // ==================== Error Mapping Tests ====================

    #[test]
    fn test_error_response_status_codes() {
        let bad_rows = TimecardError::InsufficientRows {
            required: 7,
            found: 2,
        };
        assert_eq!(error_response(&bad_rows).status(), StatusCode::BAD_REQUEST);

        let bad_json = TimecardError::InvalidRequest("eof".to_string());
        assert_eq!(error_response(&bad_json).status(), StatusCode::BAD_REQUEST);

        let template = TimecardError::TemplateLoad("missing".to_string());
        assert_eq!(
            error_response(&template).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let serialize = TimecardError::Serialization("zip".to_string());
        assert_eq!(
            error_response(&serialize).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_download_headers() {
        assert!(TIMECARD_DISPOSITION.contains("filename=\"Timecard.xlsx\""));
        assert!(XLSX_CONTENT_TYPE.ends_with("spreadsheetml.sheet"));
    }
}
