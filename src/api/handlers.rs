use crate::error::IntakeError;
use crate::service::{IntakeOrchestrator, IntakeOutcome, IntakeRequest};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// 请求体: 文件引用 + 可选租户 / 外部单据 id
#[derive(Debug, Deserialize)]
pub struct ProcessFileRequest {
    pub file_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

/// 跳过响应 (文件已处理过)
#[derive(Debug, Serialize)]
pub struct SkippedResponse {
    pub status: &'static str,
    pub reason: &'static str,
    pub document_id: String,
}

/// 成功响应
#[derive(Debug, Serialize)]
pub struct ProcessedResponse {
    pub status: &'static str,
    pub data: ProcessedData,
}

#[derive(Debug, Serialize)]
pub struct ProcessedData {
    pub document_id: String,
    pub mode: &'static str,
    pub lines_count: usize,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_project: Option<String>,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 服务状态
pub async fn service_status() -> Json<serde_json::Value> {
    Json(json!({
        "status": "System Online",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 入库接口: 重复跳过 / 处理成功 / 404 / 422 / 500
pub async fn process_file(
    State(orchestrator): State<Arc<IntakeOrchestrator>>,
    Json(req): Json<ProcessFileRequest>,
) -> Response {
    let request = IntakeRequest {
        file_id: req.file_id,
        file_name: req.file_name,
        tenant: req.tenant,
        document_id: req.document_id,
    };

    match orchestrator.process(&request).await {
        Ok(IntakeOutcome::Skipped { document_id }) => {
            let response = SkippedResponse {
                status: "skipped",
                reason: "Already processed",
                document_id,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(IntakeOutcome::Processed {
            outcome,
            processing_seconds,
        }) => {
            let response = ProcessedResponse {
                status: "success",
                data: ProcessedData {
                    document_id: outcome.document_id,
                    mode: outcome.mode.as_str(),
                    lines_count: outcome.lines_count,
                    logs: outcome.logs,
                    matched_project: outcome.matched_project,
                    processing_time_seconds: (processing_seconds * 100.0).round() / 100.0,
                },
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let status = match &e {
                IntakeError::FileNotFound(_) => StatusCode::NOT_FOUND,
                IntakeError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
                IntakeError::Database(_) | IntakeError::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let response = ErrorResponse {
                status: "error",
                message: e.to_string(),
            };
            (status, Json(response)).into_response()
        }
    }
}
