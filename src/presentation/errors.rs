// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::domain::services::errors::TicketError;
use crate::utils::errors::RepositoryError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，按领域错误映射HTTP状态码
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> (StatusCode, &'static str) {
        if let Some(err) = self.0.downcast_ref::<TicketError>() {
            return match err {
                TicketError::DuplicateOpenTicket { .. } => {
                    (StatusCode::CONFLICT, "duplicate_open_ticket")
                }
                TicketError::NoEligibleAdmin { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "no_eligible_admin")
                }
                TicketError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                TicketError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                TicketError::TicketClosed { .. } => (StatusCode::BAD_REQUEST, "ticket_closed"),
                TicketError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
                TicketError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            };
        }

        if self.0.downcast_ref::<RepositoryError>().is_some() {
            return (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable");
        }

        if self.0.downcast_ref::<validator::ValidationErrors>().is_some() {
            return (StatusCode::BAD_REQUEST, "validation");
        }

        (StatusCode::INTERNAL_SERVER_ERROR, "internal")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let error_message = self.0.to_string();

        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        }

        let body = Json(json!({ "success": false, "code": code, "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
