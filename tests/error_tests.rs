// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use rundown_backend::error::AppError;

#[test]
fn test_status_mapping() {
    assert_eq!(
        AppError::BadRequest("x".to_string()).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::NotFound("x".to_string()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::TokenExpired {
            expired_at: chrono::Utc::now()
        }
        .status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        AppError::StravaApi("connection refused".to_string()).status(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        AppError::Database("locked".to_string()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AppError::Internal(anyhow::anyhow!("boom")).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_upstream_status_passes_through() {
    for status in [
        StatusCode::BAD_REQUEST,
        StatusCode::UNAUTHORIZED,
        StatusCode::NOT_FOUND,
        StatusCode::TOO_MANY_REQUESTS,
        StatusCode::SERVICE_UNAVAILABLE,
    ] {
        let err = AppError::Upstream {
            status,
            message: "Failed".to_string(),
        };
        assert_eq!(err.status(), status);
    }
}

#[test]
fn test_unexpected_upstream_success_is_bad_gateway() {
    let err = AppError::Upstream {
        status: StatusCode::OK,
        message: "Failed to create webhook subscription".to_string(),
    };
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_database_error_body_hides_details() {
    let response = AppError::Database("secret table name".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, serde_json::json!({"error": "database_error"}));
}

#[tokio::test]
async fn test_token_expired_body() {
    let response = AppError::TokenExpired {
        expired_at: chrono::Utc::now(),
    }
    .into_response();

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "token_expired");
    assert_eq!(body["details"], "Token expired, please refresh");
}
