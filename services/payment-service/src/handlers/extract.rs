use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Pengganti `Json<T>` yang menolak body rusak dengan envelope AppError
#[derive(Debug)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::RecordPaymentRequest;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/payments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_wrong_field_type_becomes_validation_error() {
        let result =
            AppJson::<RecordPaymentRequest>::from_request(json_request(r#"{"order_id": "12"}"#), &()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_malformed_json_and_missing_content_type_are_rejected() {
        let result = AppJson::<RecordPaymentRequest>::from_request(json_request("{not json"), &()).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let request = Request::builder()
            .method("POST")
            .uri("/api/payments")
            .body(Body::from(r#"{"order_id": 12}"#))
            .unwrap();
        let result = AppJson::<RecordPaymentRequest>::from_request(request, &()).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let AppJson(request) = AppJson::<RecordPaymentRequest>::from_request(
            json_request(r#"{"order_id": 12, "amount": "100.00", "payment_method": "cash"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(request.order_id, Some(12));
    }
}
