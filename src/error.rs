use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    completion::CompletionError,
    payments::PaymentError,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("Payment provider error")]
    PaymentProvider(#[from] PaymentError),

    #[error("Assistant unavailable")]
    Completion(#[from] CompletionError),

    #[error("Could not allocate an order number after {0} attempts")]
    OrderNumberExhausted(usize),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

/// Reasons a cart is refused before any order exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("destination country is required")]
    MissingCountry,
    #[error("unknown product {0}")]
    UnknownProduct(String),
    #[error("quantity must be between 1 and 99")]
    InvalidQuantity,
    #[error("shipping cost must be between 0 and 100000")]
    InvalidShippingCost,
    #[error("order total is out of range")]
    TotalOutOfRange,
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentProvider(_) | AppError::Completion(_) => StatusCode::BAD_GATEWAY,
            AppError::OrderNumberExhausted(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
