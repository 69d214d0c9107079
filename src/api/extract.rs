//! Extractors whose rejections render as [`AppError`] envelopes.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

/// JSON body; malformed or mistyped input becomes `BAD_REQUEST`, an over-long body
/// `PAYLOAD_TOO_LARGE`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
