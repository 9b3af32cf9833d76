use crate::error::PaystrataError;
use axum::extract::FromRequest;

/// `Json` whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(PaystrataError))]
pub struct JsonBody<T>(pub T);
