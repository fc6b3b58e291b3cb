use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::query::PageMeta;

/// Success envelope: `{status: "success", message?, <page meta>?, count?, data?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    page: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    fn new(code: StatusCode, data: Option<T>) -> Self {
        Self {
            code,
            status: "success",
            message: None,
            page: None,
            count: None,
            data,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, Some(data))
    }

    pub fn created(data: T) -> Self {
        Self::new(StatusCode::CREATED, Some(data))
    }

    pub fn paged(meta: PageMeta, data: T) -> Self {
        let mut envelope = Self::ok(data);
        envelope.page = Some(meta);
        envelope
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// Unpaged listing carrying only `count`.
    pub fn listed(data: Vec<T>) -> Self {
        let mut envelope = Self::ok(data);
        envelope.count = envelope.data.as_ref().map(Vec::len);
        envelope
    }
}

impl Envelope<()> {
    /// Acknowledgement without a `data` member.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, None).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.code, axum::Json(self)).into_response()
    }
}
