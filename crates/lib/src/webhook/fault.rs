//! Fault layer: every failure on the webhook path becomes a 200 with a fallback body.
//!
//! Watson Assistant treats a non-200 webhook reply as a hard failure with no text shown
//! to the user, so faults are reported in `context.error` / `context.status_code` instead.

use crate::completion::ERROR_KEY;
use crate::webhook::protocol::{merge_context, Context, OutboundMessage, Rejection};
use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::any::Any;
use uuid::Uuid;

/// Reply text for faults caught outside the completion gateway.
pub const FAULT_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again later.";

pub const STATUS_CODE_KEY: &str = "status_code";

const DEFAULT_FAULT_STATUS: u16 = 500;

/// Handler error for `/chat`.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("{}", .0.error)]
    Invalid(Rejection),
    #[error(transparent)]
    Body(#[from] BytesRejection),
}

impl Fault {
    /// Nominal HTTP status the fault would have had without the always-200 policy.
    pub fn status_code(&self) -> u16 {
        match self {
            Fault::Invalid(r) => r.error.status_code(),
            Fault::Body(r) => r.status().as_u16(),
        }
    }
}

impl From<Rejection> for Fault {
    fn from(r: Rejection) -> Self {
        Fault::Invalid(r)
    }
}

impl Fault {
    /// Log the fault under `request_id` and render the always-200 fallback.
    pub fn into_fallback(self, request_id: Uuid) -> Response {
        let status_code = self.status_code();
        log::error!(
            "chat[{}]: request failed (status {}): {:?}",
            request_id,
            status_code,
            self
        );
        let context = match &self {
            Fault::Invalid(r) => r.context.clone(),
            Fault::Body(_) => Context::new(),
        };
        fallback_response(&self.to_string(), status_code, &context)
    }
}

/// Fallback body: `context` keeps `base` and adds `error` and `status_code`.
pub fn fallback_body(error: &str, status_code: u16, base: &Context) -> OutboundMessage {
    let context = merge_context(
        base,
        [
            (ERROR_KEY.to_string(), Value::String(error.to_string())),
            (STATUS_CODE_KEY.to_string(), Value::from(status_code)),
        ],
    );
    OutboundMessage::text(FAULT_APOLOGY, context)
}

pub fn fallback_response(error: &str, status_code: u16, base: &Context) -> Response {
    (StatusCode::OK, Json(fallback_body(error, status_code, base))).into_response()
}

/// Panic handler for `CatchPanicLayer`: the panic message becomes `context.error`.
/// The panic site and backtrace are printed by the default panic hook (`RUST_BACKTRACE`).
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    log::error!("unhandled fault in request handler: {}", detail);
    fallback_response(&detail, DEFAULT_FAULT_STATUS, &Context::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::protocol::parse_inbound;
    use serde_json::json;

    #[test]
    fn fallback_body_adds_diagnostics_over_context() {
        let base = json!({"session": "s1", "status_code": "stale"});
        let out = fallback_body("boom", 422, base.as_object().unwrap());
        assert_eq!(out.text, FAULT_APOLOGY);
        assert_eq!(
            Value::Object(out.context.unwrap()),
            json!({"session": "s1", "status_code": 422, "error": "boom"})
        );
    }

    #[test]
    fn validation_fault_uses_validation_status() {
        let fault = Fault::from(parse_inbound(br#"{"text":""}"#).unwrap_err());
        assert_eq!(fault.status_code(), 422);
        assert_eq!(fault.to_string(), "text: length must be between 1 and 2048, got 0");

        let fault = Fault::from(parse_inbound(b"nope").unwrap_err());
        assert_eq!(fault.status_code(), 400);
    }

    #[test]
    fn fault_fallback_is_always_ok() {
        let fault = Fault::from(parse_inbound(br#"{"context":{"k":1}}"#).unwrap_err());
        let res = fault.into_fallback(Uuid::nil());
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn panic_payloads_are_reported() {
        let res = handle_panic(Box::new("index out of bounds"));
        assert_eq!(res.status(), StatusCode::OK);
        let res = handle_panic(Box::new(String::from("owned message")));
        assert_eq!(res.status(), StatusCode::OK);
        let res = handle_panic(Box::new(7_u8));
        assert_eq!(res.status(), StatusCode::OK);
    }
}
