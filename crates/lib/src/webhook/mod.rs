//! Webhook surface: Watson Assistant wire types, validation, fault layer, and HTTP server.
//!
//! Routes: `GET /` (health), `POST /chat` (always 200), `GET /openapi.json`. Other methods on
//! `/chat` and unknown paths get the same 200 fallback body as a failed `/chat` call.

mod fault;
mod openapi;
mod protocol;
mod server;

pub use fault::{fallback_body, Fault, FAULT_APOLOGY, STATUS_CODE_KEY};
pub use protocol::{
    merge_context, parse_inbound, Context, InboundMessage, OutboundMessage, Rejection,
    ValidationError, MAX_TEXT_CHARS,
};
pub use server::{create_router, run_server, AppState, HealthResponse};
