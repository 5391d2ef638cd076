//! # HTTP Gateway
//!
//! A small axum server in front of an [`Analyzer`](crate::analyzer::Analyzer):
//! the single-page UI on `/`, the JSON analysis endpoint on `/visualize`, and
//! a `/health` probe.

mod events;
mod page;
mod server;

pub use events::{VisualizeFailure, VisualizeRequest, VisualizeResponse, VisualizeSuccess};
pub use page::INDEX_HTML;
pub use server::{GatewayState, router as gateway_router, run as run_gateway};
