//! HTTP route handlers.
//!
//! JSON endpoints are annotated with `#[openapi]` so `rocket_okapi` can
//! derive an OpenAPI document; the raw CSV upload is mounted separately.

pub mod health;
pub mod imports;
