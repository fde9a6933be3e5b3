//! Remote catalog persistence.
//!
//! The import pipeline only needs one operation from the catalog backend:
//! create a single product. [`ProductStore`] is that seam; [`HttpProductStore`]
//! is the production implementation talking JSON over HTTP.

pub mod client;
pub mod error;

use crate::import::record::{CreatedProduct, ProductRecord};

pub use client::HttpProductStore;
pub use error::StoreError;

/// Creates products in the remote catalog.
///
/// Implementations must tolerate up to one batch of concurrent calls.
#[rocket::async_trait]
pub trait ProductStore: Send + Sync {
    async fn create_product(&self, record: &ProductRecord) -> Result<CreatedProduct, StoreError>;
}
