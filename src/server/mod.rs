//! HTTP integration
//!
//! Wrap any axum route with a [`MarshalLayer`] to shape its JSON responses
//! according to the `fields` and `embedd` query parameters.

pub mod layer;

pub use layer::{MarshalLayer, MarshalService};
