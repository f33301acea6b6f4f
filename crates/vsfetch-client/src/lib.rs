//! vsfetch client - HTTP access to every external collaborator.
//!
//! The live feed and reference datasets are read through [`SourceClient`];
//! the versioned and tracked stores through [`StoreClient`], exposed as the
//! [`VersionedStore`] and [`TrackStore`] traits.

pub mod error;
pub mod http;
pub mod source;
pub mod store;

pub use error::{ClientError, Result};
pub use http::build_http_client;
pub use source::{SnapshotSource, SourceClient, SourceUrls};
pub use store::{Endpoint, StatusResponse, StoreClient, TrackStore, VersionedStore};
