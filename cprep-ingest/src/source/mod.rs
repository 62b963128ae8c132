//! Remote practice platform client
//!
//! - [`transport`]: raw HTTP POST of GraphQL payloads
//! - [`retry`]: the one retrying layer every operation goes through
//! - [`client`]: paginated operations built on top

pub mod client;
pub mod queries;
pub mod retry;
pub mod transport;

pub use client::{
    AcceptedSubmission, CatalogFetch, ClientSettings, SlugTitle, SourceClient,
};
pub use retry::{FetchError, RetryPolicy, RetryingTransport};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
