//! cprep-ingest library interface
//!
//! Pulls problem data from the remote practice platform and from
//! per-company CSV dumps into the canonical problem store.
//!
//! Data flow: source client → slug resolver → merge engine → store.
//! The company CSVs themselves come from the feed [`download`]er.

pub mod archive;
pub mod catalog;
pub mod company;
pub mod csv_source;
pub mod download;
pub mod merge;
pub mod slug;
pub mod source;

pub use download::{DownloadReport, FeedDownloader, FeedTransport};
pub use merge::{BatchReport, FolderReport, MergeEngine};
pub use slug::{resolve_slug, ResolvedSlug, SlugResolutionError, SlugRule};
pub use source::{FetchError, HttpTransport, RetryPolicy, SourceClient, Transport};
