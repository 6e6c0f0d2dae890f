//! Personio extraction engine
//!
//! Pulls HR records from the Personio REST API and writes them as a
//! schema-tagged message stream (Singer JSON lines), keeping a resumable
//! bookmark per stream.
//!
//! # Features
//!
//! - Client-credential authentication with a configurable token refresh cadence
//! - Metadata-driven offset pagination
//! - Sorted and unsorted replication-key bookmarks
//! - Per-stream record normalization (employee attribute flattening)
//! - Offline discovery of the bundled stream schemas
//!
//! # Example
//!
//! ```no_run
//! use personio_extract::{Catalog, JsonLinesSink, State, SyncEngine, TapConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TapConfig::from_file("config.json")?;
//! let mut engine = SyncEngine::new(config, JsonLinesSink::stdout())?;
//! let catalog = engine.discover();
//! engine.sync(State::default(), &catalog).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod bookmark;
pub mod catalog;
pub mod client;
pub mod config;
mod error;
pub mod message;
pub mod paginator;
pub mod state;
pub mod streams;
pub mod sync;
pub mod transform;

// Re-exports
pub use auth::{AuthToken, RefreshCadence, TokenProvider};
pub use bookmark::{BookmarkOrdering, BookmarkTracker};
pub use catalog::{Catalog, CatalogEntry, MetadataEntry};
pub use client::PersonioClient;
pub use config::{TapConfig, REQUIRED_CONFIG_KEYS};
pub use error::{TapError, TapResult};
pub use message::{JsonLinesSink, MemorySink, Message, MessageSink};
pub use paginator::{Page, PageCursor, PageMetadata, PageRequest, Paginator};
pub use state::State;
pub use streams::{OffsetStep, QueryParam, StreamDefinition, StreamRegistry};
pub use sync::{StreamSummary, SyncCounters, SyncEngine, SyncSummary};
pub use transform::RecordTransform;
