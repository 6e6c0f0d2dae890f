//! Stream synchronization.
//!
//! `SyncEngine` walks the selected catalog streams one at a time. For each
//! stream it writes the schema, traverses the listing endpoint page by page,
//! normalizes and writes every record, and moves the bookmark according to
//! the configured ordering assumption.

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::bookmark::{BookmarkOrdering, BookmarkTracker};
use crate::catalog::{Catalog, CatalogEntry};
use crate::client::PersonioClient;
use crate::message::{Message, MessageSink};
use crate::paginator::{PageRequest, Paginator};
use crate::state::State;
use crate::streams::{QueryParam, StreamDefinition, StreamRegistry};
use crate::{TapConfig, TapError, TapResult};

/// Per-stream counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounters {
    /// Records the upstream reports for the stream.
    pub new: u64,
    pub updated: u64,
    /// Records actually written.
    pub emitted: u64,
}

/// Outcome of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub stream: String,
    pub counters: SyncCounters,
    pub pages: u32,
    pub failed_pages: u32,
    pub error: Option<String>,
}

impl StreamSummary {
    fn new(stream: &str) -> Self {
        Self {
            stream: stream.to_string(),
            counters: SyncCounters::default(),
            pages: 0,
            failed_pages: 0,
            error: None,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub streams: Vec<StreamSummary>,
}

impl SyncSummary {
    #[must_use]
    pub fn failed_streams(&self) -> Vec<String> {
        self.streams
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.stream.clone())
            .collect()
    }

    #[must_use]
    pub fn stream(&self, id: &str) -> Option<&StreamSummary> {
        self.streams.iter().find(|s| s.stream == id)
    }
}

/// Execution context of one tap run.
pub struct SyncEngine<S> {
    config: TapConfig,
    client: PersonioClient,
    registry: StreamRegistry,
    sink: S,
    last_summary: SyncSummary,
}

impl<S: MessageSink> SyncEngine<S> {
    /// Creates an engine for the bundled Personio streams.
    pub fn new(config: TapConfig, sink: S) -> TapResult<Self> {
        config.validate()?;
        let client = PersonioClient::new(&config)?;
        Ok(Self {
            config,
            client,
            registry: StreamRegistry::personio()?,
            sink,
            last_summary: SyncSummary::default(),
        })
    }

    /// Replaces the stream registry.
    #[must_use]
    pub fn with_registry(mut self, registry: StreamRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    #[must_use]
    pub fn client(&self) -> &PersonioClient {
        &self.client
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Summary of the most recent `sync`, including failed runs.
    #[must_use]
    pub fn last_summary(&self) -> &SyncSummary {
        &self.last_summary
    }

    /// Catalog of every registered stream. Performs no network I/O.
    #[must_use]
    pub fn discover(&self) -> Catalog {
        Catalog::discover(&self.registry)
    }

    /// Syncs every selected stream of `catalog`.
    ///
    /// Credentials are checked before anything is written. A stream whose
    /// traversal fails is abandoned and the run moves on; the run then ends
    /// with [`TapError::StreamsFailed`]. Authentication failures end the run
    /// immediately.
    #[instrument(skip_all)]
    pub async fn sync(&mut self, state: State, catalog: &Catalog) -> TapResult<SyncSummary> {
        info!(state = ?state, "Starting sync");
        self.last_summary = SyncSummary::default();
        catalog.validate()?;

        self.client.tokens().authenticate().await?;

        let mut state = state;
        for entry in catalog.selected_streams(&state) {
            let Some(definition) = self.registry.get(&entry.tap_stream_id).cloned() else {
                warn!(stream = %entry.tap_stream_id, "Stream is not known to this tap, skipping");
                continue;
            };

            let mut summary = StreamSummary::new(&entry.tap_stream_id);
            match self.sync_stream(entry, &definition, &mut state, &mut summary).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    summary.error = Some(e.to_string());
                    self.last_summary.streams.push(summary);
                    return Err(e);
                }
                Err(e) => {
                    error!(stream = %entry.tap_stream_id, error = %e, "Stream aborted");
                    summary.error = Some(e.to_string());
                }
            }
            self.last_summary.streams.push(summary);
        }

        self.sink.flush()?;

        let failed = self.last_summary.failed_streams();
        if !failed.is_empty() {
            return Err(TapError::StreamsFailed { streams: failed });
        }
        Ok(self.last_summary.clone())
    }

    #[instrument(skip(self, entry, definition, state, summary), fields(stream = %entry.tap_stream_id))]
    async fn sync_stream(
        &mut self,
        entry: &CatalogEntry,
        definition: &StreamDefinition,
        state: &mut State,
        summary: &mut StreamSummary,
    ) -> TapResult<()> {
        let stream_id = entry.tap_stream_id.as_str();
        info!("Syncing stream: {}", stream_id);

        let replication_key = entry
            .replication_key()
            .map(String::from)
            .or_else(|| definition.replication_key.clone());

        self.sink.write(&Message::Schema {
            stream: stream_id.to_string(),
            schema: entry.schema.clone(),
            key_properties: entry.key_properties.clone(),
            bookmark_properties: replication_key.iter().cloned().collect(),
        })?;

        summary.counters = SyncCounters::default();

        let prior = replication_key
            .as_deref()
            .and_then(|key| state.bookmark(stream_id, key))
            .cloned();
        let mut tracker = BookmarkTracker::new(
            stream_id,
            replication_key,
            BookmarkOrdering::from_sorted(self.config.assume_sorted),
            prior,
        );
        if let Some(prior) = tracker.prior() {
            info!(bookmark = %prior, "Resuming from bookmark");
        }

        let url = self.client.stream_url(definition);
        let start_date = self.config.start_date;
        let end_date = Utc::now().date_naive();
        info!(start_date = %start_date, end_date = %end_date, url = %url, "Start date: {}", start_date);
        if !definition.accepts(QueryParam::StartDate) {
            info!("Endpoint does not filter by date, extracting full history");
        }

        let request =
            PageRequest::for_stream(definition, url, start_date, end_date, self.config.page_limit);
        let mut paginator = Paginator::new(&self.client, request);
        let time_extracted = Utc::now();

        while let Some(result) = paginator.next_page().await {
            let page = result?;
            summary.pages += 1;

            if !page.success {
                summary.failed_pages += 1;
                error!(
                    url = %paginator.url(),
                    offset = paginator.cursor().offset,
                    error = ?page.error,
                    metadata = ?page.metadata,
                    "Failed to get data"
                );
                continue;
            }

            summary.counters.new = page
                .total_elements()
                .unwrap_or_else(|| page.records().len() as u64);

            for raw in page.into_records() {
                let record = definition.transform.apply(raw);
                let bookmark = tracker.observe(&record);

                self.sink.write(&Message::Record {
                    stream: stream_id.to_string(),
                    record,
                    time_extracted: Some(time_extracted),
                })?;

                if let (Some(value), Some(key)) = (bookmark, tracker.replication_key()) {
                    write_bookmark(&mut self.sink, state, stream_id, key, value)?;
                }
                summary.counters.emitted += 1;
            }
        }

        let key = tracker.replication_key().map(String::from);
        if let (Some(max), Some(key)) = (tracker.finish(), key) {
            write_bookmark(&mut self.sink, state, stream_id, &key, max)?;
        }

        info!(
            emitted = summary.counters.emitted,
            "Extracted {} records from {}", summary.counters.new, stream_id
        );
        Ok(())
    }
}

fn write_bookmark<S: MessageSink>(
    sink: &mut S,
    state: &mut State,
    stream: &str,
    key: &str,
    value: Value,
) -> TapResult<()> {
    state.set_bookmark(stream, key, value);
    sink.write(&Message::State {
        value: state.to_value()?,
    })
}
