//! Page-by-page traversal of a listing endpoint.
//!
//! The page count is unknown until the first response arrives: page 1's
//! `metadata.total_pages` bounds the traversal. A paginator is pulled one
//! page at a time and cannot be restarted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::PersonioClient;
use crate::streams::{OffsetStep, QueryParam, StreamDefinition};
use crate::TapResult;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 200;

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u32>,
}

/// One decoded API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Page {
    /// Records of a successful page. Failed pages have none.
    #[must_use]
    pub fn records(&self) -> &[Value] {
        if !self.success {
            return &[];
        }
        self.data.as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Takes ownership of the records.
    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        match (self.success, self.data) {
            (true, Value::Array(records)) => records,
            _ => Vec::new(),
        }
    }

    /// `metadata.total_elements`, when the upstream sent it.
    #[must_use]
    pub fn total_elements(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.total_elements)
    }
}

/// Everything needed to traverse one stream's listing endpoint.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub stream: String,
    pub url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub limit: u32,
    pub offset_step: OffsetStep,
}

impl PageRequest {
    pub fn for_stream(
        stream: &StreamDefinition,
        url: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        limit: u32,
    ) -> Self {
        Self {
            stream: stream.id.clone(),
            url: url.into(),
            start_date,
            end_date,
            limit,
            offset_step: stream.offset_step,
        }
    }
}

/// Mutable traversal position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: u64,
    /// Pages fetched so far.
    pub page_index: u32,
    /// Known after page 1.
    pub total_pages: Option<u32>,
    pub limit: u32,
}

/// Pull-based page sequence over one endpoint.
pub struct Paginator<'a> {
    client: &'a PersonioClient,
    request: PageRequest,
    cursor: PageCursor,
    finished: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a PersonioClient, request: PageRequest) -> Self {
        let cursor = PageCursor {
            offset: 0,
            page_index: 0,
            total_pages: None,
            limit: request.limit,
        };
        Self {
            client,
            request,
            cursor,
            finished: false,
        }
    }

    #[must_use]
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.request.url
    }

    /// Query string for the current cursor. The date window and paging
    /// parameters go out on every request.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        QueryParam::ALL
            .iter()
            .map(|p| {
                let value = match p {
                    QueryParam::StartDate => self.request.start_date.to_string(),
                    QueryParam::EndDate => self.request.end_date.to_string(),
                    QueryParam::Limit => self.cursor.limit.to_string(),
                    QueryParam::Offset => self.cursor.offset.to_string(),
                };
                (p.as_str(), value)
            })
            .collect()
    }

    /// Fetches the next page, or `None` once the traversal is over.
    ///
    /// A fetch error is yielded once and ends the traversal.
    pub async fn next_page(&mut self) -> Option<TapResult<Page>> {
        if self.finished {
            return None;
        }

        if self.cursor.page_index > 0 {
            let total = self.cursor.total_pages.unwrap_or(1);
            if self.cursor.page_index >= total {
                self.finished = true;
                return None;
            }
            self.cursor.offset = self
                .request
                .offset_step
                .advance(self.cursor.offset, self.cursor.limit);
        }

        let query = self.query();
        match self
            .client
            .fetch_page(&self.request.stream, &self.request.url, &query)
            .await
        {
            Ok(page) => {
                if self.cursor.page_index == 0 {
                    self.cursor.total_pages = Some(first_page_total(&page));
                    if let Some(ref meta) = page.metadata {
                        info!(stream = %self.request.stream, metadata = ?meta, "Metadata");
                    }
                }
                self.cursor.page_index += 1;
                info!(
                    stream = %self.request.stream,
                    "Batch {} of {}",
                    self.cursor.page_index,
                    self.cursor.total_pages.unwrap_or(1)
                );
                debug!(offset = self.cursor.offset, "Page fetched");
                Some(Ok(page))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Page count declared by page 1. Failed or metadata-less pages end the traversal.
fn first_page_total(page: &Page) -> u32 {
    if !page.success {
        return 1;
    }
    page.metadata
        .as_ref()
        .map_or(1, |m| m.total_pages.unwrap_or(1))
}
