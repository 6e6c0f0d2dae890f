//! Common test utilities for personio-extract integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use personio_extract::{Catalog, TapConfig};

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";

/// Test data factory for a raw employee record with attribute wrappers.
pub fn create_employee(id: u64, first_name: &str) -> Value {
    json!({
        "type": "Employee",
        "attributes": {
            "id": {"label": "ID", "value": id, "type": "integer", "universal_id": "id"},
            "first_name": {"label": "First name", "value": first_name, "type": "standard"},
            "email": {"label": "Email", "value": format!("{}@example.com", first_name.to_lowercase())}
        }
    })
}

/// Test data factory for an attendance period.
pub fn create_attendance(id: u64, updated_at: &str) -> Value {
    json!({
        "id": id,
        "type": "AttendancePeriod",
        "updated_at": updated_at,
        "attributes": {
            "employee": 1,
            "date": "2023-01-02",
            "start_time": "09:00",
            "end_time": "17:00",
            "break": 30
        }
    })
}

/// Test data factory for a project.
pub fn create_project(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "type": "Project",
        "attributes": {"name": name, "active": true}
    })
}

/// Wraps records in a successful page, optionally with pagination metadata.
pub fn create_page(records: Vec<Value>, metadata: Option<(u32, u64)>) -> Value {
    let mut page = json!({"success": true, "data": records});
    if let Some((total_pages, total_elements)) = metadata {
        page["metadata"] = json!({
            "total_elements": total_elements,
            "current_page": 0,
            "total_pages": total_pages
        });
    }
    page
}

/// Creates a `success: false` page.
pub fn create_failed_page(message: &str) -> Value {
    json!({"success": false, "error": {"code": 0, "message": message}})
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Mock server wrapper with common setup helpers.
pub struct MockPersonioServer {
    pub server: MockServer,
}

impl MockPersonioServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// API root on the mock server.
    pub fn base_url(&self) -> String {
        format!("{}/v1", self.server.uri())
    }

    /// Config pointing at the mock server.
    pub fn config(&self) -> TapConfig {
        TapConfig::new(CLIENT_ID, CLIENT_SECRET, start_date()).with_base_url(self.base_url())
    }

    /// Auth endpoint answering with a fresh token.
    pub async fn mock_auth(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/auth"))
            .and(query_param("client_id", CLIENT_ID))
            .and(query_param("client_secret", CLIENT_SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"token": token}
            })))
            .mount(&self.server)
            .await;
    }

    /// Auth endpoint rejecting the credentials.
    pub async fn mock_auth_failure(&self, message: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/auth"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "data": {"message": message}
            })))
            .mount(&self.server)
            .await;
    }

    /// Listing endpoint returning `body` for any query.
    pub async fn mock_listing(&self, company_path: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/company/{company_path}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Listing endpoint returning `body` only for one offset.
    pub async fn mock_listing_at_offset(&self, company_path: &str, offset: u64, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/company/{company_path}")))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Listing endpoint failing with a non-JSON body at one offset.
    pub async fn mock_broken_listing_at_offset(&self, company_path: &str, offset: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/company/{company_path}")))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&self.server)
            .await;
    }

    /// Mounts consecutive pages at offsets `0, step, 2*step, ..`.
    pub async fn mock_pages(&self, company_path: &str, step: u64, pages: Vec<Value>) {
        for (i, page) in pages.into_iter().enumerate() {
            self.mock_listing_at_offset(company_path, i as u64 * step, page)
                .await;
        }
    }

    /// Number of requests made to the auth endpoint.
    pub async fn auth_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/v1/auth")
            .count()
    }

    /// `offset` query values of every GET to `company_path`, in request order.
    pub async fn listing_offsets(&self, company_path: &str) -> Vec<Option<String>> {
        let wanted = format!("/v1/company/{company_path}");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == wanted)
            .map(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "offset")
                    .map(|(_, v)| v.into_owned())
            })
            .collect()
    }
}

/// Marks only `ids` as selected and optionally sets a replication key on one stream.
pub fn select_streams(mut catalog: Catalog, ids: &[&str], replication_key: Option<(&str, &str)>) -> Catalog {
    for entry in &mut catalog.streams {
        let selected = ids.contains(&entry.tap_stream_id.as_str());
        if let Some(meta) = entry.metadata.iter_mut().find(|m| m.breadcrumb.is_empty()) {
            meta.metadata.insert("selected".into(), json!(selected));
        }
        if let Some((stream, key)) = replication_key {
            if entry.tap_stream_id == stream {
                entry.replication_key = Some(key.to_string());
            }
        }
    }
    catalog
}
