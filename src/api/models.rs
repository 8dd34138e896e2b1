// API request/response models (DTOs)

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database_ops::user_data::UserRow;
use crate::leaderboard::SyncOptions;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Highest listing page accepted; keeps `offset()` far from i64 overflow.
pub const MAX_LIST_PAGE: i64 = 1_000_000;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
}

/// Body of `POST /sync-leaderboard`; every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StartSyncRequest {
    pub page: Option<i64>,
    pub pages: Option<i64>,
    pub workers: Option<usize>,
    pub delay_ms: Option<u64>,
}

impl From<StartSyncRequest> for SyncOptions {
    fn from(req: StartSyncRequest) -> Self {
        SyncOptions {
            start_page: req.page,
            pages: req.pages,
            workers: req.workers,
            delay: req.delay_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopSyncResponse {
    pub stopping: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UsersByCountryQuery {
    pub country: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated listing parameters.
#[derive(Debug, PartialEq, Eq)]
pub struct CountryPage {
    pub country: String,
    pub page: i64,
    pub limit: i64,
}

impl CountryPage {
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl UsersByCountryQuery {
    pub fn validate(&self) -> Result<CountryPage, String> {
        let country = self
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or("country code is not provided")?
            .to_ascii_uppercase();
        let page = self.page.unwrap_or(1);
        if !(1..=MAX_LIST_PAGE).contains(&page) {
            return Err(format!("page must be between 1 and {MAX_LIST_PAGE}"));
        }
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"));
        }
        Ok(CountryPage {
            country,
            page,
            limit,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UsersByCountryResponse {
    pub users: Vec<UserRow>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_query_defaults_and_normalizes() {
        let q = UsersByCountryQuery {
            country: Some(" us ".into()),
            ..Default::default()
        };
        let page = q.validate().unwrap();
        assert_eq!(page.country, "US");
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn country_query_rejects_bad_input() {
        assert!(UsersByCountryQuery::default().validate().is_err());
        for (page, limit) in [(0, 10), (1, 0), (1, 101)] {
            let q = UsersByCountryQuery {
                country: Some("UZ".into()),
                page: Some(page),
                limit: Some(limit),
            };
            assert!(q.validate().is_err(), "page={page} limit={limit}");
        }
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let q = UsersByCountryQuery {
            country: Some("CN".into()),
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(q.validate().unwrap().offset(), 50);
    }

    #[test]
    fn huge_page_is_rejected_and_offset_cannot_overflow() {
        let q = UsersByCountryQuery {
            country: Some("US".into()),
            page: Some(i64::MAX),
            limit: Some(MAX_PAGE_LIMIT),
        };
        assert!(q.validate().is_err());

        let last = UsersByCountryQuery {
            page: Some(MAX_LIST_PAGE),
            ..q
        };
        let page = last.validate().unwrap();
        assert_eq!(page.offset(), (MAX_LIST_PAGE - 1) * MAX_PAGE_LIMIT);

        let unchecked = CountryPage {
            country: "US".into(),
            page: i64::MAX,
            limit: MAX_PAGE_LIMIT,
        };
        assert_eq!(unchecked.offset(), i64::MAX);
    }

    #[test]
    fn start_request_maps_to_options() {
        let opts: SyncOptions = serde_json::from_str::<StartSyncRequest>(
            r#"{"page": 4, "pages": 2, "delay_ms": 250}"#,
        )
        .unwrap()
        .into();
        assert_eq!(opts.start_page, Some(4));
        assert_eq!(opts.pages, Some(2));
        assert_eq!(opts.workers, None);
        assert_eq!(opts.delay, Some(Duration::from_millis(250)));
    }
}
