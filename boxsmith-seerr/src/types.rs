//! Jellyseerr response types and status mapping.

use boxsmith_core::RequestStatus;
use serde::{Deserialize, Serialize};

/// Subset of `GET /movie/{tmdbId}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub media_info: Option<MediaInfo>,
}

impl MovieDetails {
    /// Year from `releaseDate` (`YYYY-MM-DD`).
    pub fn release_year(&self) -> Option<i32> {
        let date = self.release_date.as_deref()?;
        date.get(..4)?.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// 1 unknown, 2 pending, 3 processing, 4 partially available, 5 available.
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub requests: Vec<MediaRequest>,
}

#[derive(Debug, Deserialize)]
pub struct MediaRequest {
    pub id: u64,
    /// 1 pending approval, 2 approved, 3 declined.
    #[serde(default)]
    pub status: u8,
}

impl MediaInfo {
    /// Collapse media and request state into one status. `None` means the
    /// service knows the title but nobody has asked for it.
    pub fn request_status(&self) -> Option<RequestStatus> {
        match self.status {
            2 => return Some(RequestStatus::Pending),
            3 => return Some(RequestStatus::Processing),
            4 => return Some(RequestStatus::PartiallyAvailable),
            5 => return Some(RequestStatus::Available),
            _ => {}
        }
        let newest = self.requests.iter().max_by_key(|r| r.id)?;
        Some(match newest.status {
            1 => RequestStatus::Pending,
            2 => RequestStatus::Approved,
            3 => RequestStatus::Declined,
            _ => RequestStatus::Unknown,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub media_type: &'static str,
    pub media_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreatedRequest {
    pub id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
