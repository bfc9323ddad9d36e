//! Forwarding missing titles to the request service.
//!
//! Per title: unchecked, then already requested, unreleased or eligible; in
//! send mode an eligible title then becomes requested or failed.

use std::collections::HashSet;

use boxsmith_core::{
    CreateRequestOutcome, ForwardMode, MissingItem, RequestService, RequestStatus, RetryPolicy,
    with_retry,
};

use crate::events::{EventSink, RunEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardState {
    AlreadyRequested(RequestStatus),
    /// The catalog had no date, and the request service dates it after the
    /// current year.
    Unreleased { year: i32 },
    /// Nobody has asked for the title yet.
    Eligible,
    Requested {
        /// `None` when the service reported the request as a duplicate.
        request_id: Option<String>,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedItem {
    pub item: MissingItem,
    pub state: ForwardState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardResult {
    pub mode: ForwardMode,
    /// Titles the service was asked about.
    pub checked: usize,
    pub already_requested: Vec<ForwardedItem>,
    pub unreleased: Vec<ForwardedItem>,
    pub eligible: Vec<ForwardedItem>,
    pub sent: Vec<ForwardedItem>,
    pub failed: Vec<ForwardedItem>,
}

/// Check (and in [`ForwardMode::Send`], request) each missing title.
///
/// Titles are handled once per catalog id. Already requested titles never
/// reach the create call, and a duplicate response counts as requested.
/// With `unreleased_after` set, an undated title is dated through the
/// service and held back when it releases after that year.
pub async fn forward<R: RequestService>(
    missing: &[MissingItem],
    mode: ForwardMode,
    service: &R,
    retry: &RetryPolicy,
    unreleased_after: Option<i32>,
    events: &EventSink,
) -> ForwardResult {
    let mut result = ForwardResult {
        mode,
        ..ForwardResult::default()
    };
    if mode == ForwardMode::Disabled {
        return result;
    }

    let mut seen = HashSet::new();
    let unique: Vec<&MissingItem> = missing
        .iter()
        .filter(|m| seen.insert(m.external_id))
        .collect();

    for (idx, item) in unique.iter().enumerate() {
        let id = item.external_id;
        let label = format!("check request for TMDb {id}");
        let found = with_retry(retry, &label, || service.find_request(id)).await;
        result.checked += 1;

        let undecided = match &found {
            Ok(status) => !status.is_some_and(RequestStatus::is_outstanding),
            Err(_) => false,
        };
        let future_year = match unreleased_after {
            Some(current) if undecided && item.release_year.is_none() => {
                service_release_year(service, item, retry)
                    .await
                    .filter(|y| *y > current)
            }
            _ => None,
        };

        let state = match (found, future_year) {
            (Ok(Some(status)), _) if status.is_outstanding() => {
                ForwardState::AlreadyRequested(status)
            }
            (Ok(_), Some(year)) => {
                log::info!("Holding back unreleased '{}' (TMDb {}, {})", item.title, id, year);
                ForwardState::Unreleased { year }
            }
            (Ok(_), None) if mode == ForwardMode::CheckOnly => ForwardState::Eligible,
            (Ok(_), None) => {
                let label = format!("request TMDb {id}");
                match with_retry(retry, &label, || service.create_request(id)).await {
                    Ok(CreateRequestOutcome::Created { request_id }) => {
                        log::info!("Requested '{}' (TMDb {})", item.title, id);
                        ForwardState::Requested {
                            request_id: Some(request_id),
                        }
                    }
                    Ok(CreateRequestOutcome::Duplicate) => {
                        log::info!("'{}' (TMDb {}) was already requested", item.title, id);
                        ForwardState::Requested { request_id: None }
                    }
                    Err(e) => {
                        log::warn!("Request for '{}' (TMDb {}) failed: {}", item.title, id, e);
                        ForwardState::Failed(e.to_string())
                    }
                }
            }
            (Err(e), _) => {
                log::warn!("Could not check '{}' (TMDb {}): {}", item.title, id, e);
                ForwardState::Failed(e.to_string())
            }
        };

        let forwarded = ForwardedItem {
            item: (*item).clone(),
            state,
        };
        match forwarded.state {
            ForwardState::AlreadyRequested(_) => result.already_requested.push(forwarded),
            ForwardState::Unreleased { .. } => result.unreleased.push(forwarded),
            ForwardState::Eligible => result.eligible.push(forwarded),
            ForwardState::Requested { .. } => result.sent.push(forwarded),
            ForwardState::Failed(_) => result.failed.push(forwarded),
        }

        events.emit(RunEvent::Forwarded {
            done: idx + 1,
            total: unique.len(),
            title: item.title.clone(),
        });
    }

    result
}

/// Release year from the request service; a failed lookup counts as unknown.
async fn service_release_year<R: RequestService>(
    service: &R,
    item: &MissingItem,
    retry: &RetryPolicy,
) -> Option<i32> {
    let id = item.external_id;
    let label = format!("release date for TMDb {id}");
    match with_retry(retry, &label, || service.release_year(id)).await {
        Ok(year) => year,
        Err(e) => {
            log::debug!("No release date for '{}' (TMDb {}): {}", item.title, id, e);
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/forwarder_tests.rs"]
mod tests;
