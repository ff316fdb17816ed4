use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Row, StoreError};
use crate::time_window::{format_display, parse_store_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub venue: String,
    pub optional_details: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Event {
    /// Builds an event from a `SELECT_OWNED_EVENT` row
    /// (name, venue, optional_details, starts_at, ends_at, expires_at).
    ///
    /// Empty details are treated the same as NULL.
    pub fn from_row(id: &str, organization_id: &str, row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: id.to_string(),
            organization_id: organization_id.to_string(),
            name: row.text(0)?.to_string(),
            venue: row.text(1)?.to_string(),
            optional_details: normalize_details(row.opt_text(2)?),
            starts_at: timestamp_column(row, 3)?,
            ends_at: timestamp_column(row, 4)?,
            expires_at: timestamp_column(row, 5)?,
        })
    }
}

/// Start and end of a `SELECT_OWNED_EVENT` row as printed on a ticket, e.g.
/// `9 Dec, 2025  6:05 PM UTC`.
pub fn display_schedule(row: &Row) -> Result<(String, String), StoreError> {
    Ok((format_display(row.text(3)?), format_display(row.text(4)?)))
}

fn timestamp_column(row: &Row, index: usize) -> Result<DateTime<Utc>, StoreError> {
    parse_store_timestamp(row.text(index)?).map_err(|e| StoreError::ExecFailed(e.to_string()))
}

/// Blank details carry no information; they are stored and shown as absent.
pub fn normalize_details(details: Option<&str>) -> Option<String> {
    details
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Fields an organization supplies to schedule an event.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub venue: String,
    pub starts_at: String,
    pub ends_at: String,
    pub expires_at: String,
    #[serde(default)]
    pub optional_details: Option<String>,
}
