use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status as stored. `Redeemed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Redeemed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Redeemed => "redeemed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TicketStatus::Active),
            "redeemed" => Ok(TicketStatus::Redeemed),
            other => Err(format!("unknown ticket status '{other}'")),
        }
    }
}

/// Status a scan reports. `Expired` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    Active,
    Redeemed,
    Expired,
}

/// Expiry takes precedence over whatever is stored.
pub fn effective_status(
    stored: TicketStatus,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EffectiveStatus {
    if now > expires_at {
        return EffectiveStatus::Expired;
    }
    match stored {
        TicketStatus::Active => EffectiveStatus::Active,
        TicketStatus::Redeemed => EffectiveStatus::Redeemed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: String,
    pub event_id: String,
    pub holder_name: String,
    pub status: TicketStatus,
    /// Copied from the event at issuance and never recomputed.
    pub expires_at: DateTime<Utc>,
}

/// Result of presenting a ticket at the gate. Every variant is a successful
/// answer; only `Valid` admits the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Valid { holder_name: String },
    AlreadyRedeemed,
    Expired,
    NoExist,
}

impl ScanOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Valid { .. } => "valid",
            ScanOutcome::AlreadyRedeemed => "already_redeemed",
            ScanOutcome::Expired => "expired",
            ScanOutcome::NoExist => "no_exist",
        }
    }
}
