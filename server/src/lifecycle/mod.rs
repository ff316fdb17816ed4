//! Event creation, ticket issuance and the scan/redeem state machine.
//!
//! Ticket states: `active -> redeemed` (terminal). `expired` is derived at
//! scan time from the ticket's snapshot expiry and is never written back.
//!
//! Cross-request invariants (unique ids, at-most-once redemption) are left to
//! the store: the engine holds no in-process locks, so any number of engine
//! instances can share one database.

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::SubsecRound;

use crate::artifact::{self, ArtifactError, TicketArtifact};
use crate::auth::CredentialVerifier;
use crate::clock::Clock;
use crate::identity;
use crate::models::account::{Credentials, Role};
use crate::models::event::{display_schedule, normalize_details, Event, NewEvent};
use crate::models::ticket::{effective_status, EffectiveStatus, ScanOutcome, Ticket, TicketStatus};
use crate::store::{catalog, Store, StoreError};
use crate::time_window::{
    format_timestamp, parse_store_timestamp, validate_event_window, validate_ticket_issuance,
};

pub use error::LifecycleError;

/// A freshly issued ticket and where its artifact was written.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub ticket: Ticket,
    pub artifact_path: PathBuf,
}

pub struct LifecycleEngine {
    store: Arc<dyn Store>,
    verifier: Arc<dyn CredentialVerifier>,
    clock: Arc<dyn Clock>,
    artifact_dir: PathBuf,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn Store>,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            verifier,
            clock,
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Resolves credentials for `role` to an account id.
    pub async fn authorize(
        &self,
        role: Role,
        credentials: &Credentials,
    ) -> Result<String, LifecycleError> {
        let account = self
            .verifier
            .verify(role, &credentials.username, &credentials.password)
            .await?;

        account.ok_or_else(|| {
            tracing::warn!(%role, username = %credentials.username, "Credential verification failed");
            LifecycleError::Unauthorized
        })
    }

    /// Validates the schedule, then authorizes, then persists.
    ///
    /// Date errors never reach the store and are reported even to callers
    /// whose credentials would fail.
    pub async fn create_event(
        &self,
        credentials: &Credentials,
        new_event: NewEvent,
    ) -> Result<Event, LifecycleError> {
        let name = required("name", &new_event.name)?;
        let venue = required("venue", &new_event.venue)?;
        let window = validate_event_window(
            &new_event.starts_at,
            &new_event.ends_at,
            &new_event.expires_at,
            self.clock.now(),
        )?;

        let organization_id = self.authorize(Role::Organization, credentials).await?;

        let event = Event {
            id: identity::generate(),
            organization_id,
            name: name.to_string(),
            venue: venue.to_string(),
            optional_details: normalize_details(new_event.optional_details.as_deref()),
            starts_at: window.starts_at,
            ends_at: window.ends_at,
            expires_at: window.expires_at,
        };

        let starts_at = format_timestamp(event.starts_at);
        let ends_at = format_timestamp(event.ends_at);
        let expires_at = format_timestamp(event.expires_at);
        self.store
            .exec_prepared_command(
                catalog::INSERT_EVENT,
                &[
                    Some(event.id.as_str()),
                    Some(event.name.as_str()),
                    Some(event.venue.as_str()),
                    event.optional_details.as_deref(),
                    Some(event.organization_id.as_str()),
                    Some(starts_at.as_str()),
                    Some(ends_at.as_str()),
                    Some(expires_at.as_str()),
                ],
            )
            .await?;

        tracing::info!(event_id = %event.id, organization_id = %event.organization_id, "Event created");
        Ok(event)
    }

    /// Issues a ticket for an event owned by the calling organization.
    ///
    /// The artifact is rendered into a file that did not exist before, and
    /// only then is the ticket row written: a render failure leaves no row,
    /// and a failed insert removes the file this call created. No store lock
    /// or transaction is held while rendering.
    pub async fn issue_ticket(
        &self,
        credentials: &Credentials,
        event_id: &str,
        holder_name: &str,
        filename: Option<&str>,
    ) -> Result<IssuedTicket, LifecycleError> {
        let holder_name = required("holder_name", holder_name)?;
        let ticket_id = identity::generate();
        let artifact_path = self
            .artifact_dir
            .join(artifact_file_name(filename, &ticket_id)?);

        let organization_id = self.authorize(Role::Organization, credentials).await?;

        if !identity::is_well_formed(event_id) {
            return Err(LifecycleError::EventNotFound);
        }

        let rows = self
            .store
            .exec_prepared(
                catalog::SELECT_OWNED_EVENT,
                &[Some(event_id), Some(organization_id.as_str())],
            )
            .await?;
        let (event, schedule) = match rows.first() {
            Some(row) => (
                Event::from_row(event_id, &organization_id, row)?,
                display_schedule(row)?,
            ),
            None => {
                tracing::warn!(event_id, "Ticket requested for unknown event");
                return Err(LifecycleError::EventNotFound);
            }
        };

        validate_ticket_issuance(event.expires_at, self.clock.now())?;

        render_artifact(&ticket_id, &event, schedule, artifact_path.clone())
            .await
            .map_err(|e| match e {
                ArtifactError::PathInUse(path) => {
                    tracing::warn!(%path, "Ticket artifact name already taken");
                    LifecycleError::MalformedInput("filename is already in use".to_string())
                }
                other => other.into(),
            })?;

        let ticket = Ticket {
            id: ticket_id,
            event_id: event.id.clone(),
            holder_name: holder_name.to_string(),
            status: TicketStatus::Active,
            expires_at: event.expires_at,
        };

        let expires_at = format_timestamp(ticket.expires_at);
        let inserted = self
            .store
            .exec_prepared_command(
                catalog::INSERT_TICKET,
                &[
                    Some(ticket.id.as_str()),
                    Some(ticket.event_id.as_str()),
                    Some(ticket.holder_name.as_str()),
                    Some(expires_at.as_str()),
                ],
            )
            .await;

        if let Err(e) = inserted {
            discard_artifact(&artifact_path).await;
            return Err(e.into());
        }

        tracing::info!(ticket_id = %ticket.id, event_id = %ticket.event_id, "Ticket issued");
        Ok(IssuedTicket {
            ticket,
            artifact_path,
        })
    }

    /// Authorizes gate staff, then scans.
    pub async fn scan_ticket_as(
        &self,
        staff: &Credentials,
        event_id: &str,
        ticket_id: &str,
    ) -> Result<ScanOutcome, LifecycleError> {
        self.authorize(Role::Staff, staff).await?;
        self.scan_ticket(event_id, ticket_id).await
    }

    /// Redeems a ticket presented for `event_id`.
    ///
    /// The redemption itself is one conditional update, so of two concurrent
    /// scans of the same active ticket exactly one sees `Valid`. When it
    /// matches nothing, the ticket is read back to explain why, in priority
    /// order: does not exist, expired, already redeemed.
    pub async fn scan_ticket(
        &self,
        event_id: &str,
        ticket_id: &str,
    ) -> Result<ScanOutcome, LifecycleError> {
        if !identity::is_well_formed(event_id) || !identity::is_well_formed(ticket_id) {
            tracing::info!(event_id, ticket_id, outcome = "no_exist", "Ticket scanned");
            return Ok(ScanOutcome::NoExist);
        }

        let now = self.clock.now().trunc_subsecs(0);
        let now_text = format_timestamp(now);

        let mut tx = self.store.transaction().await?;
        let redeemed = tx
            .exec_prepared(
                catalog::REDEEM_TICKET,
                &[Some(ticket_id), Some(event_id), Some(now_text.as_str())],
            )
            .await?;

        let outcome = match redeemed.first() {
            Some(row) => ScanOutcome::Valid {
                holder_name: row.text(0)?.to_string(),
            },
            None => {
                let rows = tx
                    .exec_prepared(
                        catalog::SELECT_TICKET_STATE,
                        &[Some(ticket_id), Some(event_id)],
                    )
                    .await?;
                match rows.first() {
                    None => ScanOutcome::NoExist,
                    Some(row) => {
                        let status = row
                            .text(0)?
                            .parse::<TicketStatus>()
                            .map_err(StoreError::ExecFailed)?;
                        let expires_at = parse_store_timestamp(row.text(1)?)
                            .map_err(|e| StoreError::ExecFailed(e.to_string()))?;

                        match effective_status(status, expires_at, now) {
                            EffectiveStatus::Expired => ScanOutcome::Expired,
                            EffectiveStatus::Redeemed => ScanOutcome::AlreadyRedeemed,
                            EffectiveStatus::Active => {
                                return Err(StoreError::ExecFailed(
                                    "ticket is active but could not be redeemed".to_string(),
                                )
                                .into());
                            }
                        }
                    }
                }
            }
        };
        tx.commit().await?;

        tracing::info!(event_id, ticket_id, outcome = outcome.label(), "Ticket scanned");
        Ok(outcome)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, LifecycleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LifecycleError::MalformedInput(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Caller-chosen artifact name, or `<ticket_id>.pdf`. Names must be plain
/// file names; `.pdf` is appended when missing.
fn artifact_file_name(requested: Option<&str>, ticket_id: &str) -> Result<String, LifecycleError> {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        None => Ok(format!("{ticket_id}.pdf")),
        Some(name) if name.starts_with('.') || name.contains(|c: char| c == '/' || c == '\\') => {
            Err(LifecycleError::MalformedInput(
                "filename must be a plain file name".to_string(),
            ))
        }
        Some(name) if name.ends_with(".pdf") => Ok(name.to_string()),
        Some(name) => Ok(format!("{name}.pdf")),
    }
}

/// `schedule` is the display form of the event's start and end.
async fn render_artifact(
    ticket_id: &str,
    event: &Event,
    schedule: (String, String),
    path: PathBuf,
) -> Result<(), ArtifactError> {
    let ticket_id = ticket_id.to_string();
    let name = event.name.clone();
    let venue = event.venue.clone();
    let details = event.optional_details.clone();
    let (starts_at, ends_at) = schedule;

    tokio::task::spawn_blocking(move || {
        artifact::render(
            &TicketArtifact {
                ticket_id: &ticket_id,
                event_name: &name,
                venue: &venue,
                details: details.as_deref(),
                starts_at: &starts_at,
                ends_at: &ends_at,
            },
            &path,
        )
        .map(|_| ())
    })
    .await
    .map_err(|e| ArtifactError::RenderInitFailed(e.to_string()))?
}

async fn discard_artifact(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove orphaned ticket artifact");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_file_name() {
        let id = "6f1c2a9e-0b7d-4c1e-9a55-2d1f0c3b4e5a";
        assert_eq!(artifact_file_name(None, id).unwrap(), format!("{id}.pdf"));
        assert_eq!(artifact_file_name(Some("  "), id).unwrap(), format!("{id}.pdf"));
        assert_eq!(artifact_file_name(Some("ada"), id).unwrap(), "ada.pdf");
        assert_eq!(artifact_file_name(Some("ada.pdf"), id).unwrap(), "ada.pdf");

        for bad in ["../ada", "a/b", "a\\b", ".hidden"] {
            assert!(matches!(
                artifact_file_name(Some(bad), id),
                Err(LifecycleError::MalformedInput(_))
            ));
        }
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Gala ").unwrap(), "Gala");
        assert!(matches!(
            required("name", " \t"),
            Err(LifecycleError::MalformedInput(msg)) if msg == "name is required"
        ));
    }
}
