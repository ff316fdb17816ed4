//! Every statement the service runs, registered once at start-up.
//!
//! Timestamp parameters are UTC wall-clock text (`YYYY-MM-DD HH:MM:SS`).
//! Timestamps come back as `timestamptz` text, which is `...+00` because the
//! connection's time zone is UTC.

use super::{Store, StoreError};

pub const VERIFY_ORGANIZATION: &str = "verify_organization";
pub const VERIFY_STAFF: &str = "verify_staff";
pub const INSERT_EVENT: &str = "insert_event";
pub const SELECT_OWNED_EVENT: &str = "select_owned_event";
pub const INSERT_TICKET: &str = "insert_ticket";
pub const REDEEM_TICKET: &str = "redeem_ticket";
pub const SELECT_TICKET_STATE: &str = "select_ticket_state";

pub struct StatementDef {
    pub name: &'static str,
    pub sql: &'static str,
    pub arity: usize,
}

pub const STATEMENTS: &[StatementDef] = &[
    // -> id
    StatementDef {
        name: VERIFY_ORGANIZATION,
        sql: "SELECT id::text FROM organizations WHERE username = $1 AND password = $2",
        arity: 2,
    },
    // -> id
    StatementDef {
        name: VERIFY_STAFF,
        sql: "SELECT id::text FROM staff WHERE username = $1 AND password = $2",
        arity: 2,
    },
    // id, name, venue, optional_details, organization_id, starts_at, ends_at, expires_at
    StatementDef {
        name: INSERT_EVENT,
        sql: r"
            INSERT INTO events (
                id, name, venue, optional_details, organization_id,
                starts_at, ends_at, expires_at
            ) VALUES (
                $1::uuid, $2, $3, $4, $5::uuid,
                $6::timestamp AT TIME ZONE 'UTC',
                $7::timestamp AT TIME ZONE 'UTC',
                $8::timestamp AT TIME ZONE 'UTC'
            )
        ",
        arity: 8,
    },
    // id, organization_id -> name, venue, optional_details, starts_at, ends_at, expires_at
    StatementDef {
        name: SELECT_OWNED_EVENT,
        sql: r"
            SELECT name, venue, optional_details,
                   starts_at::text, ends_at::text, expires_at::text
            FROM events
            WHERE id = $1::uuid AND organization_id = $2::uuid
        ",
        arity: 2,
    },
    // id, event_id, holder_name, expires_at
    StatementDef {
        name: INSERT_TICKET,
        sql: r"
            INSERT INTO tickets (id, event_id, holder_name, status, expires_at)
            VALUES ($1::uuid, $2::uuid, $3, 'active', $4::timestamp AT TIME ZONE 'UTC')
        ",
        arity: 4,
    },
    // Single conditional update: only an active, unexpired ticket of an
    // existing event flips to redeemed, so concurrent scans cannot both win.
    // ticket_id, event_id, now -> holder_name
    StatementDef {
        name: REDEEM_TICKET,
        sql: r"
            UPDATE tickets t
            SET status = 'redeemed'
            WHERE t.id = $1::uuid
              AND t.event_id = $2::uuid
              AND t.status = 'active'
              AND t.expires_at >= $3::timestamp AT TIME ZONE 'UTC'
              AND EXISTS (SELECT 1 FROM events e WHERE e.id = t.event_id)
            RETURNING t.holder_name
        ",
        arity: 3,
    },
    // ticket_id, event_id -> status, expires_at
    StatementDef {
        name: SELECT_TICKET_STATE,
        sql: r"
            SELECT t.status, t.expires_at::text
            FROM tickets t
            JOIN events e ON e.id = t.event_id
            WHERE t.id = $1::uuid AND t.event_id = $2::uuid
        ",
        arity: 2,
    },
];

/// Prepares the whole catalog on `store`.
pub async fn register_all(store: &mut dyn Store) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        store
            .prepare(statement.name, statement.sql, statement.arity)
            .await?;
    }
    tracing::info!(count = STATEMENTS.len(), "Prepared statement catalog");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<&str> = STATEMENTS.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), STATEMENTS.len());
    }

    #[test]
    fn test_arity_matches_highest_placeholder() {
        for statement in STATEMENTS {
            let highest = (1..=9)
                .filter(|n| statement.sql.contains(&format!("${n}")))
                .max()
                .unwrap_or(0);
            assert_eq!(highest, statement.arity, "{}", statement.name);
        }
    }

    #[test]
    fn test_redeem_is_a_single_conditional_update() {
        let redeem = STATEMENTS.iter().find(|s| s.name == REDEEM_TICKET).unwrap();
        assert!(redeem.sql.contains("UPDATE tickets"));
        assert!(redeem.sql.contains("t.status = 'active'"));
        assert!(redeem.sql.contains("RETURNING"));
    }
}
