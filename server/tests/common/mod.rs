#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use qtick_server::auth::StoreCredentialVerifier;
use qtick_server::clock::FixedClock;
use qtick_server::lifecycle::LifecycleEngine;
use qtick_server::models::account::Credentials;
use qtick_server::models::event::NewEvent;
use qtick_server::store::{catalog, MemoryStore, Store};

pub const ORG_USER: &str = "acme";
pub const ORG_PASS: &str = "hunter2";
pub const STAFF_USER: &str = "gate1";
pub const STAFF_PASS: &str = "letmein";

pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// Well before every event the tests schedule.
pub fn early() -> DateTime<Utc> {
    at(2030, 1, 1, 0, 0, 0)
}

pub fn org() -> Credentials {
    Credentials::new(ORG_USER, ORG_PASS)
}

pub fn staff() -> Credentials {
    Credentials::new(STAFF_USER, STAFF_PASS)
}

pub fn new_event(name: &str) -> NewEvent {
    NewEvent {
        name: name.to_string(),
        venue: "Hall A".to_string(),
        starts_at: "2030-06-01 10:00:00".to_string(),
        ends_at: "2030-06-01 18:00:00".to_string(),
        expires_at: "2030-06-02 00:00:00".to_string(),
        optional_details: Some("Doors open at 9".to_string()),
    }
}

/// One store with an organization and a staff account, plus an artifact
/// directory that is removed with the fixture.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub dir: TempDir,
    pub org_id: String,
}

impl Fixture {
    pub async fn new() -> Self {
        let mut store = MemoryStore::new();
        catalog::register_all(&mut store).await.unwrap();
        let org_id = store.add_organization(ORG_USER, ORG_PASS).await;
        store.add_staff(STAFF_USER, STAFF_PASS).await;

        Self {
            store: Arc::new(store),
            dir: TempDir::new().unwrap(),
            org_id,
        }
    }

    /// An engine over the shared store whose clock is pinned at `now`.
    pub fn engine_at(&self, now: DateTime<Utc>) -> LifecycleEngine {
        self.engine_with_dir(now, self.dir.path())
    }

    pub fn engine_with_dir(&self, now: DateTime<Utc>, dir: &std::path::Path) -> LifecycleEngine {
        let store: Arc<dyn Store> = self.store.clone();
        LifecycleEngine::new(
            Arc::clone(&store),
            Arc::new(StoreCredentialVerifier::new(store)),
            Arc::new(FixedClock::new(now)),
            dir,
        )
    }

    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }
}
