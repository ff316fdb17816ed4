use std::sync::Arc;

use crate::lifecycle::LifecycleEngine;

pub mod events;
pub mod health;
pub mod scan;
pub mod tickets;

pub use events::create_event;
pub use health::health_check;
pub use scan::scan_ticket;
pub use tickets::issue_ticket;

/// Shared state for every handler.
pub type AppState = Arc<LifecycleEngine>;
