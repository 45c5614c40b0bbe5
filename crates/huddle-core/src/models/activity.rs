//! Live activity markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-account change marker that frontends watch to know when to
/// refresh a view. Touching it bumps `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveActivity {
    pub id: Uuid,
    pub account_id: Uuid,
    pub tenant_id: Uuid,
    pub topic: String,
    pub updated_at: DateTime<Utc>,
}

/// Topic touched whenever the set of private rooms visible to an
/// account changes.
pub const PRIVATE_ROOMS_TOPIC: &str = "privateBreakoutRooms";
