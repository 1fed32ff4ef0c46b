//! account types: billing/policy groupings over embedded clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::InboundId;

/// unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// convert to i64 for database storage.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a billing/policy grouping of clients with a shared quota and expiry.
///
/// accounts are a cross-cutting index: their clients live embedded in
/// inbound settings, possibly across several nodes. quota and expiry
/// enforcement disables those embedded clients, not the account row,
/// so an administrator can re-enable selectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// unique identifier.
    pub id: AccountId,

    /// human-readable name.
    pub name: String,

    /// traffic quota in bytes (upload + download); 0 means unlimited.
    pub quota: i64,

    /// expiry timestamp; `None` means the account never expires.
    pub expiry: Option<DateTime<Utc>>,

    /// disabled accounts are skipped by the policy loop entirely.
    pub enable: bool,

    /// when the account was created.
    pub created_at: DateTime<Utc>,

    /// when the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// create a new enabled account with the given name and quota.
    pub fn new(name: String, quota: i64) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId(0),
            name,
            quota,
            expiry: None,
            enable: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// whether the account's expiry timestamp has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|e| e <= now)
    }

    /// whether `used` bytes of traffic meet or exceed a non-zero quota.
    pub fn quota_exhausted(&self, used: i64) -> bool {
        self.quota > 0 && used >= self.quota
    }
}

/// association between an account and a client embedded in an inbound.
///
/// this is the index the policy loop walks to locate the embedded
/// client records it needs to rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountClient {
    /// the owning account.
    pub account_id: AccountId,

    /// the inbound whose settings embed the client.
    pub inbound_id: InboundId,

    /// the client's email within that inbound.
    pub email: String,
}

/// per-client traffic counters, written by node telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTraffic {
    /// the inbound the client belongs to.
    pub inbound_id: InboundId,

    /// the client's email.
    pub email: String,

    /// upload bytes.
    pub up: i64,

    /// download bytes.
    pub down: i64,

    /// mirrors the embedded client's enable flag; disabled clients stop
    /// accumulating traffic.
    pub enable: bool,
}

impl ClientTraffic {
    /// total bytes in both directions.
    pub fn total(&self) -> i64 {
        self.up + self.down
    }
}
