//! Ledger events
//!
//! Semantic events emitted by successful operations, kept in an
//! append-only, ordered log. Transporting them elsewhere (the WebSocket
//! broadcaster, for instance) is up to the host.

use crate::core::{Address, Amount};
use crate::token::access::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transfer event (mint uses a null `from`, burn a null `to`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    #[serde(with = "amount_string")]
    pub value: Amount,
}

/// Approval event (emitted whenever an allowance is set)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    #[serde(with = "amount_string")]
    pub value: Amount,
}

/// Any event the token can emit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    Transfer(TransferEvent),
    Approval(ApprovalEvent),
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    OwnershipTransferred {
        previous_owner: Option<Address>,
        new_owner: Option<Address>,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },
}

impl From<TransferEvent> for LedgerEvent {
    fn from(event: TransferEvent) -> Self {
        LedgerEvent::Transfer(event)
    }
}

impl From<ApprovalEvent> for LedgerEvent {
    fn from(event: ApprovalEvent) -> Self {
        LedgerEvent::Approval(event)
    }
}

/// A logged event with its position and time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: LedgerEvent,
}

/// Append-only event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn append(&mut self, event: impl Into<LedgerEvent>) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            timestamp: Utc::now(),
            event: event.into(),
        });
        sequence
    }

    /// Number of logged events
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no event was logged yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in emission order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// The last `count` records in emission order
    pub fn recent(&self, count: usize) -> &[EventRecord] {
        let start = self.records.len().saturating_sub(count);
        &self.records[start..]
    }

    /// Records emitted after the given sequence number
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = (sequence as usize).saturating_add(1).min(self.records.len());
        &self.records[start..]
    }
}

/// Amounts as decimal strings so JSON clients never round them
pub(crate) mod amount_string {
    use crate::core::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
