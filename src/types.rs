use serde::Serialize;
use std::collections::BTreeMap;

/// Field aliases checked, in order, for a record's last-activity timestamp.
pub const LAST_ACTIVITY_KEYS: &[&str] = &["LastActivity", "LastActive", "LastSeen", "Time", "Timestamp"];

/// Field aliases checked, in order, for a record's connection identifier.
pub const CONNECTION_ID_KEYS: &[&str] = &["ConnectionID", "Id", "ID"];

/// A service entry found in the device description tree.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service_type: String,
    pub control_url: String,
}

/// One connection entry extracted from a listing response.
///
/// There is no fixed schema; which fields are present depends on the firmware.
/// Values are kept as trimmed strings and looked up through alias lists.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionRecord {
    pub fields: BTreeMap<String, String>,
}

impl ConnectionRecord {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// First non-empty value among the given keys, in order.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    pub fn last_activity(&self) -> Option<&str> {
        self.get_any(LAST_ACTIVITY_KEYS)
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.get_any(CONNECTION_ID_KEYS)
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.get_any(&["RemoteHost", "Description"])
    }

    pub fn remote_port(&self) -> Option<&str> {
        self.get_any(&["RemotePort", "Port"])
    }
}

/// A record selected for termination, with its parsed timestamp and age.
#[derive(Debug, Serialize, Clone)]
pub struct KillCandidate {
    pub record: ConnectionRecord,
    pub last_seen: i64,
    pub age_secs: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct SweepSummary {
    pub service_type: String,
    pub records: usize,
    pub candidates: usize,
    pub terminated: usize,
    pub failed: usize,
    pub dry_run: bool,
}
