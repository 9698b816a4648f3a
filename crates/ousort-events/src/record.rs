//! Account-created audit record model.
//!
//! # Design
//! - Only the fields needed to identify the object are modelled; everything
//!   else in the rendered record is ignored.
//! - The machine account name (`NAME$`) is preferred; the first DNS label is
//!   the fallback.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EventRecordError, EventRecordResult};

/// Audit event id for "a computer account was created".
pub const ACCOUNT_CREATED_EVENT_ID: u32 = 4741;

/// JSON rendering of one account-created audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountCreatedRecord {
    /// Audit event id.
    #[serde(rename = "EventID")]
    pub event_id: u32,
    /// When the event was logged.
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
    /// Event-specific payload.
    pub event_data: EventData,
}

/// Event-specific payload of an account-created record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventData {
    /// Account name of the new object (`NAME$`).
    pub target_user_name: Option<String>,
    /// SAM account name of the new object (`NAME$`).
    pub sam_account_name: Option<String>,
    /// DNS host name registered for the new object.
    pub dns_host_name: Option<String>,
    /// Domain the object was created in.
    pub target_domain_name: Option<String>,
}

/// What the engine needs to process one newly created object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObjectNotice {
    /// Object naming identifier.
    pub name: String,
    /// Domain reported by the record.
    pub domain: Option<String>,
    /// When the record was logged.
    pub observed_at: Option<DateTime<Utc>>,
}

impl AccountCreatedRecord {
    /// Derive the object name from the record.
    ///
    /// # Errors
    ///
    /// Returns [`EventRecordError::MissingField`] when neither the account
    /// names nor the DNS host name yield a non-empty value.
    pub fn object_name(&self) -> EventRecordResult<String> {
        let data = &self.event_data;
        let account = [&data.target_user_name, &data.sam_account_name]
            .into_iter()
            .flatten()
            .map(|value| value.trim().trim_end_matches('$').trim())
            .find(|value| !value.is_empty() && *value != "-");
        if let Some(name) = account {
            return Ok(name.to_string());
        }
        data.dns_host_name
            .as_deref()
            .and_then(|host| host.trim().split('.').next())
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .ok_or(EventRecordError::MissingField {
                field: "TargetUserName",
            })
    }

    /// Convert into the notice handed to the engine.
    ///
    /// # Errors
    ///
    /// Propagates [`AccountCreatedRecord::object_name`] failures.
    pub fn into_notice(self) -> EventRecordResult<NewObjectNotice> {
        let name = self.object_name()?;
        Ok(NewObjectNotice {
            name,
            domain: self
                .event_data
                .target_domain_name
                .filter(|domain| !domain.trim().is_empty()),
            observed_at: self.time_created,
        })
    }
}

/// Parse a JSON record and check it is an account-created event.
///
/// # Errors
///
/// Returns [`EventRecordError::Malformed`] for invalid JSON and
/// [`EventRecordError::UnsupportedEvent`] for other event ids.
pub fn parse_record(raw: &str) -> EventRecordResult<AccountCreatedRecord> {
    let record: AccountCreatedRecord =
        serde_json::from_str(raw).map_err(|source| EventRecordError::Malformed { source })?;
    if record.event_id != ACCOUNT_CREATED_EVENT_ID {
        return Err(EventRecordError::UnsupportedEvent {
            event_id: record.event_id,
        });
    }
    Ok(record)
}

/// Read and parse a record from a file, or from stdin when `source` is `-`.
///
/// # Errors
///
/// Returns [`EventRecordError::Io`] when the source cannot be read, plus any
/// [`parse_record`] failure.
pub fn read_record(source: &Path) -> EventRecordResult<AccountCreatedRecord> {
    let origin = source.display().to_string();
    let raw = if source.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|source| EventRecordError::Io {
                origin: origin.clone(),
                source,
            })?;
        buffer
    } else {
        fs::read_to_string(source).map_err(|source| EventRecordError::Io {
            origin: origin.clone(),
            source,
        })?
    };
    parse_record(&raw)
}
