//! Occasion, channel and delivery status vocabularies.
//!
//! These are stored as plain strings in the database; the enums give the
//! pipeline a closed set to match on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Recurring customer occasion a reminder can be sent for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OccasionType {
    Birthday,
    Anniversary,
}

impl OccasionType {
    /// All occasion types, in the order a cycle processes them.
    pub const ALL: [OccasionType; 2] = [OccasionType::Birthday, OccasionType::Anniversary];

    pub fn as_str(&self) -> &'static str {
        match self {
            OccasionType::Birthday => "birthday",
            OccasionType::Anniversary => "anniversary",
        }
    }
}

impl fmt::Display for OccasionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OccasionType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "birthday" => Ok(OccasionType::Birthday),
            "anniversary" => Ok(OccasionType::Anniversary),
            other => Err(UnknownVariant {
                kind: "occasion type",
                value: other.to_string(),
            }),
        }
    }
}

/// Outbound delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    WhatsApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::WhatsApp => "whatsapp",
        }
    }

    /// Address prefix the messaging provider expects for this channel.
    pub fn address_prefix(&self) -> &'static str {
        match self {
            Channel::Sms => "",
            Channel::WhatsApp => "whatsapp:",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::WhatsApp),
            other => Err(UnknownVariant {
                kind: "channel",
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome recorded in the reminder ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
