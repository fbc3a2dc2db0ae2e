//! Delivery channel selection.
//!
//! A `+`-prefixed international number goes out over WhatsApp; anything else
//! is sent as plain SMS with the stored address unchanged.

use crate::models::Channel;
use crate::models::tenant::NotificationPreferences;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSelection {
    pub channel: Channel,
    /// Destination in the form the gateway expects for `channel`
    pub address: String,
}

/// Why no channel could be used for a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRejection {
    /// Address is blank
    NoAddress,
    /// Tenant disabled every channel usable for this address
    ChannelDisabled,
}

fn is_international(phone: &str) -> bool {
    phone.starts_with('+')
}

fn address_for(channel: Channel, phone: &str) -> String {
    format!("{}{}", channel.address_prefix(), phone)
}

/// Pure address-based selection.
pub fn select_channel(phone: &str) -> ChannelSelection {
    let channel = if is_international(phone) {
        Channel::WhatsApp
    } else {
        Channel::Sms
    };

    ChannelSelection {
        channel,
        address: address_for(channel, phone),
    }
}

/// Selection honoring the tenant's channel switches. When the natural channel
/// is disabled the other one is used if enabled and addressable.
pub fn select_channel_with_preferences(
    phone: &str,
    preferences: &NotificationPreferences,
) -> Result<ChannelSelection, ChannelRejection> {
    if phone.trim().is_empty() {
        return Err(ChannelRejection::NoAddress);
    }

    let natural = select_channel(phone);
    if preferences.channel_enabled(natural.channel) {
        return Ok(natural);
    }

    let fallback = match natural.channel {
        Channel::WhatsApp => Channel::Sms,
        // WhatsApp needs an international number
        Channel::Sms => return Err(ChannelRejection::ChannelDisabled),
    };

    if preferences.channel_enabled(fallback) {
        Ok(ChannelSelection {
            channel: fallback,
            address: address_for(fallback, phone),
        })
    } else {
        Err(ChannelRejection::ChannelDisabled)
    }
}
