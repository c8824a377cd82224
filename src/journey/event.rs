//! Journey event model
//!
//! The wire shape accepted by the collectors: camelCase keys, snake_case event types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Viewport width below which a visitor is on a phone
pub const MOBILE_BREAKPOINT: u32 = 768;
/// Viewport width below which a visitor is on a tablet
pub const TABLET_BREAKPOINT: u32 = 1024;

/// Catalog of trackable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    ButtonClick,
    FormSubmit,
    ProductView,
    AddToCart,
    RemoveFromCart,
    CartCleared,
    CartAbandoned,
    CheckoutStart,
    CheckoutComplete,
    Search,
    Filter,
    Signup,
    Login,
    Logout,
    Click,
    Custom,
}

impl EventType {
    pub const ALL: [EventType; 17] = [
        Self::PageView,
        Self::ButtonClick,
        Self::FormSubmit,
        Self::ProductView,
        Self::AddToCart,
        Self::RemoveFromCart,
        Self::CartCleared,
        Self::CartAbandoned,
        Self::CheckoutStart,
        Self::CheckoutComplete,
        Self::Search,
        Self::Filter,
        Self::Signup,
        Self::Login,
        Self::Logout,
        Self::Click,
        Self::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::ButtonClick => "button_click",
            Self::FormSubmit => "form_submit",
            Self::ProductView => "product_view",
            Self::AddToCart => "add_to_cart",
            Self::RemoveFromCart => "remove_from_cart",
            Self::CartCleared => "cart_cleared",
            Self::CartAbandoned => "cart_abandoned",
            Self::CheckoutStart => "checkout_start",
            Self::CheckoutComplete => "checkout_complete",
            Self::Search => "search",
            Self::Filter => "filter",
            Self::Signup => "signup",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Click => "click",
            Self::Custom => "custom",
        }
    }

    /// Parse a catalog name, tolerating case and `-` separators
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.iter().copied().find(|t| t.as_str() == normalized)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device class derived from viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn from_width(width: u32) -> Self {
        if width < MOBILE_BREAKPOINT {
            Self::Mobile
        } else if width < TABLET_BREAKPOINT {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

/// A single user-action record sent to the collectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyEvent {
    pub event_type: EventType,
    pub event_name: String,
    /// Absent for anonymous visitors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_id: String,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub device_type: DeviceType,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Coerce caller metadata into an object so `metadata.<key>` lookups always work downstream
pub fn normalize_metadata(metadata: Option<serde_json::Value>) -> serde_json::Value {
    match metadata {
        None | Some(serde_json::Value::Null) => empty_metadata(),
        Some(obj @ serde_json::Value::Object(_)) => obj,
        Some(other) => serde_json::json!({ "value": other }),
    }
}

/// Context snapshot taken at creation time
#[derive(Debug, Clone)]
pub struct EventContext {
    pub user_id: Option<String>,
    pub session_id: String,
    pub page: String,
    pub referrer: Option<String>,
    pub viewport_width: u32,
}

impl JourneyEvent {
    pub fn new(
        event_type: EventType,
        event_name: &str,
        metadata: Option<serde_json::Value>,
        context: EventContext,
    ) -> Self {
        Self {
            event_type,
            event_name: event_name.to_string(),
            user_id: context.user_id,
            session_id: context.session_id,
            metadata: normalize_metadata(metadata),
            timestamp: Utc::now().to_rfc3339(),
            page: context.page,
            referrer: context.referrer,
            device_type: DeviceType::from_width(context.viewport_width),
        }
    }

    /// One-line summary for terminal output
    pub fn format_display(&self) -> String {
        use colored::*;

        let local = chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| self.timestamp.clone());

        let kind = match self.event_type {
            EventType::PageView => self.event_type.as_str().green(),
            EventType::AddToCart | EventType::RemoveFromCart | EventType::CartCleared => {
                self.event_type.as_str().cyan()
            }
            EventType::CartAbandoned => self.event_type.as_str().red(),
            EventType::CheckoutStart | EventType::CheckoutComplete => self.event_type.as_str().blue(),
            EventType::Click => self.event_type.as_str().yellow(),
            _ => self.event_type.as_str().normal(),
        };

        let mut parts = vec![local.dimmed().to_string(), kind.to_string()];
        let short_session: String = self.session_id.chars().take(16).collect();
        parts.push(format!("[{}]", short_session).dimmed().to_string());
        if let Some(ref user) = self.user_id {
            parts.push(format!("user={}", user));
        }
        parts.push(self.event_name.bold().to_string());
        parts.push(format!("{} ({})", self.page, self.device_type.as_str()).dimmed().to_string());

        parts.join(" ")
    }
}
