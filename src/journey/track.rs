//! Named tracking calls for storefront actions
//!
//! Each one presets the event type and name and serializes a typed metadata shape.

use serde::{Deserialize, Serialize};

use super::emitter::{Dispatch, Emitter};
use super::event::EventType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub product_id: String,
    pub product_name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub product_name: String,
    pub price: f64,
    pub quantity: u32,
}

/// Cart contents at the moment the visitor walked away
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub cart_items: Vec<CartItem>,
    pub cart_total: f64,
    pub item_count: u32,
}

impl CartSnapshot {
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let cart_total = items.iter().map(|i| i.price * f64::from(i.quantity)).sum();
        let item_count = items.iter().map(|i| i.quantity).sum();
        Self {
            cart_items: items,
            cart_total,
            item_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub total: f64,
    pub item_count: u32,
}

impl Emitter {
    fn emit_typed<M: Serialize>(&self, event_type: EventType, event_name: &str, metadata: &M) -> Dispatch {
        match serde_json::to_value(metadata) {
            Ok(value) => self.emit(event_type, event_name, Some(value)),
            Err(e) => {
                log::error!("Failed to serialize {} metadata: {}", event_type, e);
                Dispatch::default()
            }
        }
    }

    pub fn track_page_view(&self, page_name: &str) -> Dispatch {
        self.emit(
            EventType::PageView,
            &format!("Page View: {}", page_name),
            Some(serde_json::json!({ "pageName": page_name })),
        )
    }

    pub fn track_button_click(&self, button_name: &str, location: &str) -> Dispatch {
        self.emit(
            EventType::ButtonClick,
            &format!("Button Click: {}", button_name),
            Some(serde_json::json!({ "buttonName": button_name, "location": location })),
        )
    }

    pub fn track_form_submit(&self, form_name: &str, success: bool) -> Dispatch {
        self.emit(
            EventType::FormSubmit,
            &format!("Form Submit: {}", form_name),
            Some(serde_json::json!({ "formName": form_name, "success": success })),
        )
    }

    pub fn track_product_view(&self, product: &ProductView) -> Dispatch {
        self.emit_typed(
            EventType::ProductView,
            &format!("Product View: {}", product.product_name),
            product,
        )
    }

    pub fn track_add_to_cart(&self, item: &CartItem) -> Dispatch {
        self.emit_typed(EventType::AddToCart, "Added to Cart", item)
    }

    pub fn track_remove_from_cart(&self, item: &CartItem) -> Dispatch {
        self.emit_typed(EventType::RemoveFromCart, "Removed from Cart", item)
    }

    pub fn track_cart_cleared(&self, item_count: u32, cart_total: f64) -> Dispatch {
        self.emit(
            EventType::CartCleared,
            "Cart Cleared",
            Some(serde_json::json!({ "itemCount": item_count, "cartTotal": cart_total })),
        )
    }

    pub fn track_cart_abandoned(&self, snapshot: &CartSnapshot) -> Dispatch {
        self.emit_typed(EventType::CartAbandoned, "Cart Abandoned", snapshot)
    }

    pub fn track_checkout_start(&self, cart_total: f64, item_count: u32) -> Dispatch {
        self.emit(
            EventType::CheckoutStart,
            "Checkout Started",
            Some(serde_json::json!({ "cartTotal": cart_total, "itemCount": item_count })),
        )
    }

    pub fn track_checkout_complete(&self, order: &OrderSummary) -> Dispatch {
        self.emit_typed(EventType::CheckoutComplete, "Checkout Completed", order)
    }

    pub fn track_search(&self, query: &str, result_count: usize) -> Dispatch {
        self.emit(
            EventType::Search,
            &format!("Search: {}", query),
            Some(serde_json::json!({ "query": query, "resultsCount": result_count })),
        )
    }

    pub fn track_filter(&self, filter_type: &str, filter_value: &str) -> Dispatch {
        self.emit(
            EventType::Filter,
            &format!("Filter: {}", filter_type),
            Some(serde_json::json!({ "filterType": filter_type, "filterValue": filter_value })),
        )
    }

    pub fn track_signup(&self, method: &str) -> Dispatch {
        self.emit(EventType::Signup, "User Signup", Some(serde_json::json!({ "method": method })))
    }

    pub fn track_login(&self, method: &str) -> Dispatch {
        self.emit(EventType::Login, "User Login", Some(serde_json::json!({ "method": method })))
    }

    pub fn track_logout(&self) -> Dispatch {
        self.emit(EventType::Logout, "User Logout", None)
    }

    pub fn track_custom(&self, event_name: &str, metadata: Option<serde_json::Value>) -> Dispatch {
        self.emit(EventType::Custom, event_name, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::context::SharedPage;
    use crate::journey::emitter::tests::{RecordingSink, emitter_with};

    fn chair(quantity: u32) -> CartItem {
        CartItem {
            product_id: "p1".to_string(),
            product_name: "Chair".to_string(),
            price: 100.0,
            quantity,
        }
    }

    #[test]
    fn test_add_to_cart_metadata() {
        let sink = RecordingSink::new("current");
        let emitter = emitter_with(vec![sink.clone()], SharedPage::default());

        emitter.track_add_to_cart(&chair(2)).wait();

        let event = &sink.recorded()[0];
        assert_eq!(event.event_type, EventType::AddToCart);
        assert_eq!(event.event_name, "Added to Cart");
        assert_eq!(event.metadata["productId"], "p1");
        assert_eq!(event.metadata["productName"], "Chair");
        assert_eq!(event.metadata["price"], 100.0);
        assert_eq!(event.metadata["quantity"], 2);
    }

    #[test]
    fn test_cart_snapshot_totals() {
        let mut table = chair(1);
        table.product_id = "p2".to_string();
        table.price = 250.5;

        let snapshot = CartSnapshot::from_items(vec![chair(2), table]);
        assert_eq!(snapshot.item_count, 3);
        assert!((snapshot.cart_total - 450.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cart_abandoned_carries_line_items() {
        let sink = RecordingSink::new("current");
        let emitter = emitter_with(vec![sink.clone()], SharedPage::default());

        emitter.track_cart_abandoned(&CartSnapshot::from_items(vec![chair(3)])).wait();

        let event = &sink.recorded()[0];
        assert_eq!(event.event_type, EventType::CartAbandoned);
        assert_eq!(event.metadata["cartItems"][0]["productId"], "p1");
        assert_eq!(event.metadata["itemCount"], 3);
    }

    #[test]
    fn test_named_wrappers_preset_type_and_name() {
        let sink = RecordingSink::new("current");
        let emitter = emitter_with(vec![sink.clone()], SharedPage::default());

        emitter.track_page_view("Home").wait();
        emitter.track_search("oak table", 4).wait();
        emitter
            .track_checkout_complete(&OrderSummary {
                order_id: "o-1".to_string(),
                total: 900.0,
                item_count: 3,
            })
            .wait();
        emitter.track_logout().wait();

        let events = sink.recorded();
        assert_eq!(events[0].event_type, EventType::PageView);
        assert_eq!(events[0].event_name, "Page View: Home");
        assert_eq!(events[1].metadata["resultsCount"], 4);
        assert_eq!(events[2].metadata["orderId"], "o-1");
        assert_eq!(events[3].event_type, EventType::Logout);
        assert_eq!(events[3].metadata, serde_json::json!({}));
    }
}
