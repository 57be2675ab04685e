// Push notification payloads as delivered by the messaging transport.
//
// Only classification and field resolution live here; delivery itself is
// the transport's business.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Types that mean "a new order is waiting for a vendor"
const NEW_ORDER_TYPES: &[&str] = &["new_order_available", "order_placed", "new_order"];

/// Types that mean an order moved on and no longer needs attention
const STATUS_CHANGE_TYPES: &[&str] = &[
    "order_accepted",
    "order_processing",
    "order_shipped",
    "order_delivered",
    "order_cancelled",
];

/// Title fragments that identify a new-order push sent without a usable type
const NEW_ORDER_TITLE_HINTS: &[&str] = &["new order", "order available"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushKind {
    NewOrder,
    OrderStatusChanged,
    Other,
}

/// The display part of a push, when the sender attached one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Data payload (`type`, `orderId`, `title`, `body`, `message`)
    #[serde(default)]
    pub data: HashMap<String, String>,
    #[serde(default)]
    pub notification: Option<PushNotification>,
}

impl PushEvent {
    /// Data-only push, the shape the order backend sends.
    pub fn with_data<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            notification: None,
        }
    }

    pub fn new_order(order_id: &str, title: &str, body: &str) -> Self {
        Self::with_data([
            ("type", "new_order_available"),
            ("orderId", order_id),
            ("title", title),
            ("body", body),
        ])
    }

    fn data_field(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn event_type(&self) -> Option<&str> {
        self.data_field("type")
    }

    pub fn order_id(&self) -> Option<&str> {
        self.data_field("orderId")
    }

    /// Data title wins over the notification title.
    pub fn title(&self) -> Option<&str> {
        self.data_field("title").or_else(|| {
            self.notification
                .as_ref()
                .and_then(|n| n.title.as_deref())
                .filter(|v| !v.trim().is_empty())
        })
    }

    /// Data `body`, then data `message`, then the notification body.
    pub fn body(&self) -> Option<&str> {
        self.data_field("body")
            .or_else(|| self.data_field("message"))
            .or_else(|| {
                self.notification
                    .as_ref()
                    .and_then(|n| n.body.as_deref())
                    .filter(|v| !v.trim().is_empty())
            })
    }

    pub fn kind(&self) -> PushKind {
        if let Some(event_type) = self.event_type() {
            let event_type = event_type.to_lowercase();
            if NEW_ORDER_TYPES.contains(&event_type.as_str()) {
                return PushKind::NewOrder;
            }
            if STATUS_CHANGE_TYPES.contains(&event_type.as_str()) {
                return PushKind::OrderStatusChanged;
            }
        }

        // Title as fallback
        if let Some(title) = self.title() {
            let title = title.to_lowercase();
            if NEW_ORDER_TITLE_HINTS.iter().any(|hint| title.contains(hint)) {
                return PushKind::NewOrder;
            }
        }
        PushKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_types() {
        for t in ["new_order_available", "ORDER_PLACED", "new_order"] {
            let event = PushEvent::with_data([("type", t), ("orderId", "ORD-1")]);
            assert_eq!(event.kind(), PushKind::NewOrder, "type {}", t);
        }
    }

    #[test]
    fn test_status_change_types() {
        let event = PushEvent::with_data([("type", "order_accepted"), ("orderId", "ORD-1")]);
        assert_eq!(event.kind(), PushKind::OrderStatusChanged);
        let event = PushEvent::with_data([("type", "order_cancelled")]);
        assert_eq!(event.kind(), PushKind::OrderStatusChanged);
    }

    #[test]
    fn test_title_fallback() {
        let event = PushEvent {
            data: HashMap::new(),
            notification: Some(PushNotification {
                title: Some("New Order Available nearby".to_string()),
                body: None,
            }),
        };
        assert_eq!(event.kind(), PushKind::NewOrder);

        let event = PushEvent::with_data([("type", "general"), ("title", "Payment received")]);
        assert_eq!(event.kind(), PushKind::Other);
    }

    #[test]
    fn test_field_priority() {
        let mut event = PushEvent::with_data([("message", "from message")]);
        event.notification = Some(PushNotification {
            title: Some("Notification title".to_string()),
            body: Some("Notification body".to_string()),
        });
        assert_eq!(event.title(), Some("Notification title"));
        assert_eq!(event.body(), Some("from message"));

        event.data.insert("title".to_string(), "Data title".to_string());
        event.data.insert("body".to_string(), "Data body".to_string());
        assert_eq!(event.title(), Some("Data title"));
        assert_eq!(event.body(), Some("Data body"));
    }

    #[test]
    fn test_blank_order_id_is_absent() {
        let event = PushEvent::with_data([("type", "new_order"), ("orderId", " ")]);
        assert_eq!(event.order_id(), None);
    }

    #[test]
    fn test_deserialize_transport_payload() {
        let json = r#"{
            "data": {
                "type": "new_order_available",
                "orderId": "665f",
                "title": "New Order!",
                "body": "Order #1042"
            },
            "notification": {"title": "New Order!", "body": "Order #1042"}
        }"#;
        let event: PushEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), PushKind::NewOrder);
        assert_eq!(event.order_id(), Some("665f"));

        let bare: PushEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.kind(), PushKind::Other);
    }
}
