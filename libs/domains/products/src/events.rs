//! Product lifecycle events.
//!
//! Publishing is fire-and-forget: a failed publish is logged and never
//! reaches the caller.

use async_nats::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::{Product, ProductImage};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { id: i64, name: String, category_id: i64 },
    Updated { id: i64, name: String, category_id: i64 },
    Deleted { id: i64 },
    ImageAdded { product_id: i64, image_id: i64, image_url: String },
}

impl ProductEvent {
    pub fn created(product: &Product) -> Self {
        ProductEvent::Created {
            id: product.id,
            name: product.name.clone(),
            category_id: product.category_id,
        }
    }

    pub fn updated(product: &Product) -> Self {
        ProductEvent::Updated {
            id: product.id,
            name: product.name.clone(),
            category_id: product.category_id,
        }
    }

    pub fn image_added(image: &ProductImage) -> Self {
        ProductEvent::ImageAdded {
            product_id: image.product_id,
            image_id: image.id,
            image_url: image.image_url.clone(),
        }
    }

    /// NATS subject the event is published on
    pub fn subject(&self) -> &'static str {
        match self {
            ProductEvent::Created { .. } => "products.created",
            ProductEvent::Updated { .. } => "products.updated",
            ProductEvent::Deleted { .. } => "products.deleted",
            ProductEvent::ImageAdded { .. } => "products.image_added",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    /// Hand the event off without waiting for delivery
    fn publish(&self, event: ProductEvent);
}

/// Writes events to the trace log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventPublisher;

impl EventPublisher for LogEventPublisher {
    fn publish(&self, event: ProductEvent) {
        info!(subject = event.subject(), ?event, "Product event");
    }
}

/// NATS event publisher
#[derive(Clone)]
pub struct NatsEventPublisher {
    client: Client,
}

impl NatsEventPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        info!(url = %url, "Connected to NATS");
        Ok(Self::new(client))
    }
}

impl EventPublisher for NatsEventPublisher {
    fn publish(&self, event: ProductEvent) {
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize event");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(subject, "No async runtime, dropping event");
            return;
        };

        let client = self.client.clone();
        runtime.spawn(async move {
            if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
                error!(error = %e, subject, "Failed to publish event");
            } else {
                info!(subject, "Event published");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects() {
        assert_eq!(ProductEvent::Deleted { id: 1 }.subject(), "products.deleted");
        let event = ProductEvent::ImageAdded {
            product_id: 1,
            image_id: 2,
            image_url: "a.png".to_string(),
        };
        assert_eq!(event.subject(), "products.image_added");
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(ProductEvent::Deleted { id: 50 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "deleted", "id": 50 }));
    }
}
