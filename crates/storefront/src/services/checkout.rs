//! Cash-on-delivery checkout.
//!
//! Validates the shopper's details, places the order in one database
//! transaction (see [`OrderRepository::create_cod_order`]), then, best
//! effort, drops cached stock levels and notifies the admin dashboard.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use zolar_core::checkout::RequestedLine;
use zolar_core::{CustomerTier, Email, OrderStatus, Phone, Price};
use zolar_db::OrderRepository;
use zolar_db::orders::{NewCodOrder, OrderItem, PlacedOrder};

use crate::error::{AppError, Result};
use crate::services::realtime::NEW_ORDER_EVENT;
use crate::state::AppState;

/// Maximum length of free-text fields.
const MAX_FIELD_LENGTH: usize = 500;

/// Checkout form as posted by the UI.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<RequestedLine>,
}

impl CheckoutRequest {
    /// Validate and normalize into an order request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first invalid field.
    pub fn validate(self, shipping_fee: Price) -> Result<NewCodOrder> {
        let name = required("name", &self.name)?;
        let address = required("address", &self.address)?;
        let city = required("city", &self.city)?;
        let email = Email::parse(&self.email)
            .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;
        let phone = Phone::parse(&self.phone)
            .map_err(|e| AppError::BadRequest(format!("Invalid phone: {e}")))?;
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes.as_ref().is_some_and(|n| n.len() > MAX_FIELD_LENGTH) {
            return Err(AppError::BadRequest(format!(
                "notes must be at most {MAX_FIELD_LENGTH} characters"
            )));
        }
        if self.items.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".to_string()));
        }

        Ok(NewCodOrder {
            email,
            name,
            phone,
            address,
            city,
            notes,
            lines: self.items,
            shipping_fee,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(value.to_string())
}

/// Order confirmation returned to the shopper.
#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method: &'static str,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    pub currency: &'static str,
    pub items: Vec<OrderItem>,
}

/// Payload of the `new-order` event sent to the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderNotification {
    pub order_id: i32,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_tier: CustomerTier,
    pub city: String,
    pub total: Price,
    pub item_count: i32,
}

impl NewOrderNotification {
    fn from_placed(placed: &PlacedOrder) -> Self {
        let order = &placed.order.order;
        Self {
            order_id: order.id.as_i32(),
            order_number: order.order_number.clone(),
            customer_name: order.shipping_name.clone(),
            customer_email: order.customer_email.to_string(),
            customer_tier: placed.customer_tier,
            city: order.shipping_city.clone(),
            total: order.total,
            item_count: placed.order.items.iter().map(|i| i.quantity).sum(),
        }
    }
}

/// Place a cash-on-delivery order.
///
/// # Errors
///
/// Returns `AppError::BadRequest` / `AppError::Checkout` for invalid input or
/// insufficient stock, `AppError::OutOfStock` when stock ran out mid-order,
/// and `AppError::Database` for storage failures.
#[instrument(skip(state, request))]
pub async fn place_cod_order(state: &AppState, request: CheckoutRequest) -> Result<OrderConfirmation> {
    let new_order = request.validate(state.config().shipping_fee)?;
    let placed = OrderRepository::new(state.pool())
        .create_cod_order(&new_order)
        .await?;

    state.catalog().invalidate_all().await;
    state
        .realtime()
        .notify(NEW_ORDER_EVENT, NewOrderNotification::from_placed(&placed));

    info!(
        order_number = %placed.order.order.order_number,
        tier = placed.customer_tier.as_str(),
        "Checkout completed"
    );

    let order = placed.order.order;
    Ok(OrderConfirmation {
        order_number: order.order_number,
        status: order.status,
        payment_method: "cod",
        subtotal: order.subtotal,
        shipping_fee: order.shipping_fee,
        total: order.total,
        currency: state.config().currency.code(),
        items: placed.order.items,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use zolar_core::VariantId;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            name: "  Laila Hassan ".to_string(),
            email: "Laila@Example.com".to_string(),
            phone: "+20 100 123 4567".to_string(),
            address: "12 Nile St".to_string(),
            city: "Cairo".to_string(),
            notes: Some("   ".to_string()),
            items: vec![RequestedLine {
                variant_id: VariantId::new(1),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let order = request().validate(Price::parse("50").unwrap()).unwrap();
        assert_eq!(order.name, "Laila Hassan");
        assert_eq!(order.email.as_str(), "laila@example.com");
        assert_eq!(order.phone.as_str(), "+201001234567");
        assert_eq!(order.notes, None);
        assert_eq!(order.shipping_fee.to_string(), "50.00");
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut req = request();
        req.city = "  ".to_string();
        let err = req.validate(Price::ZERO).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "city is required"));

        let mut req = request();
        req.email = "not-an-email".to_string();
        assert!(matches!(req.validate(Price::ZERO), Err(AppError::BadRequest(_))));

        let mut req = request();
        req.phone = "12".to_string();
        assert!(matches!(req.validate(Price::ZERO), Err(AppError::BadRequest(_))));

        let mut req = request();
        req.items.clear();
        assert!(matches!(req.validate(Price::ZERO), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_rejects_long_notes() {
        let mut req = request();
        req.notes = Some("x".repeat(MAX_FIELD_LENGTH + 1));
        assert!(matches!(req.validate(Price::ZERO), Err(AppError::BadRequest(_))));
    }
}
