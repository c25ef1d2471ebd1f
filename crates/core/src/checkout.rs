//! Cart pricing and stock validation.
//!
//! The storefront quotes browser-held carts with [`quote_cart`] and prices
//! real orders with [`price_order`] inside the checkout transaction, with
//! variant rows locked `FOR UPDATE`. Subtotal is always the sum of line totals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Price, PriceError, ProductId, VariantId};

/// Maximum units of one variant per order.
pub const MAX_QUANTITY_PER_LINE: u32 = 20;

/// Maximum distinct variants per order.
pub const MAX_LINES: usize = 50;

/// A line as requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// The state of a variant at pricing time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSnapshot {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_active: bool,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub unit_price: Price,
    pub stock: i32,
}

/// A priced order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
}

/// A fully priced order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
}

impl PricedOrder {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

/// Why a cart cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("cart has more than {max} distinct items")]
    TooManyLines { max: usize },
    #[error("quantity for variant {variant_id} must be between 1 and {max}")]
    InvalidQuantity { variant_id: VariantId, max: u32 },
    #[error("variant {0} does not exist")]
    UnknownVariant(VariantId),
    #[error("{sku} is no longer available")]
    Unavailable { sku: String },
    #[error("only {available} left of {sku} (requested {requested})")]
    InsufficientStock {
        sku: String,
        requested: u32,
        available: i32,
    },
    #[error("price calculation failed: {0}")]
    Price(#[from] PriceError),
}

/// Merge duplicate variant lines and validate quantities.
///
/// Lines keep the order in which each variant first appeared.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart`, `TooManyLines` or `InvalidQuantity`.
pub fn normalize_lines(requested: &[RequestedLine]) -> Result<Vec<RequestedLine>, CheckoutError> {
    if requested.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut merged: Vec<RequestedLine> = Vec::with_capacity(requested.len());
    let mut index: HashMap<VariantId, usize> = HashMap::new();
    for line in requested {
        if line.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity {
                variant_id: line.variant_id,
                max: MAX_QUANTITY_PER_LINE,
            });
        }
        let existing = index.get(&line.variant_id).copied();
        match existing.and_then(|i| merged.get_mut(i)) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => {
                index.insert(line.variant_id, merged.len());
                merged.push(*line);
            }
        }
    }

    if merged.len() > MAX_LINES {
        return Err(CheckoutError::TooManyLines { max: MAX_LINES });
    }
    if let Some(line) = merged.iter().find(|l| l.quantity > MAX_QUANTITY_PER_LINE) {
        return Err(CheckoutError::InvalidQuantity {
            variant_id: line.variant_id,
            max: MAX_QUANTITY_PER_LINE,
        });
    }

    Ok(merged)
}

/// Price a single normalized line against its snapshot.
fn price_line(line: RequestedLine, snapshot: &VariantSnapshot) -> Result<PricedLine, CheckoutError> {
    if !snapshot.product_active {
        return Err(CheckoutError::Unavailable {
            sku: snapshot.sku.clone(),
        });
    }
    if i64::from(snapshot.stock) < i64::from(line.quantity) {
        return Err(CheckoutError::InsufficientStock {
            sku: snapshot.sku.clone(),
            requested: line.quantity,
            available: snapshot.stock.max(0),
        });
    }

    Ok(PricedLine {
        variant_id: snapshot.variant_id,
        product_id: snapshot.product_id,
        product_name: snapshot.product_name.clone(),
        sku: snapshot.sku.clone(),
        color: snapshot.color.clone(),
        size: snapshot.size.clone(),
        unit_price: snapshot.unit_price,
        quantity: line.quantity,
        line_total: snapshot.unit_price.line_total(line.quantity)?,
    })
}

/// Price an order and verify stock for every line.
///
/// # Errors
///
/// Returns the first `CheckoutError` encountered, in line order.
pub fn price_order(
    requested: &[RequestedLine],
    snapshots: &[VariantSnapshot],
    shipping_fee: Price,
) -> Result<PricedOrder, CheckoutError> {
    let lines = normalize_lines(requested)?;
    let by_id: HashMap<VariantId, &VariantSnapshot> =
        snapshots.iter().map(|s| (s.variant_id, s)).collect();

    let priced = lines
        .into_iter()
        .map(|line| {
            let snapshot = by_id
                .get(&line.variant_id)
                .ok_or(CheckoutError::UnknownVariant(line.variant_id))?;
            price_line(line, snapshot)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal: Price = priced.iter().map(|line| line.line_total).sum();
    Ok(PricedOrder {
        lines: priced,
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
    })
}

/// Outcome of quoting a cart line that may not be orderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuotedLine {
    Ok(PricedLine),
    Unavailable {
        variant_id: VariantId,
        reason: String,
    },
}

/// A cart quote: every line priced where possible, with problems reported
/// per line instead of failing the whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartQuote {
    pub lines: Vec<QuotedLine>,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    pub orderable: bool,
}

/// Quote a browser-held cart.
///
/// Unlike [`price_order`], stock and availability problems do not abort: the
/// offending line is reported as `Unavailable` and excluded from the totals.
///
/// # Errors
///
/// Returns `CheckoutError` only for malformed carts (empty, too many lines,
/// bad quantities) or arithmetic overflow.
pub fn quote_cart(
    requested: &[RequestedLine],
    snapshots: &[VariantSnapshot],
    shipping_fee: Price,
) -> Result<CartQuote, CheckoutError> {
    let lines = normalize_lines(requested)?;
    let by_id: HashMap<VariantId, &VariantSnapshot> =
        snapshots.iter().map(|s| (s.variant_id, s)).collect();

    let mut quoted = Vec::with_capacity(lines.len());
    for line in lines {
        let result = by_id
            .get(&line.variant_id)
            .ok_or(CheckoutError::UnknownVariant(line.variant_id))
            .and_then(|snapshot| price_line(line, snapshot));
        match result {
            Ok(priced) => quoted.push(QuotedLine::Ok(priced)),
            Err(CheckoutError::Price(e)) => return Err(CheckoutError::Price(e)),
            Err(e) => quoted.push(QuotedLine::Unavailable {
                variant_id: line.variant_id,
                reason: e.to_string(),
            }),
        }
    }

    let subtotal: Price = quoted
        .iter()
        .filter_map(|line| match line {
            QuotedLine::Ok(priced) => Some(priced.line_total),
            QuotedLine::Unavailable { .. } => None,
        })
        .sum();
    let orderable = quoted.iter().all(|l| matches!(l, QuotedLine::Ok(_)));

    Ok(CartQuote {
        lines: quoted,
        subtotal,
        shipping_fee,
        total: subtotal + shipping_fee,
        orderable,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn snapshot(id: i32, sku: &str, price: &str, stock: i32) -> VariantSnapshot {
        VariantSnapshot {
            variant_id: VariantId::new(id),
            product_id: ProductId::new(100 + id),
            product_name: format!("Product {id}"),
            product_active: true,
            sku: sku.to_string(),
            color: Some("black".to_string()),
            size: Some("M".to_string()),
            unit_price: Price::parse(price).unwrap(),
            stock,
        }
    }

    fn line(id: i32, quantity: u32) -> RequestedLine {
        RequestedLine {
            variant_id: VariantId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_price_order_sums_lines() {
        let snapshots = [snapshot(1, "TEE-BLK-M", "450", 10), snapshot(2, "CAP-01", "199.99", 3)];
        let order = price_order(
            &[line(1, 2), line(2, 1)],
            &snapshots,
            Price::parse("60").unwrap(),
        )
        .unwrap();

        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].line_total.to_string(), "900.00");
        assert_eq!(order.subtotal.to_string(), "1099.99");
        assert_eq!(order.total.to_string(), "1159.99");
        assert_eq!(order.item_count(), 3);
        let sum: Price = order.lines.iter().map(|l| l.line_total).sum();
        assert_eq!(sum, order.subtotal);
    }

    #[test]
    fn test_price_order_rejects_insufficient_stock() {
        let snapshots = [snapshot(1, "TEE-BLK-M", "450", 1)];
        let err = price_order(&[line(1, 2)], &snapshots, Price::ZERO).unwrap_err();
        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                sku: "TEE-BLK-M".to_string(),
                requested: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn test_price_order_exact_stock_is_fine() {
        let snapshots = [snapshot(1, "TEE-BLK-M", "450", 2)];
        assert!(price_order(&[line(1, 2)], &snapshots, Price::ZERO).is_ok());
    }

    #[test]
    fn test_price_order_merges_duplicate_lines() {
        let snapshots = [snapshot(1, "TEE-BLK-M", "100", 5)];
        let order = price_order(&[line(1, 2), line(1, 3)], &snapshots, Price::ZERO).unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 5);

        let err = price_order(&[line(1, 3), line(1, 3)], &snapshots, Price::ZERO).unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { requested: 6, .. }));
    }

    #[test]
    fn test_price_order_rejects_unknown_and_inactive() {
        let mut inactive = snapshot(2, "OLD-01", "10", 5);
        inactive.product_active = false;
        let snapshots = [snapshot(1, "TEE-BLK-M", "100", 5), inactive];

        assert_eq!(
            price_order(&[line(9, 1)], &snapshots, Price::ZERO).unwrap_err(),
            CheckoutError::UnknownVariant(VariantId::new(9))
        );
        assert_eq!(
            price_order(&[line(2, 1)], &snapshots, Price::ZERO).unwrap_err(),
            CheckoutError::Unavailable {
                sku: "OLD-01".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_lines_limits() {
        assert_eq!(normalize_lines(&[]).unwrap_err(), CheckoutError::EmptyCart);
        assert!(matches!(
            normalize_lines(&[line(1, 0)]).unwrap_err(),
            CheckoutError::InvalidQuantity { .. }
        ));
        assert!(matches!(
            normalize_lines(&[line(1, 15), line(1, 6)]).unwrap_err(),
            CheckoutError::InvalidQuantity { .. }
        ));
        let many: Vec<_> = (0..=50).map(|i| line(i, 1)).collect();
        assert_eq!(
            normalize_lines(&many).unwrap_err(),
            CheckoutError::TooManyLines { max: MAX_LINES }
        );
    }

    #[test]
    fn test_quote_cart_reports_problems_per_line() {
        let snapshots = [snapshot(1, "TEE-BLK-M", "100", 1), snapshot(2, "CAP-01", "50", 4)];
        let quote = quote_cart(
            &[line(1, 3), line(2, 2), line(7, 1)],
            &snapshots,
            Price::parse("25").unwrap(),
        )
        .unwrap();

        assert!(!quote.orderable);
        assert_eq!(quote.lines.len(), 3);
        assert!(matches!(quote.lines[0], QuotedLine::Unavailable { .. }));
        assert!(matches!(quote.lines[1], QuotedLine::Ok(_)));
        assert!(matches!(quote.lines[2], QuotedLine::Unavailable { .. }));
        assert_eq!(quote.subtotal.to_string(), "100.00");
        assert_eq!(quote.total.to_string(), "125.00");
    }

    #[test]
    fn test_quote_cart_serializes_status_tag() {
        let snapshots = [snapshot(1, "TEE-BLK-M", "100", 1)];
        let quote = quote_cart(&[line(1, 1)], &snapshots, Price::ZERO).unwrap();
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["orderable"], true);
        assert_eq!(json["lines"][0]["status"], "ok");
        assert_eq!(json["lines"][0]["sku"], "TEE-BLK-M");
    }
}
