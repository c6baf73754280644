//! Stock reservation planning and stock level classification.
//!
//! The database does the actual reservation with one conditional update per
//! product (`stock = stock - q WHERE stock >= q`). What happens before that is
//! decided here: a cart is turned into a [`ReservationPlan`] with one line per
//! product, quantities validated, and lines ordered by product id so two
//! checkouts touching the same products always take row locks in the same
//! order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Smallest quantity of one product per cart line.
pub const MIN_QUANTITY: i32 = 1;
/// Largest quantity of one product per cart line.
pub const MAX_QUANTITY: i32 = 99;
/// At or below this many units a product is shown as running low.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// A requested quantity of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl StockRequest {
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Cart contents that cannot be reserved at all.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("at least one item is required")]
    Empty,
    #[error("quantity for product {product_id} must be between 1 and 99, got {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: i32 },
}

/// Normalised reservation batch: one line per product, ascending product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationPlan {
    lines: Vec<StockRequest>,
}

impl ReservationPlan {
    /// Build a plan from raw cart lines.
    ///
    /// Each raw line must request 1..=99 units. Lines for the same product are
    /// merged; the merged quantity may exceed 99.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Empty`] for an empty cart and
    /// [`PlanError::InvalidQuantity`] for the first out-of-range line.
    pub fn new(requests: impl IntoIterator<Item = StockRequest>) -> Result<Self, PlanError> {
        let mut merged: BTreeMap<ProductId, i32> = BTreeMap::new();
        for request in requests {
            if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&request.quantity) {
                return Err(PlanError::InvalidQuantity {
                    product_id: request.product_id,
                    quantity: request.quantity,
                });
            }
            *merged.entry(request.product_id).or_insert(0) += request.quantity;
        }

        if merged.is_empty() {
            return Err(PlanError::Empty);
        }

        Ok(Self {
            lines: merged
                .into_iter()
                .map(|(product_id, quantity)| StockRequest::new(product_id, quantity))
                .collect(),
        })
    }

    /// Lines in locking order.
    #[must_use]
    pub fn lines(&self) -> &[StockRequest] {
        &self.lines
    }

    /// Distinct products in the plan, ascending.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_units(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Quantity planned for `product_id`, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<i32> {
        self.lines
            .binary_search_by_key(&product_id, |l| l.product_id)
            .ok()
            .and_then(|i| self.lines.get(i))
            .map(|l| l.quantity)
    }
}

/// How much of a product is left, as shown to shoppers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Available,
    Low,
    OutOfStock,
    /// No longer sold, regardless of stock.
    Inactive,
}

impl StockLevel {
    /// Classify a product's current stock.
    #[must_use]
    pub const fn classify(stock: i32, is_active: bool) -> Self {
        if !is_active {
            Self::Inactive
        } else if stock <= 0 {
            Self::OutOfStock
        } else if stock <= LOW_STOCK_THRESHOLD {
            Self::Low
        } else {
            Self::Available
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "在庫あり",
            Self::Low => "残りわずか",
            Self::OutOfStock => "在庫切れ",
            Self::Inactive => "販売終了",
        }
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::Available | Self::Low)
    }
}

/// Why a requested quantity cannot be sold right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailability {
    NotFound,
    Inactive,
    Insufficient,
}

impl Unavailability {
    /// Shopper-facing message. `current_stock` is only used for
    /// [`Unavailability::Insufficient`].
    #[must_use]
    pub fn message(self, current_stock: i32) -> String {
        match self {
            Self::NotFound => "商品が見つかりません".to_owned(),
            Self::Inactive => "この商品は現在販売していません".to_owned(),
            Self::Insufficient => format!("在庫が不足しています（在庫: {current_stock}個）"),
        }
    }
}

/// Judge a single product against a requested quantity.
///
/// `product` is `(stock, is_active)` or `None` when the product does not exist.
#[must_use]
pub const fn judge(product: Option<(i32, bool)>, requested: i32) -> Option<Unavailability> {
    match product {
        None => Some(Unavailability::NotFound),
        Some((_, false)) => Some(Unavailability::Inactive),
        Some((stock, true)) if stock < requested => Some(Unavailability::Insufficient),
        Some(_) => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn req(id: i32, quantity: i32) -> StockRequest {
        StockRequest::new(ProductId::new(id), quantity)
    }

    #[test]
    fn test_plan_merges_and_sorts() {
        let plan = ReservationPlan::new([req(9, 1), req(3, 2), req(9, 4)]).unwrap();
        assert_eq!(plan.lines(), &[req(3, 2), req(9, 5)]);
        assert_eq!(plan.product_ids(), vec![ProductId::new(3), ProductId::new(9)]);
        assert_eq!(plan.total_units(), 7);
        assert_eq!(plan.quantity_of(ProductId::new(9)), Some(5));
        assert_eq!(plan.quantity_of(ProductId::new(4)), None);
    }

    #[test]
    fn test_plan_rejects_empty() {
        assert_eq!(ReservationPlan::new([]), Err(PlanError::Empty));
    }

    #[test]
    fn test_plan_rejects_out_of_range_quantities() {
        for bad in [0, -1, 100] {
            assert_eq!(
                ReservationPlan::new([req(1, 1), req(2, bad)]),
                Err(PlanError::InvalidQuantity {
                    product_id: ProductId::new(2),
                    quantity: bad
                })
            );
        }
        assert!(ReservationPlan::new([req(1, 99)]).is_ok());
    }

    #[test]
    fn test_merged_quantity_may_exceed_line_limit() {
        let plan = ReservationPlan::new([req(1, 99), req(1, 99)]).unwrap();
        assert_eq!(plan.quantity_of(ProductId::new(1)), Some(198));
    }

    #[test]
    fn test_stock_level_classification() {
        assert_eq!(StockLevel::classify(10, true), StockLevel::Available);
        assert_eq!(StockLevel::classify(6, true), StockLevel::Available);
        assert_eq!(StockLevel::classify(5, true), StockLevel::Low);
        assert_eq!(StockLevel::classify(1, true), StockLevel::Low);
        assert_eq!(StockLevel::classify(0, true), StockLevel::OutOfStock);
        assert_eq!(StockLevel::classify(10, false), StockLevel::Inactive);
        assert!(StockLevel::Low.is_purchasable());
        assert!(!StockLevel::OutOfStock.is_purchasable());
    }

    #[test]
    fn test_stock_level_labels() {
        assert_eq!(StockLevel::Low.label(), "残りわずか");
        assert_eq!(StockLevel::Inactive.label(), "販売終了");
    }

    #[test]
    fn test_judge() {
        assert_eq!(judge(None, 1), Some(Unavailability::NotFound));
        assert_eq!(judge(Some((10, false)), 1), Some(Unavailability::Inactive));
        assert_eq!(judge(Some((1, true)), 2), Some(Unavailability::Insufficient));
        assert_eq!(judge(Some((2, true)), 2), None);
    }

    #[test]
    fn test_insufficient_message_includes_stock() {
        assert_eq!(
            Unavailability::Insufficient.message(3),
            "在庫が不足しています（在庫: 3個）"
        );
    }
}
