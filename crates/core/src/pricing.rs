//! Server-side order pricing.
//!
//! A [`Quote`] is always built from prices read out of the database, never
//! from what the browser cart says a product costs. The client's own total is
//! only used for [`Quote::verify_client_total`], which rejects tampered or
//! stale carts before any payment is requested.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{ProductId, Yen};

/// Largest accepted difference between the client total and the server total.
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Client total disagrees with the server quote.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("amount mismatch: calculated {calculated}, received {received}")]
pub struct AmountMismatch {
    /// Total derived from stored prices.
    pub calculated: Decimal,
    /// Total the client submitted.
    pub received: Decimal,
}

/// One cart line priced at the stored unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Yen,
    pub quantity: u32,
}

impl PricedLine {
    #[must_use]
    pub fn subtotal(&self) -> Yen {
        self.unit_price.times(self.quantity)
    }
}

/// Priced order: lines, item total, shipping and grand total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    lines: Vec<PricedLine>,
    item_total: Yen,
    shipping_fee: Yen,
    total: Yen,
}

impl Quote {
    /// Price `lines` and add a flat `shipping_fee`.
    #[must_use]
    pub fn new(lines: Vec<PricedLine>, shipping_fee: Yen) -> Self {
        let item_total: Yen = lines.iter().map(PricedLine::subtotal).sum();
        Self {
            total: item_total + shipping_fee,
            lines,
            item_total,
            shipping_fee,
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    #[must_use]
    pub const fn item_total(&self) -> Yen {
        self.item_total
    }

    #[must_use]
    pub const fn shipping_fee(&self) -> Yen {
        self.shipping_fee
    }

    #[must_use]
    pub const fn total(&self) -> Yen {
        self.total
    }

    /// Compare a client-submitted total with this quote.
    ///
    /// # Errors
    ///
    /// Returns [`AmountMismatch`] when the two differ by more than
    /// [`TOTAL_TOLERANCE`].
    pub fn verify_client_total(&self, received: Decimal) -> Result<(), AmountMismatch> {
        let calculated = self.total.amount();
        if (calculated - received).abs() > TOTAL_TOLERANCE {
            return Err(AmountMismatch {
                calculated,
                received,
            });
        }
        Ok(())
    }
}
