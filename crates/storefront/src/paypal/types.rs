//! `PayPal` Orders v2 request and response bodies.

use serde::{Deserialize, Serialize};

use omoide_core::pricing::Quote;
use omoide_core::types::money::CURRENCY_CODE;
use omoide_core::Yen;

/// Shown on the `PayPal` approval page.
pub const BRAND_NAME: &str = "思い出売場";

/// Capture status that means the money moved.
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// `PayPal` rejects item names longer than this.
const MAX_ITEM_NAME_CHARS: usize = 127;

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    pub intent: &'static str,
    pub purchase_units: Vec<PurchaseUnit>,
    pub application_context: ApplicationContext,
}

#[derive(Debug, Serialize)]
pub struct PurchaseUnit {
    pub amount: Amount,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
pub struct Amount {
    pub currency_code: &'static str,
    pub value: String,
    pub breakdown: Breakdown,
}

#[derive(Debug, Serialize)]
pub struct Breakdown {
    pub item_total: Money,
    pub shipping: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency_code: String,
    pub value: String,
}

impl From<Yen> for Money {
    fn from(amount: Yen) -> Self {
        Self {
            currency_code: CURRENCY_CODE.to_string(),
            value: amount.to_processor_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Item {
    pub name: String,
    pub quantity: String,
    pub unit_amount: Money,
}

#[derive(Debug, Serialize)]
pub struct ApplicationContext {
    pub brand_name: &'static str,
    pub locale: &'static str,
    pub landing_page: &'static str,
    pub user_action: &'static str,
}

impl CreateOrderRequest {
    /// Build an immediate-capture order for a server-side quote.
    #[must_use]
    pub fn for_quote(quote: &Quote) -> Self {
        let items = quote
            .lines()
            .iter()
            .map(|line| Item {
                name: line.name.chars().take(MAX_ITEM_NAME_CHARS).collect(),
                quantity: line.quantity.to_string(),
                unit_amount: line.unit_price.into(),
            })
            .collect();

        Self {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                amount: Amount {
                    currency_code: CURRENCY_CODE,
                    value: quote.total().to_processor_string(),
                    breakdown: Breakdown {
                        item_total: quote.item_total().into(),
                        shipping: quote.shipping_fee().into(),
                    },
                },
                items,
            }],
            application_context: ApplicationContext {
                brand_name: BRAND_NAME,
                locale: "ja-JP",
                landing_page: "NO_PREFERENCE",
                user_action: "PAY_NOW",
            },
        }
    }
}

/// Body returned by create and get order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusResponse {
    pub id: String,
    pub status: String,
}

/// Body returned by capture.
#[derive(Debug, Deserialize)]
pub struct CaptureResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub purchase_units: Vec<CapturedUnit>,
}

#[derive(Debug, Deserialize)]
pub struct CapturedUnit {
    #[serde(default)]
    pub payments: Option<Payments>,
}

#[derive(Debug, Deserialize)]
pub struct Payments {
    #[serde(default)]
    pub captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
pub struct Capture {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<Money>,
}

/// What the checkout needs to know about a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub order_id: String,
    pub status: String,
    /// First capture ID, used to refund.
    pub capture_id: Option<String>,
    /// Amount of the first capture.
    pub amount: Option<Money>,
}

impl CaptureResult {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    /// Whether the captured amount is exactly `expected` in yen.
    ///
    /// A capture without an amount does not match.
    #[must_use]
    pub fn captured(&self, expected: Yen) -> bool {
        self.amount.as_ref().is_some_and(|m| {
            m.currency_code == CURRENCY_CODE && m.value == expected.to_processor_string()
        })
    }
}

impl From<CaptureResponse> for CaptureResult {
    fn from(response: CaptureResponse) -> Self {
        let first = response
            .purchase_units
            .into_iter()
            .filter_map(|u| u.payments)
            .flat_map(|p| p.captures)
            .next();
        let (capture_id, amount) = first.map_or((None, None), |c| (Some(c.id), c.amount));
        Self {
            order_id: response.id,
            status: response.status,
            capture_id,
            amount,
        }
    }
}

/// Body returned by refund.
#[derive(Debug, Deserialize)]
pub struct RefundResponse {
    pub id: String,
    pub status: String,
}

/// `PayPal` error body; only used to build a readable message.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorResponse {
    /// `NAME: message (ISSUE)` from whatever fields are present.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = match (&self.name, &self.message) {
            (Some(name), Some(message)) => format!("{name}: {message}"),
            (Some(s), None) | (None, Some(s)) => s.clone(),
            (None, None) => "unknown error".to_string(),
        };
        if let Some(issue) = self.details.iter().find_map(|d| d.issue.as_deref()) {
            summary.push_str(&format!(" ({issue})"));
        }
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use omoide_core::ProductId;
    use omoide_core::pricing::PricedLine;

    use super::*;

    fn quote() -> Quote {
        Quote::new(
            vec![PricedLine {
                product_id: ProductId::new(1),
                name: "ファミコン本体".to_string(),
                unit_price: Yen::from_whole(1000),
                quantity: 2,
            }],
            Yen::from_whole(500),
        )
    }

    #[test]
    fn test_create_order_payload() {
        let body = serde_json::to_value(CreateOrderRequest::for_quote(&quote())).unwrap();
        assert_eq!(body["intent"], "CAPTURE");
        let unit = &body["purchase_units"][0];
        assert_eq!(unit["amount"]["currency_code"], "JPY");
        assert_eq!(unit["amount"]["value"], "2500");
        assert_eq!(unit["amount"]["breakdown"]["item_total"]["value"], "2000");
        assert_eq!(unit["amount"]["breakdown"]["shipping"]["value"], "500");
        assert_eq!(unit["items"][0]["name"], "ファミコン本体");
        assert_eq!(unit["items"][0]["quantity"], "2");
        assert_eq!(unit["items"][0]["unit_amount"]["value"], "1000");
        assert_eq!(body["application_context"]["brand_name"], "思い出売場");
        assert_eq!(body["application_context"]["locale"], "ja-JP");
        assert_eq!(body["application_context"]["user_action"], "PAY_NOW");
    }

    #[test]
    fn test_breakdown_adds_up() {
        let quote = Quote::new(
            vec![
                PricedLine {
                    product_id: ProductId::new(1),
                    name: "ゲームボーイ".to_string(),
                    unit_price: Yen::from_whole(4_980),
                    quantity: 3,
                },
                PricedLine {
                    product_id: ProductId::new(2),
                    name: "たまごっち".to_string(),
                    unit_price: Yen::from_whole(1_299),
                    quantity: 1,
                },
            ],
            Yen::from_whole(500),
        );
        let body = serde_json::to_value(CreateOrderRequest::for_quote(&quote)).unwrap();
        let unit = &body["purchase_units"][0];
        let whole = |v: &serde_json::Value| v.as_str().unwrap().parse::<u64>().unwrap();

        let lines: u64 = unit["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| whole(&item["unit_amount"]["value"]) * whole(&item["quantity"]))
            .sum();
        let item_total = whole(&unit["amount"]["breakdown"]["item_total"]["value"]);
        let shipping = whole(&unit["amount"]["breakdown"]["shipping"]["value"]);

        assert_eq!(lines, item_total);
        assert_eq!(item_total + shipping, whole(&unit["amount"]["value"]));
        assert_eq!(whole(&unit["amount"]["value"]), 16_739);
    }

    #[test]
    fn test_capture_response_extracts_capture_id() {
        let json = r#"{
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "purchase_units": [{
                "reference_id": "default",
                "payments": {"captures": [{
                    "id": "3C679366HH908993F",
                    "status": "COMPLETED",
                    "amount": {"currency_code": "JPY", "value": "2500"}
                }]}
            }]
        }"#;
        let result: CaptureResult = serde_json::from_str::<CaptureResponse>(json).unwrap().into();
        assert!(result.is_completed());
        assert_eq!(result.order_id, "5O190127TN364715T");
        assert_eq!(result.capture_id.as_deref(), Some("3C679366HH908993F"));
        assert!(result.captured(Yen::from_whole(2500)));
        assert!(!result.captured(Yen::from_whole(2000)));
    }

    #[test]
    fn test_pending_capture_is_not_completed() {
        let json = r#"{"id": "X", "status": "PAYER_ACTION_REQUIRED"}"#;
        let result: CaptureResult = serde_json::from_str::<CaptureResponse>(json).unwrap().into();
        assert!(!result.is_completed());
        assert_eq!(result.capture_id, None);
        assert!(!result.captured(Yen::from_whole(2500)));
    }

    #[test]
    fn test_error_summary() {
        let json = r#"{
            "name": "UNPROCESSABLE_ENTITY",
            "message": "The requested action could not be performed.",
            "details": [{"issue": "INSTRUMENT_DECLINED", "description": "declined"}]
        }"#;
        let error: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            error.summary(),
            "UNPROCESSABLE_ENTITY: The requested action could not be performed. (INSTRUMENT_DECLINED)"
        );
    }
}
