//! Request body validation.
//!
//! Each form is deserialized as-is and then checked here; all violations are
//! collected so the client can highlight every bad field at once. Messages are
//! shopper-facing Japanese.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use omoide_core::inventory::{MAX_QUANTITY, MIN_QUANTITY, StockRequest};
use omoide_core::{Email, ProductId};

use crate::models::{NewContact, Profile, ShippingAddress};

static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}-?\d{4}$").expect("Invalid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0\d{1,4}-?\d{1,4}-?\d{4}$").expect("Invalid regex"));

/// The 47 prefectures, north to south.
pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県",
    "岐阜県", "静岡県", "愛知県", "三重県",
    "滋賀県", "京都府", "大阪府", "兵庫県", "奈良県", "和歌山県",
    "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県",
    "福岡県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県", "鹿児島県",
    "沖縄県",
];

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// camelCase path, e.g. `shippingAddress.postalCode` or `items[0].quantity`.
    pub field: String,
    pub message: String,
}

/// A request body failed validation.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// A single-field failure.
    #[must_use]
    pub fn single(field: &str, message: &str) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.to_owned(),
                message: message.to_owned(),
            }],
        }
    }

    #[must_use]
    pub fn first_message(&self) -> &str {
        self.errors
            .first()
            .map_or("入力内容に誤りがあります", |e| e.message.as_str())
    }

    #[must_use]
    pub fn first_field(&self) -> Option<&str> {
        self.errors.first().map(|e| e.field.as_str())
    }
}

#[derive(Debug, Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, message: &str) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.to_owned(),
        });
    }

    /// Record `message` unless `value` has between `min` and `max` characters.
    fn length(&mut self, field: &str, value: &str, min: usize, max: usize, message: &str) {
        let len = value.chars().count();
        if len < min || len > max {
            self.push(field, message);
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors: self.0 })
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Checkout
// =============================================================================

/// One cart line as submitted by the client.
///
/// `price` is what the client displayed; it is validated for shape only and
/// never used to price the order.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<CartLine> for StockRequest {
    fn from(line: CartLine) -> Self {
        Self::new(line.product_id, line.quantity)
    }
}

/// Checkout body: cart, delivery address and the totals the client computed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
}

/// Capture body: the processor order to capture and the checkout it pays for.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureForm {
    pub paypal_order_id: String,
    pub order_data: CheckoutForm,
}

/// Validate a delivery address in place, trimming fields.
///
/// # Errors
///
/// Returns every violated field, prefixed with `shippingAddress.`.
pub fn validate_shipping_address(address: &mut ShippingAddress) -> Result<(), ValidationError> {
    let mut v = Violations::default();
    check_shipping_address(address, &mut v);
    v.finish()
}

fn check_shipping_address(address: &mut ShippingAddress, v: &mut Violations) {
    address.name = address.name.trim().to_owned();
    address.postal_code = address.postal_code.trim().to_owned();
    address.prefecture = address.prefecture.trim().to_owned();
    address.city = address.city.trim().to_owned();
    address.address_line1 = address.address_line1.trim().to_owned();
    address.address_line2 = blank_to_none(address.address_line2.take());
    address.phone_number = address.phone_number.trim().to_owned();

    if address.name.is_empty() {
        v.push("shippingAddress.name", "名前を入力してください");
    } else {
        v.length("shippingAddress.name", &address.name, 1, 100, "名前は100文字以内で入力してください");
    }

    if !POSTAL_CODE_RE.is_match(&address.postal_code) {
        v.push("shippingAddress.postalCode", "郵便番号は123-4567の形式で入力してください");
    }

    let prefecture_len = address.prefecture.chars().count();
    if prefecture_len < 2 {
        v.push("shippingAddress.prefecture", "都道府県を入力してください");
    } else if prefecture_len > 10 {
        v.push("shippingAddress.prefecture", "都道府県は10文字以内で入力してください");
    } else if !PREFECTURES.contains(&address.prefecture.as_str()) {
        v.push("shippingAddress.prefecture", "都道府県を選択してください");
    }

    if address.city.is_empty() {
        v.push("shippingAddress.city", "市区町村を入力してください");
    } else {
        v.length("shippingAddress.city", &address.city, 1, 50, "市区町村は50文字以内で入力してください");
    }

    if address.address_line1.is_empty() {
        v.push("shippingAddress.addressLine1", "町名・番地を入力してください");
    } else {
        v.length(
            "shippingAddress.addressLine1",
            &address.address_line1,
            1,
            100,
            "町名・番地は100文字以内で入力してください",
        );
    }

    if let Some(line2) = &address.address_line2 {
        v.length(
            "shippingAddress.addressLine2",
            line2,
            0,
            100,
            "建物名・部屋番号は100文字以内で入力してください",
        );
    }

    if !PHONE_RE.is_match(&address.phone_number) {
        v.push(
            "shippingAddress.phoneNumber",
            "電話番号は03-1234-5678または090-1234-5678の形式で入力してください",
        );
    }
}

fn check_cart(items: &[CartLine], v: &mut Violations) {
    if items.is_empty() {
        v.push("items", "カートに商品が入っていません");
        return;
    }
    for (i, item) in items.iter().enumerate() {
        if item.quantity < MIN_QUANTITY {
            v.push(format!("items[{i}].quantity"), "数量は1以上である必要があります");
        } else if item.quantity > MAX_QUANTITY {
            v.push(format!("items[{i}].quantity"), "数量は99以下である必要があります");
        }
        if item.price < Decimal::ZERO {
            v.push(format!("items[{i}].price"), "価格は0以上である必要があります");
        }
    }
}

/// Validate a checkout body in place.
///
/// # Errors
///
/// Returns every violated field of the cart, address and totals.
pub fn validate_checkout(form: &mut CheckoutForm) -> Result<(), ValidationError> {
    let mut v = Violations::default();
    check_cart(&form.items, &mut v);
    check_shipping_address(&mut form.shipping_address, &mut v);
    if form.shipping_fee < Decimal::ZERO {
        v.push("shippingFee", "配送料は0以上である必要があります");
    }
    if form.total_amount < Decimal::ONE {
        v.push("totalAmount", "合計金額は1円以上である必要があります");
    }
    v.finish()
}

/// Validate a capture body in place.
///
/// # Errors
///
/// Returns every violated field; checkout fields are prefixed with `orderData.`.
pub fn validate_capture(form: &mut CaptureForm) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    form.paypal_order_id = form.paypal_order_id.trim().to_owned();
    if form.paypal_order_id.is_empty() {
        errors.push(FieldError {
            field: "paypalOrderId".to_owned(),
            message: "PayPal注文IDが必要です".to_owned(),
        });
    }
    if let Err(e) = validate_checkout(&mut form.order_data) {
        errors.extend(e.errors.into_iter().map(|f| FieldError {
            field: format!("orderData.{}", f.field),
            message: f.message,
        }));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

// =============================================================================
// Contact
// =============================================================================

/// Contact form body.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Validate a contact form.
///
/// # Errors
///
/// Returns every violated field.
pub fn validate_contact(form: ContactForm) -> Result<NewContact, ValidationError> {
    let mut v = Violations::default();
    let name = form.name.trim().to_owned();
    let subject = form.subject.trim().to_owned();
    let message = form.message.trim().to_owned();

    if name.is_empty() {
        v.push("name", "お名前を入力してください");
    } else {
        v.length("name", &name, 1, 100, "お名前は100文字以内で入力してください");
    }

    let email = check_email(&form.email, &mut v);

    if subject.is_empty() {
        v.push("subject", "件名を入力してください");
    } else {
        v.length("subject", &subject, 1, 200, "件名は200文字以内で入力してください");
    }

    let message_len = message.chars().count();
    if message_len < 10 {
        v.push("message", "お問い合わせ内容は10文字以上で入力してください");
    } else if message_len > 2000 {
        v.push("message", "お問い合わせ内容は2000文字以内で入力してください");
    }

    v.finish()?;
    let email = email.ok_or_else(|| {
        ValidationError::single("email", "有効なメールアドレスを入力してください")
    })?;
    Ok(NewContact {
        name,
        email,
        subject,
        message,
    })
}

fn check_email(raw: &str, v: &mut Violations) -> Option<Email> {
    if raw.trim().is_empty() {
        v.push("email", "メールアドレスを入力してください");
        return None;
    }
    match Email::parse(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            v.push("email", "有効なメールアドレスを入力してください");
            None
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// Profile update body. Empty strings clear optional fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub prefecture: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Validate a profile update.
///
/// # Errors
///
/// Returns every violated field.
pub fn validate_profile(form: ProfileForm) -> Result<Profile, ValidationError> {
    let mut v = Violations::default();

    let name = form.name.trim().to_owned();
    match name.chars().count() {
        0 => v.push("name", "名前を入力してください"),
        1 => v.push("name", "名前は2文字以上で入力してください"),
        n if n > 50 => v.push("name", "名前は50文字以内で入力してください"),
        _ => {}
    }

    let email = check_email(&form.email, &mut v);

    let phone_number = blank_to_none(form.phone_number);
    if let Some(phone) = &phone_number
        && !PHONE_RE.is_match(phone)
    {
        v.push("phoneNumber", "有効な電話番号を入力してください（例: 090-1234-5678）");
    }

    let postal_code = blank_to_none(form.postal_code);
    if let Some(postal) = &postal_code
        && !POSTAL_CODE_RE.is_match(postal)
    {
        v.push("postalCode", "有効な郵便番号を入力してください（例: 123-4567）");
    }

    let prefecture = blank_to_none(form.prefecture);
    if let Some(prefecture) = &prefecture
        && !PREFECTURES.contains(&prefecture.as_str())
    {
        v.push("prefecture", "都道府県を選択してください");
    }

    let city = blank_to_none(form.city);
    if let Some(city) = &city {
        v.length("city", city, 0, 100, "市区町村は100文字以内で入力してください");
    }
    let address = blank_to_none(form.address);
    if let Some(address) = &address {
        v.length("address", address, 0, 200, "番地は200文字以内で入力してください");
    }
    let building = blank_to_none(form.building);
    if let Some(building) = &building {
        v.length("building", building, 0, 200, "建物名は200文字以内で入力してください");
    }

    let image = blank_to_none(form.image);
    if let Some(image) = &image
        && !is_http_url(image)
    {
        v.push("image", "有効なURLを入力してください");
    }

    v.finish()?;
    let email = email.ok_or_else(|| {
        ValidationError::single("email", "有効なメールアドレスを入力してください")
    })?;
    Ok(Profile {
        name,
        email,
        phone_number,
        postal_code,
        prefecture,
        city,
        address,
        building,
        image,
    })
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Password change body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Validate the shape of a password change. The current password is checked
/// against the stored hash separately.
///
/// # Errors
///
/// Returns every violated field.
pub fn validate_password_change(form: &PasswordChangeForm) -> Result<(), ValidationError> {
    let mut v = Violations::default();
    if form.current_password.is_empty() {
        v.push("currentPassword", "現在のパスワードを入力してください");
    }
    if form.new_password.is_empty() {
        v.push("newPassword", "新しいパスワードを入力してください");
    } else if let Some(message) = password_weakness(&form.new_password) {
        v.push("newPassword", message);
    }
    if form.confirm_password.is_empty() {
        v.push("confirmPassword", "パスワード（確認）を入力してください");
    } else if form.confirm_password != form.new_password {
        v.push("confirmPassword", "新しいパスワードが一致しません");
    }
    v.finish()
}

/// Why a password is too weak, or `None` if it is acceptable.
///
/// At least eight characters from letters, digits and `@$!%*#?&`, with at
/// least one letter and one digit.
#[must_use]
pub fn password_weakness(password: &str) -> Option<&'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some("パスワードは8文字以上で入力してください");
    }
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@$!%*#?&".contains(c));
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if allowed && has_letter && has_digit {
        None
    } else {
        Some("パスワードは英字と数字を含む8文字以上で入力してください")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "山田 太郎".to_owned(),
            postal_code: "123-4567".to_owned(),
            prefecture: "東京都".to_owned(),
            city: "千代田区".to_owned(),
            address_line1: "千代田1-1".to_owned(),
            address_line2: Some("  ".to_owned()),
            phone_number: "090-1234-5678".to_owned(),
        }
    }

    fn checkout() -> CheckoutForm {
        CheckoutForm {
            items: vec![CartLine {
                product_id: ProductId::new(1),
                quantity: 2,
                price: Decimal::from(1000),
            }],
            shipping_address: address(),
            shipping_fee: Decimal::from(500),
            total_amount: Decimal::from(2500),
        }
    }

    fn fields(e: &ValidationError) -> Vec<&str> {
        e.errors.iter().map(|f| f.field.as_str()).collect()
    }

    #[test]
    fn test_valid_address_is_normalised() {
        let mut a = address();
        a.name = "  山田 太郎 ".to_owned();
        validate_shipping_address(&mut a).unwrap();
        assert_eq!(a.name, "山田 太郎");
        assert_eq!(a.address_line2, None);
    }

    #[test]
    fn test_postal_and_phone_formats() {
        for postal in ["1234567", "123-4567"] {
            let mut a = address();
            a.postal_code = postal.to_owned();
            assert!(validate_shipping_address(&mut a).is_ok(), "{postal}");
        }
        for phone in ["0312345678", "03-1234-5678", "090-1234-5678"] {
            let mut a = address();
            a.phone_number = phone.to_owned();
            assert!(validate_shipping_address(&mut a).is_ok(), "{phone}");
        }

        let mut a = address();
        a.postal_code = "12-34567".to_owned();
        a.phone_number = "90-1234-5678".to_owned();
        let err = validate_shipping_address(&mut a).unwrap_err();
        assert_eq!(
            fields(&err),
            vec!["shippingAddress.postalCode", "shippingAddress.phoneNumber"]
        );
        assert_eq!(err.first_message(), "郵便番号は123-4567の形式で入力してください");
    }

    #[test]
    fn test_unknown_prefecture() {
        let mut a = address();
        a.prefecture = "東京".to_owned();
        let err = validate_shipping_address(&mut a).unwrap_err();
        assert_eq!(fields(&err), vec!["shippingAddress.prefecture"]);
    }

    #[test]
    fn test_name_length_counts_characters() {
        let mut a = address();
        a.name = "あ".repeat(100);
        assert!(validate_shipping_address(&mut a).is_ok());
        a.name = "あ".repeat(101);
        assert!(validate_shipping_address(&mut a).is_err());
    }

    #[test]
    fn test_checkout_collects_all_violations() {
        let mut form = checkout();
        form.items[0].quantity = 100;
        form.shipping_fee = Decimal::from(-1);
        form.total_amount = Decimal::ZERO;
        form.shipping_address.city = String::new();
        let err = validate_checkout(&mut form).unwrap_err();
        assert_eq!(
            fields(&err),
            vec![
                "items[0].quantity",
                "shippingAddress.city",
                "shippingFee",
                "totalAmount"
            ]
        );
    }

    #[test]
    fn test_empty_cart() {
        let mut form = checkout();
        form.items.clear();
        let err = validate_checkout(&mut form).unwrap_err();
        assert_eq!(err.first_message(), "カートに商品が入っていません");
    }

    #[test]
    fn test_capture_prefixes_order_data() {
        let mut form = CaptureForm {
            paypal_order_id: " ".to_owned(),
            order_data: checkout(),
        };
        form.order_data.items[0].quantity = 0;
        let err = validate_capture(&mut form).unwrap_err();
        assert_eq!(fields(&err), vec!["paypalOrderId", "orderData.items[0].quantity"]);
    }

    #[test]
    fn test_checkout_body_deserializes() {
        let json = r#"{
            "items": [{"productId": 7, "quantity": 1, "price": 1200}],
            "shippingAddress": {
                "name": "佐藤", "postalCode": "1000001", "prefecture": "東京都",
                "city": "千代田区", "addressLine1": "1-1", "phoneNumber": "0312345678"
            },
            "shippingFee": 500,
            "totalAmount": 1700
        }"#;
        let mut form: CheckoutForm = serde_json::from_str(json).unwrap();
        assert_eq!(form.items[0].product_id, ProductId::new(7));
        assert!(form.shipping_address.address_line2.is_none());
        validate_checkout(&mut form).unwrap();
    }

    #[test]
    fn test_contact() {
        let contact = validate_contact(ContactForm {
            name: "山田".to_owned(),
            email: "Yamada@Example.com".to_owned(),
            subject: "在庫について".to_owned(),
            message: "再入荷の予定はありますか？教えてください。".to_owned(),
        })
        .unwrap();
        assert_eq!(contact.email.as_str(), "yamada@example.com");

        let err = validate_contact(ContactForm {
            name: String::new(),
            email: "not-an-email".to_owned(),
            subject: "x".to_owned(),
            message: "短い".to_owned(),
        })
        .unwrap_err();
        assert_eq!(fields(&err), vec!["name", "email", "message"]);
    }

    #[test]
    fn test_profile_blank_fields_clear() {
        let profile = validate_profile(ProfileForm {
            name: "山田太郎".to_owned(),
            email: "taro@example.com".to_owned(),
            phone_number: Some(String::new()),
            postal_code: Some("123-4567".to_owned()),
            prefecture: Some("大阪府".to_owned()),
            city: None,
            address: Some(" ".to_owned()),
            building: None,
            image: Some("https://cdn.example.com/a.png".to_owned()),
        })
        .unwrap();
        assert_eq!(profile.phone_number, None);
        assert_eq!(profile.address, None);
        assert_eq!(profile.postal_code.as_deref(), Some("123-4567"));
    }

    #[test]
    fn test_profile_rejects_bad_fields() {
        let err = validate_profile(ProfileForm {
            name: "山".to_owned(),
            email: "taro@example.com".to_owned(),
            phone_number: Some("12345".to_owned()),
            postal_code: None,
            prefecture: None,
            city: None,
            address: None,
            building: None,
            image: Some("javascript:alert(1)".to_owned()),
        })
        .unwrap_err();
        assert_eq!(fields(&err), vec!["name", "phoneNumber", "image"]);
    }

    #[test]
    fn test_password_weakness() {
        assert!(password_weakness("abc12345").is_none());
        assert!(password_weakness("abc1234").is_some());
        assert!(password_weakness("abcdefgh").is_some());
        assert!(password_weakness("12345678").is_some());
        assert!(password_weakness("abc 12345").is_some());
        assert!(password_weakness("p@ssw0rd!").is_none());
    }

    #[test]
    fn test_password_change_confirmation() {
        let err = validate_password_change(&PasswordChangeForm {
            current_password: "old-pass1".to_owned(),
            new_password: "newpass12".to_owned(),
            confirm_password: "newpass13".to_owned(),
        })
        .unwrap_err();
        assert_eq!(err.first_field(), Some("confirmPassword"));
        assert_eq!(err.first_message(), "新しいパスワードが一致しません");
    }
}
