//! Request body validation for back-office forms.
//!
//! Forms deserialize leniently (missing fields become `None`) and are checked
//! here so every bad field is reported at once.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use omoide_core::{CategoryId, ContactStatus, MoneyError, Yen};

use crate::models::{CategoryInput, ContactUpdate, ProductInput};

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("Invalid regex"));

const MAX_NAME_LENGTH: usize = 100;
const MAX_SLUG_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 5000;
const MAX_URL_LENGTH: usize = 2048;
const MAX_IMAGES: usize = 10;
const MAX_NOTE_LENGTH: usize = 2000;
const MAX_OPENING_STOCK: i32 = 99_999;

/// Largest number of units one restock may add.
pub const MAX_RESTOCK: i32 = 10_000;
/// Largest number of files in one upload request.
pub const MAX_UPLOAD_FILES: usize = 10;

/// One invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
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

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors: self.0 })
        }
    }

    fn name(&mut self, value: &str) {
        let len = value.chars().count();
        if len == 0 {
            self.push("name", "名前を入力してください");
        } else if len > MAX_NAME_LENGTH {
            self.push("name", "名前は100文字以内で入力してください");
        }
    }

    fn slug(&mut self, value: &str) {
        if value.is_empty() {
            self.push("slug", "スラッグを入力してください");
        } else if value.len() > MAX_SLUG_LENGTH || !SLUG_RE.is_match(value) {
            self.push(
                "slug",
                "スラッグは半角英小文字・数字・ハイフンで入力してください",
            );
        }
    }

    fn description(&mut self, value: Option<&str>) {
        if value.is_some_and(|v| v.chars().count() > MAX_DESCRIPTION_LENGTH) {
            self.push("description", "説明は5000文字以内で入力してください");
        }
    }

    fn url(&mut self, field: &str, value: &str) {
        let web = value.starts_with("https://") || value.starts_with("http://");
        if !web || value.len() > MAX_URL_LENGTH {
            self.push(field, "画像URLが正しくありません");
        }
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_owned()).unwrap_or_default()
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::deserialize(deserializer).map(Some)
}

// =============================================================================
// Products
// =============================================================================

/// Product create / update body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// Opening stock; ignored on update.
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Validate a product body.
///
/// Returns the fields to write and the opening stock (default 0).
///
/// # Errors
///
/// Returns every invalid field.
pub fn validate_product(form: ProductForm) -> Result<(ProductInput, i32), ValidationError> {
    let mut v = Violations::default();

    let name = trimmed(form.name);
    v.name(&name);
    let slug = trimmed(form.slug);
    v.slug(&slug);
    let description = blank_to_none(form.description);
    v.description(description.as_deref());

    let price = match form.price.map(Yen::new) {
        Some(Ok(price)) => price,
        Some(Err(MoneyError::Negative(_))) => {
            v.push("price", "価格は0以上で入力してください");
            Yen::ZERO
        }
        Some(Err(MoneyError::Fractional(_))) => {
            v.push("price", "価格は1円単位で入力してください");
            Yen::ZERO
        }
        None => {
            v.push("price", "価格を入力してください");
            Yen::ZERO
        }
    };

    let stock = form.stock.unwrap_or(0);
    if !(0..=MAX_OPENING_STOCK).contains(&stock) {
        v.push("stock", "在庫数は0から99999の間で入力してください");
    }

    let image_url = blank_to_none(form.image_url);
    if let Some(url) = &image_url {
        v.url("imageUrl", url);
    }
    let images: Vec<String> = form
        .images
        .unwrap_or_default()
        .into_iter()
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .collect();
    if images.len() > MAX_IMAGES {
        v.push("images", "画像は10枚まで登録できます");
    }
    for (i, url) in images.iter().enumerate() {
        v.url(&format!("images[{i}]"), url);
    }

    let category_id = form.category_id.unwrap_or_else(|| {
        v.push("categoryId", "カテゴリを選択してください");
        CategoryId::new(0)
    });

    v.finish()?;
    Ok((
        ProductInput {
            name,
            slug,
            description,
            price,
            image_url,
            images,
            category_id,
            is_active: form.is_active.unwrap_or(true),
            is_featured: form.is_featured.unwrap_or(false),
        },
        stock,
    ))
}

/// Restock body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RestockForm {
    pub quantity: i32,
}

/// Validate a restock quantity.
///
/// # Errors
///
/// Returns a `quantity` error unless `1 <= quantity <= 10000`.
pub fn validate_restock(form: RestockForm) -> Result<i32, ValidationError> {
    if (1..=MAX_RESTOCK).contains(&form.quantity) {
        Ok(form.quantity)
    } else {
        Err(ValidationError::single(
            "quantity",
            "入荷数は1から10000の間で入力してください",
        ))
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Category create / update body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForm {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Validate a category body.
///
/// # Errors
///
/// Returns every invalid field.
pub fn validate_category(form: CategoryForm) -> Result<CategoryInput, ValidationError> {
    let mut v = Violations::default();

    let name = trimmed(form.name);
    v.name(&name);
    let slug = trimmed(form.slug);
    v.slug(&slug);
    let description = blank_to_none(form.description);
    v.description(description.as_deref());
    let image_url = blank_to_none(form.image_url);
    if let Some(url) = &image_url {
        v.url("imageUrl", url);
    }

    v.finish()?;
    Ok(CategoryInput {
        name,
        slug,
        description,
        image_url,
    })
}

// =============================================================================
// Orders and contacts
// =============================================================================

/// Admin note body. Blank or `null` clears the note.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteForm {
    #[serde(default, alias = "note")]
    pub admin_note: Option<String>,
}

/// Validate an admin note.
///
/// # Errors
///
/// Returns an `adminNote` error when the note is over 2000 characters.
pub fn validate_note(note: Option<String>) -> Result<Option<String>, ValidationError> {
    let note = blank_to_none(note);
    if note
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH)
    {
        return Err(ValidationError::single(
            "adminNote",
            "メモは2000文字以内で入力してください",
        ));
    }
    Ok(note)
}

/// Contact PATCH body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatchForm {
    pub status: Option<ContactStatus>,
    #[serde(default, deserialize_with = "present")]
    pub admin_note: Option<Option<String>>,
}

/// Validate a contact PATCH body.
///
/// # Errors
///
/// Returns an `adminNote` error when the note is too long.
pub fn validate_contact_patch(form: ContactPatchForm) -> Result<ContactUpdate, ValidationError> {
    let admin_note = match form.admin_note {
        Some(note) => Some(validate_note(note)?),
        None => None,
    };
    Ok(ContactUpdate {
        status: form.status,
        admin_note,
    })
}

// =============================================================================
// Uploads
// =============================================================================

/// One file the browser wants to upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadFile {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Upload body: a single `fileName`/`fileType` pair or a `files` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub files: Option<Vec<UploadFile>>,
}

/// Validate an upload body into `(name, content type)` pairs.
///
/// # Errors
///
/// Returns an error when a name or type is missing, a type is not `image/*`,
/// or more than ten files are requested.
pub fn validate_upload(form: UploadForm) -> Result<Vec<UploadFile>, ValidationError> {
    let files = match form.files {
        Some(files) => files,
        None => match (blank_to_none(form.file_name), blank_to_none(form.file_type)) {
            (Some(name), Some(content_type)) => vec![UploadFile { name, content_type }],
            _ => {
                return Err(ValidationError::single(
                    "fileName",
                    "ファイル名とファイルタイプが必要です",
                ));
            }
        },
    };

    if files.is_empty() {
        return Err(ValidationError::single(
            "files",
            "ファイル名とファイルタイプが必要です",
        ));
    }
    if files.len() > MAX_UPLOAD_FILES {
        return Err(ValidationError::single(
            "files",
            "一度にアップロードできるのは10ファイルまでです",
        ));
    }

    let mut v = Violations::default();
    for (i, file) in files.iter().enumerate() {
        if file.name.trim().is_empty() || file.content_type.trim().is_empty() {
            v.push(
                format!("files[{i}]"),
                "ファイル名とファイルタイプが必要です",
            );
        } else if !file.content_type.starts_with("image/") {
            v.push(format!("files[{i}].type"), "画像ファイルのみアップロード可能です");
        }
    }
    v.finish()?;
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_form() -> ProductForm {
        ProductForm {
            name: Some(" ファミコン本体 ".to_string()),
            slug: Some("famicom-console".to_string()),
            description: Some("動作確認済み".to_string()),
            price: Some(Decimal::from(12_800)),
            stock: Some(2),
            image_url: Some("https://cdn.omoideuriba.com/famicom.jpg".to_string()),
            images: None,
            category_id: Some(CategoryId::new(2)),
            is_active: None,
            is_featured: None,
        }
    }

    fn fields(err: &ValidationError) -> Vec<&str> {
        err.errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_product() {
        let (input, stock) = validate_product(product_form()).unwrap();
        assert_eq!(input.name, "ファミコン本体");
        assert_eq!(input.price, Yen::from_whole(12_800));
        assert_eq!(stock, 2);
        assert!(input.is_active);
        assert!(!input.is_featured);
    }

    #[test]
    fn test_product_collects_all_errors() {
        let form = ProductForm {
            slug: Some("Bad Slug".to_string()),
            price: Some(Decimal::from(-1)),
            stock: Some(-5),
            ..ProductForm::default()
        };
        let err = validate_product(form).unwrap_err();
        assert_eq!(
            fields(&err),
            vec!["name", "slug", "price", "stock", "categoryId"]
        );
    }

    #[test]
    fn test_product_price_must_be_whole_yen() {
        let mut form = product_form();
        form.price = Some(Decimal::new(10_050, 2));
        let err = validate_product(form).unwrap_err();
        assert_eq!(fields(&err), vec!["price"]);
        assert_eq!(err.errors[0].message, "価格は1円単位で入力してください");

        let mut form = product_form();
        form.price = Some(Decimal::new(98_000, 2));
        let (input, _) = validate_product(form).unwrap();
        assert_eq!(input.price, Yen::from_whole(980));
    }

    #[test]
    fn test_product_image_urls_checked() {
        let mut form = product_form();
        form.images = Some(vec![
            "https://cdn.omoideuriba.com/a.jpg".to_string(),
            "javascript:alert(1)".to_string(),
        ]);
        let err = validate_product(form).unwrap_err();
        assert_eq!(fields(&err), vec!["images[1]"]);
    }

    #[test]
    fn test_slug_rules() {
        assert!(SLUG_RE.is_match("cd-record"));
        assert!(SLUG_RE.is_match("toy"));
        assert!(!SLUG_RE.is_match("-toy"));
        assert!(!SLUG_RE.is_match("toy--game"));
        assert!(!SLUG_RE.is_match("おもちゃ"));
    }

    #[test]
    fn test_restock_bounds() {
        assert_eq!(validate_restock(RestockForm { quantity: 1 }).unwrap(), 1);
        assert!(validate_restock(RestockForm { quantity: 0 }).is_err());
        assert!(validate_restock(RestockForm { quantity: -3 }).is_err());
        assert!(validate_restock(RestockForm { quantity: MAX_RESTOCK + 1 }).is_err());
    }

    #[test]
    fn test_category_requires_name_and_slug() {
        let err = validate_category(CategoryForm::default()).unwrap_err();
        assert_eq!(fields(&err), vec!["name", "slug"]);

        let input = validate_category(CategoryForm {
            name: Some("ゲーム".to_string()),
            slug: Some("game".to_string()),
            description: Some("  ".to_string()),
            image_url: None,
        })
        .unwrap();
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_contact_patch_distinguishes_null_from_absent() {
        let form: ContactPatchForm = serde_json::from_str(r#"{"status":"RESOLVED"}"#).unwrap();
        let update = validate_contact_patch(form).unwrap();
        assert_eq!(update.status, Some(ContactStatus::Resolved));
        assert_eq!(update.admin_note, None);

        let form: ContactPatchForm = serde_json::from_str(r#"{"adminNote":null}"#).unwrap();
        let update = validate_contact_patch(form).unwrap();
        assert_eq!(update.admin_note, Some(None));

        let form: ContactPatchForm =
            serde_json::from_str(r#"{"adminNote":"返信済み"}"#).unwrap();
        let update = validate_contact_patch(form).unwrap();
        assert_eq!(update.admin_note, Some(Some("返信済み".to_string())));
    }

    #[test]
    fn test_note_length() {
        assert_eq!(validate_note(Some("  ".to_string())).unwrap(), None);
        assert!(validate_note(Some("あ".repeat(MAX_NOTE_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_upload_single_and_multiple() {
        let form: UploadForm =
            serde_json::from_str(r#"{"fileName":"cat.png","fileType":"image/png"}"#).unwrap();
        let files = validate_upload(form).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content_type, "image/png");

        let form: UploadForm = serde_json::from_str(
            r#"{"files":[{"name":"a.jpg","type":"image/jpeg"},{"name":"b.pdf","type":"application/pdf"}]}"#,
        )
        .unwrap();
        let err = validate_upload(form).unwrap_err();
        assert_eq!(err.first_message(), "画像ファイルのみアップロード可能です");
        assert_eq!(err.first_field(), Some("files[1].type"));
    }

    #[test]
    fn test_upload_requires_name_and_type() {
        let err = validate_upload(UploadForm::default()).unwrap_err();
        assert_eq!(err.first_message(), "ファイル名とファイルタイプが必要です");
    }
}
