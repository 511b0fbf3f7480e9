use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::entity::asset;
use crate::error::AppError;

use super::shared::double_option;

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 256;
const DESCRIPTION_MIN: usize = 10;
const DESCRIPTION_MAX: usize = 5000;
const CATEGORY_MAX: usize = 64;
const URL_MAX: usize = 2048;
const PRODUCT_ID_MAX: usize = 128;

pub const FEATURED_DEFAULT: u64 = 3;
pub const FEATURED_MAX: u64 = 12;

/// Metadata part (`data`) of the multipart upload.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    /// At least 3 characters.
    #[schema(example = "Icon Pack")]
    pub title: String,
    /// At least 10 characters.
    #[schema(example = "fifty icons bundle")]
    pub description: String,
    #[schema(example = "graphics")]
    pub category: String,
    #[serde(default)]
    pub is_premium: bool,
    /// Required for premium assets, ignored for free ones.
    #[schema(example = 29.99)]
    pub price: Option<f64>,
    /// Required for premium assets, ignored for free ones.
    #[schema(example = "product_id_2")]
    pub sellix_product_id: Option<String>,
    pub image_url: Option<String>,
}

/// Monetization of an asset. Free assets carry neither a price nor a product.
#[derive(Debug, Clone, PartialEq)]
pub enum Pricing {
    Free,
    Premium {
        price: f64,
        sellix_product_id: String,
    },
}

impl Pricing {
    pub fn is_premium(&self) -> bool {
        matches!(self, Pricing::Premium { .. })
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Pricing::Free => None,
            Pricing::Premium { price, .. } => Some(*price),
        }
    }

    pub fn sellix_product_id(&self) -> Option<String> {
        match self {
            Pricing::Free => None,
            Pricing::Premium {
                sellix_product_id, ..
            } => Some(sellix_product_id.clone()),
        }
    }

    /// Build a premium pricing, checking both parts are present and sane.
    fn premium(price: Option<f64>, sellix_product_id: Option<String>) -> Result<Self, AppError> {
        let price = price.ok_or_else(|| {
            AppError::Validation("Premium assets require a price".into())
        })?;
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::Validation(
                "Price must be a non-negative number".into(),
            ));
        }
        let sellix_product_id = sellix_product_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Validation("Premium assets require a sellixProductId".into())
            })?;
        if sellix_product_id.chars().count() > PRODUCT_ID_MAX {
            return Err(AppError::Validation(format!(
                "sellixProductId must be at most {PRODUCT_ID_MAX} characters"
            )));
        }
        Ok(Pricing::Premium {
            price,
            sellix_product_id,
        })
    }
}

/// Metadata after validation and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub pricing: Pricing,
}

pub fn validate_metadata(meta: AssetMetadata) -> Result<ValidatedMetadata, AppError> {
    let pricing = if meta.is_premium {
        Pricing::premium(meta.price, meta.sellix_product_id)?
    } else {
        Pricing::Free
    };

    Ok(ValidatedMetadata {
        title: validate_title(&meta.title)?,
        description: validate_description(&meta.description)?,
        category: validate_category(&meta.category)?,
        image_url: normalize_image_url(meta.image_url)?,
        pricing,
    })
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Title must be {TITLE_MIN}-{TITLE_MAX} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String, AppError> {
    let description = description.trim();
    let len = description.chars().count();
    if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Description must be {DESCRIPTION_MIN}-{DESCRIPTION_MAX} characters"
        )));
    }
    Ok(description.to_string())
}

fn validate_category(category: &str) -> Result<String, AppError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(AppError::Validation("Category is required".into()));
    }
    if category.chars().count() > CATEGORY_MAX {
        return Err(AppError::Validation(format!(
            "Category must be at most {CATEGORY_MAX} characters"
        )));
    }
    Ok(category.to_string())
}

/// Blank image URLs mean "no preview".
fn normalize_image_url(url: Option<String>) -> Result<Option<String>, AppError> {
    let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    if url.len() > URL_MAX {
        return Err(AppError::Validation(format!(
            "imageUrl must be at most {URL_MAX} bytes"
        )));
    }
    Ok(Some(url))
}

/// Partial update. Absent fields are left alone; `null` clears nullable ones.
#[derive(Deserialize, Default, PartialEq, Debug, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub is_premium: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub sellix_product_id: Option<Option<String>>,
}

/// An [`UpdateAssetRequest`] whose standalone fields passed validation.
/// Pricing is checked later against the stored record.
#[derive(Debug, Default, PartialEq)]
pub struct AssetChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<Option<String>>,
    pub is_premium: Option<bool>,
    pub price: Option<Option<f64>>,
    pub sellix_product_id: Option<Option<String>>,
}

impl AssetChanges {
    pub fn is_empty(&self) -> bool {
        *self == AssetChanges::default()
    }

    fn touches_pricing(&self) -> bool {
        self.is_premium.is_some() || self.price.is_some() || self.sellix_product_id.is_some()
    }

    /// Pricing after this change is applied to `current`, or `None` if the
    /// change leaves pricing alone.
    pub fn pricing_for(&self, current: &asset::Model) -> Result<Option<Pricing>, AppError> {
        if !self.touches_pricing() {
            return Ok(None);
        }

        let premium = self.is_premium.unwrap_or(current.is_premium);
        if premium {
            let price = match self.price {
                Some(price) => price,
                None => current.price,
            };
            let product = match &self.sellix_product_id {
                Some(product) => product.clone(),
                None => current.sellix_product_id.clone(),
            };
            return Pricing::premium(price, product).map(Some);
        }

        if matches!(self.price, Some(Some(_))) || matches!(self.sellix_product_id, Some(Some(_))) {
            return Err(AppError::Validation(
                "price and sellixProductId are only allowed on premium assets".into(),
            ));
        }
        Ok(Some(Pricing::Free))
    }
}

pub fn validate_update(payload: UpdateAssetRequest) -> Result<AssetChanges, AppError> {
    Ok(AssetChanges {
        title: payload.title.as_deref().map(validate_title).transpose()?,
        description: payload
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?,
        category: payload.category.as_deref().map(validate_category).transpose()?,
        image_url: payload.image_url.map(normalize_image_url).transpose()?,
        is_premium: payload.is_premium,
        price: payload.price,
        sellix_product_id: payload.sellix_product_id,
    })
}

#[derive(Serialize, Debug, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    /// Asset ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "Icon Pack")]
    pub title: String,
    #[schema(example = "fifty icons bundle")]
    pub description: String,
    /// Where the file content can be fetched.
    #[schema(example = "/api/v1/files/e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")]
    pub file_url: String,
    pub image_url: Option<String>,
    #[schema(example = "graphics")]
    pub category: String,
    pub is_premium: bool,
    /// Present only on premium assets.
    pub price: Option<f64>,
    /// Present only on premium assets.
    pub sellix_product_id: Option<String>,
    #[schema(example = 0)]
    pub downloads: i64,
    /// Uploading admin.
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<asset::Model> for AssetResponse {
    fn from(model: asset::Model) -> Self {
        Self {
            id: model.id.to_string(),
            title: model.title,
            description: model.description,
            file_url: model.file_url,
            image_url: model.image_url,
            category: model.category,
            is_premium: model.is_premium,
            price: model.price,
            sellix_product_id: model.sellix_product_id,
            downloads: model.downloads,
            user_id: model.user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Price bands offered by the catalog filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    /// `under-20`: price < 20
    Under20,
    /// `20-50`: 20 <= price <= 50
    From20To50,
    /// `over-50`: price > 50
    Over50,
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "under-20" => Ok(PriceTier::Under20),
            "20-50" => Ok(PriceTier::From20To50),
            "over-50" => Ok(PriceTier::Over50),
            other => Err(format!(
                "priceTier must be one of: under-20, 20-50, over-50 (got '{other}')"
            )),
        }
    }
}

/// Query string of the asset listing.
#[derive(Deserialize, Default, Debug, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AssetListQuery {
    /// Category, compared case-insensitively.
    pub category: Option<String>,
    /// List premium (`true`) or free (`false`) assets. Free when omitted.
    #[serde(default, deserialize_with = "flag")]
    #[param(value_type = Option<bool>)]
    pub is_premium: bool,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// One of `under-20`, `20-50`, `over-50`; `all` or empty means no filter.
    #[serde(default, deserialize_with = "optional_tier")]
    #[param(value_type = Option<String>)]
    pub price_tier: Option<PriceTier>,
}

impl AssetListQuery {
    /// Drop blank filters so `?category=&search=` behaves like no filter.
    pub fn normalized(self) -> Self {
        let non_blank = |s: Option<String>| {
            s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            category: non_blank(self.category),
            is_premium: self.is_premium,
            search: non_blank(self.search),
            price_tier: self.price_tier,
        }
    }
}

#[derive(Deserialize, Default, Debug, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    /// Only categories of free (`false`) or premium (`true`) assets.
    #[serde(default, deserialize_with = "optional_flag")]
    pub is_premium: Option<bool>,
}

#[derive(Deserialize, Default, Debug, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeaturedQuery {
    /// Assets per group, 1-12. Defaults to 3.
    pub limit: Option<u64>,
}

impl FeaturedQuery {
    pub fn limit(&self) -> Result<u64, AppError> {
        let limit = self.limit.unwrap_or(FEATURED_DEFAULT);
        if !(1..=FEATURED_MAX).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {FEATURED_MAX}"
            )));
        }
        Ok(limit)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FeaturedResponse {
    /// Most downloaded free assets.
    pub free: Vec<AssetResponse>,
    /// Newest premium assets.
    pub premium: Vec<AssetResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_url: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Like [`optional_flag`], reading a blank value as `false`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    optional_flag(deserializer).map(Option::unwrap_or_default)
}

/// `""` => `None`, `"true"`/`"false"` => the flag.
fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "isPremium must be 'true' or 'false' (got '{other}')"
        ))),
    }
}

fn optional_tier<'de, D>(deserializer: D) -> Result<Option<PriceTier>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(tier) => tier.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
