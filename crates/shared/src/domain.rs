use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a managed entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Coupon,
    Category,
    Customer,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Coupon => "coupon",
            ResourceKind::Category => "category",
            ResourceKind::Customer => "customer",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity of a managed collection. The id never appears inside `fields`;
/// on the wire both are flattened into a single JSON object keyed by `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<F> {
    #[serde(rename = "_id", alias = "id")]
    pub id: ResourceId,
    #[serde(flatten)]
    pub fields: F,
}

impl<F> Record<F> {
    pub fn new(id: impl Into<ResourceId>, fields: F) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponFields {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default)]
    pub min_order_amount: f64,
    #[serde(default)]
    pub max_discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

impl CouponFields {
    /// Table rendering of the discount: `10%` for percentages, `Rs. 10` for fixed amounts.
    pub fn discount_label(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => format!("{}%", self.discount_value),
            DiscountType::Fixed => format!("Rs. {}", self.discount_value),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "Active"
        } else {
            "Inactive"
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryFields {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.street, self.city, self.country)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerFields {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub cart: Vec<String>,
    #[serde(default)]
    pub wishlist: Vec<String>,
    #[serde(default)]
    pub orders: Vec<String>,
    #[serde(default)]
    pub address: Address,
}

pub type Coupon = Record<CouponFields>;
pub type Category = Record<CategoryFields>;
pub type Customer = Record<CustomerFields>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn coupon_record_decodes_from_storefront_shape() {
        let coupon: Coupon = serde_json::from_value(json!({
            "_id": "66a1",
            "code": "SAVE10",
            "discountType": "percentage",
            "discountValue": 10,
            "minOrderAmount": 100,
            "maxDiscount": null,
            "expiresAt": "2030-01-01T00:00:00.000Z",
            "isActive": true,
            "createdAt": "2024-01-01T00:00:00.000Z",
            "__v": 0
        }))
        .expect("decode coupon");

        assert_eq!(coupon.id.as_str(), "66a1");
        assert_eq!(coupon.fields.code, "SAVE10");
        assert_eq!(coupon.fields.max_discount, None);
        assert!(coupon.fields.is_active);
        assert_eq!(coupon.fields.discount_label(), "10%");
    }

    #[test]
    fn record_accepts_plain_id_alias() {
        let category: Category =
            serde_json::from_value(json!({ "id": "7", "name": "Truffles" })).expect("decode");
        assert_eq!(category.id, ResourceId::from("7"));
        assert_eq!(category.fields.description, None);
    }

    #[test]
    fn fields_serialize_without_id() {
        let body = serde_json::to_value(CategoryFields {
            name: "Bars".into(),
            description: None,
        })
        .expect("encode");
        assert_eq!(body, json!({ "name": "Bars" }));
    }

    #[test]
    fn fixed_discount_label_uses_rupees() {
        let fields = CouponFields {
            discount_type: DiscountType::Fixed,
            discount_value: 250.0,
            ..CouponFields::default()
        };
        assert_eq!(fields.discount_label(), "Rs. 250");
        assert_eq!(fields.status_label(), "Inactive");
    }
}
