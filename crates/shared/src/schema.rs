//! Per-resource behaviour the generic list controller needs: which fields are
//! searched, which booleans can be toggled, and how drafts are validated.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    domain::{CategoryFields, CouponFields, CustomerFields, DiscountType, ResourceKind},
    error::FieldErrors,
};

pub trait ResourceSchema:
    Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const KIND: ResourceKind;

    /// Field values matched by the list search box.
    fn search_terms(&self) -> Vec<&str>;

    /// Current value of a toggleable boolean field, `None` if `name` is not one.
    fn flag(&self, _name: &str) -> Option<bool> {
        None
    }

    /// Sets a toggleable boolean field. Returns false if `name` is not one.
    fn set_flag(&mut self, _name: &str, _value: bool) -> bool {
        false
    }

    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), FieldErrors>;

    fn matches(&self, needle_lowercase: &str) -> bool {
        needle_lowercase.is_empty()
            || self
                .search_terms()
                .join(" ")
                .to_lowercase()
                .contains(needle_lowercase)
    }
}

pub const IS_ACTIVE: &str = "isActive";

impl ResourceSchema for CouponFields {
    const KIND: ResourceKind = ResourceKind::Coupon;

    fn search_terms(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.discount_type.as_str()]
    }

    fn flag(&self, name: &str) -> Option<bool> {
        (name == IS_ACTIVE).then_some(self.is_active)
    }

    fn set_flag(&mut self, name: &str, value: bool) -> bool {
        if name != IS_ACTIVE {
            return false;
        }
        self.is_active = value;
        true
    }

    fn normalize(&mut self) {
        self.code = self.code.trim().to_uppercase();
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.code.trim().is_empty() {
            errors.insert("code", "Coupon code is required");
        }
        if !self.discount_value.is_finite() || self.discount_value < 0.0 {
            errors.insert("discountValue", "Discount must be at least 0");
        } else if self.discount_type == DiscountType::Percentage && self.discount_value > 100.0 {
            errors.insert("discountValue", "Percentage discount cannot exceed 100");
        }
        if !self.min_order_amount.is_finite() || self.min_order_amount < 0.0 {
            errors.insert("minOrderAmount", "Minimum order amount must be at least 0");
        }
        if self
            .max_discount
            .is_some_and(|max| !max.is_finite() || max < 0.0)
        {
            errors.insert("maxDiscount", "Maximum discount must be at least 0");
        }
        if self.expires_at.is_none() {
            errors.insert("expiresAt", "Expiration date is required");
        }
        errors.into_result()
    }
}

impl ResourceSchema for CategoryFields {
    const KIND: ResourceKind = ResourceKind::Category;

    fn search_terms(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_deref().unwrap_or("")]
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        if self
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            self.description = None;
        }
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "Category name is required");
        }
        errors.into_result()
    }
}

impl ResourceSchema for CustomerFields {
    const KIND: ResourceKind = ResourceKind::Customer;

    fn search_terms(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.phone.as_str()]
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.trim().to_string();
    }

    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required");
        }
        if !self.email.contains('@') {
            errors.insert("email", "A valid email address is required");
        }
        errors.into_result()
    }
}
