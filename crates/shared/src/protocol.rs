use serde_json::Value;

use crate::domain::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateVerb {
    Post,
    Put,
}

/// REST layout of one resource on the storefront API. Prefixes are relative
/// path segments; an item route appends the id as a final segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRoutes {
    pub list: &'static str,
    pub list_key: &'static str,
    pub get: &'static str,
    pub item_key: &'static str,
    pub create: &'static str,
    pub update: &'static str,
    pub update_verb: UpdateVerb,
    pub delete: &'static str,
    pub toggle: Option<&'static str>,
}

impl ResourceRoutes {
    pub const fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Coupon => Self {
                list: "get/all/coupon",
                list_key: "coupons",
                get: "get/coupon",
                item_key: "coupon",
                create: "create/coupon",
                update: "update/coupon",
                update_verb: UpdateVerb::Post,
                delete: "delete/coupon",
                toggle: Some("toggle/coupon/status"),
            },
            ResourceKind::Category => Self {
                list: "get/all/products/categories",
                list_key: "categories",
                get: "get/product/category",
                item_key: "category",
                create: "create/product/category",
                update: "update/product/category",
                update_verb: UpdateVerb::Put,
                delete: "delete/product/category",
                toggle: None,
            },
            ResourceKind::Customer => Self {
                list: "get/all/user",
                list_key: "users",
                get: "get/user",
                item_key: "user",
                create: "create/user",
                update: "update/user",
                update_verb: UpdateVerb::Post,
                delete: "delete/user",
                toggle: None,
            },
        }
    }
}

/// Returns the payload stored under `key` when `body` is an envelope object
/// such as `{ "coupons": [...] }`, otherwise the body itself.
pub fn unwrap_envelope(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

/// Extracts a server-assigned id from an acknowledgement body, looking at the
/// top level and one level under `item_key`.
pub fn acknowledged_id(body: &Value, item_key: &str) -> Option<String> {
    fn id_of(value: &Value) -> Option<String> {
        let object = value.as_object()?;
        ["_id", "id"]
            .iter()
            .filter_map(|key| object.get(*key))
            .find_map(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    id_of(body).or_else(|| body.get(item_key).and_then(id_of))
}
