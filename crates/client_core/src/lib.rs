//! Client side of the storefront admin dashboard: typed gateways to the
//! storefront REST API and a generic list controller shared by the coupon,
//! category and customer screens.

use std::sync::Arc;

use shared::{
    domain::{CategoryFields, CouponFields, CustomerFields},
    schema::ResourceSchema,
};

pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod form;
pub mod gateway;
pub mod http_gateway;
pub mod memory_gateway;

pub use controller::{ControllerOptions, ControllerResult, ResourceListController};
pub use error::{ControllerError, GatewayError};
pub use filter::{FilterState, FilterUpdate, VisibleSlice};
pub use form::{FormError, FormSession};
pub use gateway::{CreateOutcome, GatewayResult, ResourceGateway};
pub use http_gateway::{ApiClient, HttpGateway};
pub use memory_gateway::MemoryGateway;

pub type CouponController = ResourceListController<CouponFields>;
pub type CategoryController = ResourceListController<CategoryFields>;
pub type CustomerController = ResourceListController<CustomerFields>;

/// Builds a controller for `F` talking to the storefront API through `api`.
pub fn http_controller<F: ResourceSchema>(
    api: ApiClient,
    options: ControllerOptions,
) -> Arc<ResourceListController<F>> {
    ResourceListController::with_options(Arc::new(HttpGateway::<F>::new(api)), options)
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/http_gateway_tests.rs"]
mod http_gateway_tests;
