use async_trait::async_trait;
use shared::{
    domain::{Record, ResourceId},
    schema::ResourceSchema,
};

use crate::error::GatewayError;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome<F> {
    /// The server echoed the created entity.
    Created(Record<F>),
    /// The server confirmed creation but did not return the entity.
    Acknowledged(Option<ResourceId>),
}

/// Typed boundary to the remote system for one resource type. Every call is
/// single-shot: implementations never retry.
#[async_trait]
pub trait ResourceGateway<F: ResourceSchema>: Send + Sync {
    async fn list(&self) -> GatewayResult<Vec<Record<F>>>;
    async fn get(&self, id: &ResourceId) -> GatewayResult<Record<F>>;
    async fn create(&self, fields: &F) -> GatewayResult<CreateOutcome<F>>;
    async fn update(&self, id: &ResourceId, fields: &F) -> GatewayResult<Record<F>>;
    async fn delete(&self, id: &ResourceId) -> GatewayResult<()>;

    /// Flips a boolean field server-side. Gateways without a dedicated route
    /// keep this default and the controller falls back to `update`.
    async fn toggle(&self, _id: &ResourceId, _flag: &str) -> GatewayResult<Record<F>> {
        Err(GatewayError::Unsupported)
    }
}
