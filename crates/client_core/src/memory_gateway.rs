use std::sync::Mutex;

use async_trait::async_trait;
use shared::{
    domain::{Record, ResourceId},
    schema::ResourceSchema,
};
use uuid::Uuid;

use crate::{
    error::GatewayError,
    gateway::{CreateOutcome, GatewayResult, ResourceGateway},
};

/// Gateway backed by process memory. Behaves like the remote API: it assigns
/// ids, keeps insertion order and owns the authoritative copy.
pub struct MemoryGateway<F> {
    records: Mutex<Vec<Record<F>>>,
}

impl<F: ResourceSchema> Default for MemoryGateway<F> {
    fn default() -> Self {
        Self::seeded(Vec::new())
    }
}

impl<F: ResourceSchema> MemoryGateway<F> {
    pub fn seeded(records: Vec<Record<F>>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn records(&self) -> Vec<Record<F>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record<F>>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<F: ResourceSchema> ResourceGateway<F> for MemoryGateway<F> {
    async fn list(&self) -> GatewayResult<Vec<Record<F>>> {
        Ok(self.records())
    }

    async fn get(&self, id: &ResourceId) -> GatewayResult<Record<F>> {
        self.lock()
            .iter()
            .find(|record| &record.id == id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn create(&self, fields: &F) -> GatewayResult<CreateOutcome<F>> {
        fields.validate().map_err(GatewayError::Validation)?;
        let record = Record::new(Uuid::new_v4().to_string(), fields.clone());
        self.lock().push(record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn update(&self, id: &ResourceId, fields: &F) -> GatewayResult<Record<F>> {
        fields.validate().map_err(GatewayError::Validation)?;
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(GatewayError::NotFound)?;
        record.fields = fields.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: &ResourceId) -> GatewayResult<()> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|record| &record.id != id);
        if records.len() == before {
            return Err(GatewayError::NotFound);
        }
        Ok(())
    }

    async fn toggle(&self, id: &ResourceId, flag: &str) -> GatewayResult<Record<F>> {
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(GatewayError::NotFound)?;
        let current = record.fields.flag(flag).ok_or(GatewayError::Unsupported)?;
        record.fields.set_flag(flag, !current);
        Ok(record.clone())
    }
}
