use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{CategoryFields, CouponFields, Record, ResourceId},
    schema::ResourceSchema,
};
use tokio::sync::oneshot;

use crate::{
    controller::ResourceListController,
    error::GatewayError,
    gateway::{CreateOutcome, GatewayResult, ResourceGateway},
    memory_gateway::MemoryGateway,
};

/// Wraps a [`MemoryGateway`] with per-call gates and injected failures.
/// Calls are keyed as `list`, `create`, `get:<id>`, `update:<id>`,
/// `delete:<id>` and `toggle:<id>`.
pub struct GatedGateway<F> {
    inner: MemoryGateway<F>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    failures: Mutex<HashMap<String, GatewayError>>,
    calls: Mutex<Vec<String>>,
    supports_toggle: bool,
    acknowledge_creates: bool,
}

impl<F: ResourceSchema> GatedGateway<F> {
    pub fn seeded(records: Vec<Record<F>>) -> Arc<Self> {
        Arc::new(Self::build(records, true, false))
    }

    pub fn without_toggle(records: Vec<Record<F>>) -> Arc<Self> {
        Arc::new(Self::build(records, false, false))
    }

    pub fn acknowledging_creates(records: Vec<Record<F>>) -> Arc<Self> {
        Arc::new(Self::build(records, true, true))
    }

    fn build(records: Vec<Record<F>>, supports_toggle: bool, acknowledge_creates: bool) -> Self {
        Self {
            inner: MemoryGateway::seeded(records),
            gates: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            supports_toggle,
            acknowledge_creates,
        }
    }

    /// Holds the next call for `key` until the returned sender fires or drops.
    pub fn gate(&self, key: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }

    pub fn fail(&self, key: &str, err: GatewayError) {
        self.failures.lock().unwrap().insert(key.to_string(), err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.calls().iter().filter(|call| *call == key).count()
    }

    pub fn server_records(&self) -> Vec<Record<F>> {
        self.inner.records()
    }

    async fn enter(&self, key: String) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(key.clone());
        let gate = self.gates.lock().unwrap().remove(&key);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.failures.lock().unwrap().remove(&key) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<F: ResourceSchema> ResourceGateway<F> for GatedGateway<F> {
    /// Answers with the records as they were when the request arrived.
    async fn list(&self) -> GatewayResult<Vec<Record<F>>> {
        let records = self.inner.list().await?;
        self.enter("list".into()).await?;
        Ok(records)
    }

    async fn get(&self, id: &ResourceId) -> GatewayResult<Record<F>> {
        self.enter(format!("get:{id}")).await?;
        self.inner.get(id).await
    }

    async fn create(&self, fields: &F) -> GatewayResult<CreateOutcome<F>> {
        self.enter("create".into()).await?;
        match self.inner.create(fields).await? {
            CreateOutcome::Created(record) if self.acknowledge_creates => {
                Ok(CreateOutcome::Acknowledged(Some(record.id)))
            }
            outcome => Ok(outcome),
        }
    }

    async fn update(&self, id: &ResourceId, fields: &F) -> GatewayResult<Record<F>> {
        self.enter(format!("update:{id}")).await?;
        self.inner.update(id, fields).await
    }

    async fn delete(&self, id: &ResourceId) -> GatewayResult<()> {
        self.enter(format!("delete:{id}")).await?;
        self.inner.delete(id).await
    }

    async fn toggle(&self, id: &ResourceId, flag: &str) -> GatewayResult<Record<F>> {
        if !self.supports_toggle {
            return Err(GatewayError::Unsupported);
        }
        self.enter(format!("toggle:{id}")).await?;
        self.inner.toggle(id, flag).await
    }
}

pub fn coupon(id: &str, code: &str, is_active: bool) -> Record<CouponFields> {
    Record::new(id, coupon_draft(code, is_active))
}

pub fn coupon_draft(code: &str, is_active: bool) -> CouponFields {
    CouponFields {
        code: code.to_string(),
        discount_value: 10.0,
        expires_at: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
        is_active,
        ..CouponFields::default()
    }
}

pub fn category(id: &str, name: &str) -> Record<CategoryFields> {
    Record::new(
        id,
        CategoryFields {
            name: name.to_string(),
            description: None,
        },
    )
}

/// Controller over `gateway` with its collection already loaded.
pub async fn loaded<F: ResourceSchema>(
    gateway: Arc<GatedGateway<F>>,
) -> Arc<ResourceListController<F>> {
    let controller = ResourceListController::new(gateway);
    controller.load().await.expect("initial load");
    controller
}

/// Yields until `gateway` has seen a call for `key`.
pub async fn wait_for_call<F: ResourceSchema>(gateway: &GatedGateway<F>, key: &str) {
    wait_for_calls(gateway, key, 1).await;
}

/// Yields until `gateway` has seen at least `count` calls for `key`.
pub async fn wait_for_calls<F: ResourceSchema>(gateway: &GatedGateway<F>, key: &str, count: usize) {
    for _ in 0..1000 {
        if gateway.call_count(key) >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("gateway saw fewer than {count} calls for {key}");
}
