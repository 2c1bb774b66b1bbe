//! Resource List Controller: the authoritative local copy of one resource
//! collection plus the rules for reconciling it with the remote API.
//!
//! State lives behind a mutex that is never held across an await. Mutations
//! claim their row (or draft) before the network call and release it through
//! a drop guard, so a cancelled or timed-out call can never leave a row
//! permanently blocked.

use std::{
    collections::HashSet,
    future::Future,
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt, Shared};
use shared::{
    domain::{Record, ResourceId},
    error::FieldErrors,
    schema::ResourceSchema,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ControllerError, GatewayError},
    filter::{visible_slice, FilterState, FilterUpdate, VisibleSlice, DEFAULT_PAGE_SIZE},
    gateway::{CreateOutcome, GatewayResult, ResourceGateway},
};

pub type ControllerResult<T> = std::result::Result<T, ControllerError>;

type SharedLoad<F> = Shared<BoxFuture<'static, GatewayResult<Vec<Record<F>>>>>;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub page_size: NonZeroUsize,
    /// Upper bound for every gateway call; an expired call fails as `Network`.
    pub request_timeout: Option<Duration>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
        }
    }
}

struct ControllerState<F> {
    collection: Vec<Record<F>>,
    filter: FilterState,
    in_flight: HashSet<ResourceId>,
    pending_creates: HashSet<String>,
    pending_load: Option<(u64, SharedLoad<F>)>,
    next_load_ticket: u64,
    last_error: Option<ControllerError>,
    detached: bool,
}

impl<F: ResourceSchema> ControllerState<F> {
    fn position(&self, id: &ResourceId) -> Option<usize> {
        self.collection.iter().position(|record| &record.id == id)
    }

    fn reclamp(&mut self) {
        let needle = self.filter.query.to_lowercase();
        let matching = self
            .collection
            .iter()
            .filter(|record| record.fields.matches(&needle))
            .count();
        self.filter.clamp(matching);
    }

    fn release(&mut self, key: &ClaimKey) {
        match key {
            ClaimKey::Resource(id) => {
                self.in_flight.remove(id);
            }
            ClaimKey::Draft(key) => {
                self.pending_creates.remove(key);
            }
        }
    }

    fn revert_flag(&mut self, id: &ResourceId, revert: &FlagRevert) {
        if let Some(pos) = self.position(id) {
            self.collection[pos]
                .fields
                .set_flag(&revert.flag, revert.value);
        }
    }

    fn record_failure(&mut self, err: &ControllerError) {
        self.last_error = Some(err.clone());
    }
}

enum ClaimKey {
    Resource(ResourceId),
    Draft(String),
}

struct FlagRevert {
    flag: String,
    value: bool,
}

/// Marks a row or draft as busy for the lifetime of one gateway call. If the
/// owning future is dropped before `settle`, the claim is released and any
/// optimistic flag flip is undone.
struct Claim<'a, F: ResourceSchema> {
    state: &'a Mutex<ControllerState<F>>,
    key: ClaimKey,
    revert: Option<FlagRevert>,
    settled: bool,
}

impl<'a, F: ResourceSchema> Claim<'a, F> {
    fn new(state: &'a Mutex<ControllerState<F>>, key: ClaimKey) -> Self {
        Self {
            state,
            key,
            revert: None,
            settled: false,
        }
    }

    fn with_revert(mut self, flag: &str, value: bool) -> Self {
        self.revert = Some(FlagRevert {
            flag: flag.to_string(),
            value,
        });
        self
    }

    /// Releases the claim under an already-held lock and hands back the
    /// pending revert, if any.
    fn settle(mut self, state: &mut ControllerState<F>) -> Option<FlagRevert> {
        state.release(&self.key);
        self.settled = true;
        self.revert.take()
    }
}

impl<F: ResourceSchema> Drop for Claim<'_, F> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock(self.state);
        state.release(&self.key);
        if let (ClaimKey::Resource(id), Some(revert)) = (&self.key, self.revert.take()) {
            if !state.detached {
                state.revert_flag(id, &revert);
                warn!(
                    resource = %F::KIND,
                    id = %id,
                    flag = %revert.flag,
                    "controller: toggle abandoned before completion, reverted"
                );
            }
        }
    }
}

fn lock<F>(state: &Mutex<ControllerState<F>>) -> MutexGuard<'_, ControllerState<F>> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn bounded<T>(
    timeout: Option<Duration>,
    call: impl Future<Output = GatewayResult<T>>,
) -> GatewayResult<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(GatewayError::Network("request timed out".into()))),
        None => call.await,
    }
}

pub struct ResourceListController<F: ResourceSchema> {
    gateway: Arc<dyn ResourceGateway<F>>,
    options: ControllerOptions,
    state: Mutex<ControllerState<F>>,
}

impl<F: ResourceSchema> ResourceListController<F> {
    pub fn new(gateway: Arc<dyn ResourceGateway<F>>) -> Arc<Self> {
        Self::with_options(gateway, ControllerOptions::default())
    }

    pub fn with_options(
        gateway: Arc<dyn ResourceGateway<F>>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let filter = FilterState {
            page_size: options.page_size,
            ..FilterState::default()
        };
        Arc::new(Self {
            gateway,
            options,
            state: Mutex::new(ControllerState {
                collection: Vec::new(),
                filter,
                in_flight: HashSet::new(),
                pending_creates: HashSet::new(),
                pending_load: None,
                next_load_ticket: 0,
                last_error: None,
                detached: false,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, ControllerState<F>> {
        lock(&self.state)
    }

    /// Fetches the whole collection and replaces the local copy. A load that
    /// starts while another is pending shares its request and outcome.
    pub async fn load(&self) -> ControllerResult<()> {
        self.load_issued_after(None).await
    }

    /// Like `load`, but only joins a pending load whose ticket is newer than
    /// `floor`. An older pending load is superseded by a fresh request and
    /// its outcome is no longer applied.
    async fn load_issued_after(&self, floor: Option<u64>) -> ControllerResult<()> {
        let (ticket, pending) = {
            let mut state = self.state();
            if state.detached {
                return Err(ControllerError::Detached);
            }
            let joinable = match &state.pending_load {
                Some((ticket, pending)) if floor.map_or(true, |floor| *ticket > floor) => {
                    Some((*ticket, pending.clone()))
                }
                _ => None,
            };
            match joinable {
                Some(joined) => {
                    debug!(resource = %F::KIND, "controller: joining pending load");
                    joined
                }
                None => {
                    let gateway = Arc::clone(&self.gateway);
                    let timeout = self.options.request_timeout;
                    let pending = async move { bounded(timeout, gateway.list()).await }
                        .boxed()
                        .shared();
                    state.next_load_ticket += 1;
                    let ticket = state.next_load_ticket;
                    state.pending_load = Some((ticket, pending.clone()));
                    (ticket, pending)
                }
            }
        };

        let outcome = pending.await;

        let mut state = self.state();
        // Only the first waiter to observe completion applies the outcome.
        let owner = matches!(&state.pending_load, Some((current, _)) if *current == ticket);
        if owner {
            state.pending_load = None;
        }
        if state.detached {
            debug!(resource = %F::KIND, "controller: ignoring load completion after detach");
            return Err(ControllerError::Detached);
        }

        match outcome {
            Ok(records) => {
                if owner {
                    info!(resource = %F::KIND, count = records.len(), "controller: collection loaded");
                    state.collection = records;
                    state.last_error = None;
                    state.reclamp();
                }
                Ok(())
            }
            Err(cause) => {
                let err = ControllerError::FetchFailed(cause);
                if owner {
                    warn!(resource = %F::KIND, "controller: load failed, keeping stale collection: {err}");
                    state.record_failure(&err);
                }
                Err(err)
            }
        }
    }

    /// Submits a new entity. Returns the created record, or `None` when the
    /// server confirmed creation without an entity that a fresh reload could
    /// find. A confirmed create never fails because of that reload.
    pub async fn create(&self, draft: F) -> ControllerResult<Option<Record<F>>> {
        let draft_key = serde_json::to_string(&draft)
            .map_err(|e| ControllerError::CreateFailed(GatewayError::Decode(e.to_string())))?;

        let claim = {
            let mut state = self.state();
            if state.detached {
                return Err(ControllerError::Detached);
            }
            if !state.pending_creates.insert(draft_key.clone()) {
                return Err(ControllerError::DuplicateSubmission);
            }
            Claim::new(&self.state, ClaimKey::Draft(draft_key))
        };

        let outcome = bounded(self.options.request_timeout, self.gateway.create(&draft)).await;

        let (acknowledged, issued) = {
            let mut state = self.state();
            claim.settle(&mut state);
            if state.detached {
                return Err(ControllerError::Detached);
            }
            match outcome {
                Ok(CreateOutcome::Created(record)) => {
                    match state.position(&record.id) {
                        Some(pos) => state.collection[pos] = record.clone(),
                        None => state.collection.push(record.clone()),
                    }
                    state.reclamp();
                    info!(resource = %F::KIND, id = %record.id, "controller: created");
                    return Ok(Some(record));
                }
                Ok(CreateOutcome::Acknowledged(id)) => (id, state.next_load_ticket),
                Err(cause) => {
                    let err = ControllerError::CreateFailed(cause);
                    warn!(resource = %F::KIND, "controller: create failed: {err}");
                    state.record_failure(&err);
                    return Err(err);
                }
            }
        };

        info!(
            resource = %F::KIND,
            id = ?acknowledged,
            "controller: create acknowledged without entity, reloading"
        );
        // Loads issued before the create was confirmed cannot contain it.
        match self.load_issued_after(Some(issued)).await {
            Ok(()) => Ok(acknowledged.and_then(|id| self.get(&id))),
            Err(ControllerError::Detached) => Err(ControllerError::Detached),
            Err(err) => {
                warn!(
                    resource = %F::KIND,
                    id = ?acknowledged,
                    "controller: created, but reload failed: {err}"
                );
                self.state().record_failure(&err);
                Ok(None)
            }
        }
    }

    /// Replaces the fields of `id` in place once the server confirms.
    pub async fn update(&self, id: &ResourceId, draft: F) -> ControllerResult<Record<F>> {
        let claim = self.claim_row(id)?;

        let outcome = bounded(
            self.options.request_timeout,
            self.gateway.update(id, &draft),
        )
        .await;

        let mut state = self.state();
        claim.settle(&mut state);
        if state.detached {
            return Err(ControllerError::Detached);
        }
        match outcome {
            Ok(record) => {
                if let Some(pos) = state.position(id) {
                    state.collection[pos].fields = record.fields.clone();
                }
                state.reclamp();
                info!(resource = %F::KIND, id = %id, "controller: updated");
                Ok(Record::new(id.clone(), record.fields))
            }
            Err(cause) => {
                let err = ControllerError::UpdateFailed {
                    id: id.clone(),
                    cause,
                };
                warn!(resource = %F::KIND, id = %id, "controller: update failed: {err}");
                state.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Deletes `id`. Confirmation is the caller's responsibility.
    pub async fn remove(&self, id: &ResourceId) -> ControllerResult<()> {
        let claim = self.claim_row(id)?;

        let outcome = bounded(self.options.request_timeout, self.gateway.delete(id)).await;

        let mut state = self.state();
        claim.settle(&mut state);
        if state.detached {
            return Err(ControllerError::Detached);
        }
        match outcome {
            Ok(()) => {
                state.collection.retain(|record| &record.id != id);
                state.reclamp();
                info!(resource = %F::KIND, id = %id, "controller: removed");
                Ok(())
            }
            Err(cause) => {
                let err = ControllerError::DeleteFailed {
                    id: id.clone(),
                    cause,
                };
                warn!(resource = %F::KIND, id = %id, "controller: delete failed: {err}");
                state.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Flips boolean `flag` on `id`. The flip is shown immediately and undone
    /// if the server rejects it. A second mutation on the same row while this
    /// one is pending is rejected with `Conflict`.
    pub async fn toggle(&self, id: &ResourceId, flag: &str) -> ControllerResult<Record<F>> {
        let (claim, flipped) = {
            let mut state = self.state();
            if state.detached {
                return Err(ControllerError::Detached);
            }
            let pos = state
                .position(id)
                .ok_or_else(|| ControllerError::NotFound(id.clone()))?;
            let current = state.collection[pos].fields.flag(flag).ok_or_else(|| {
                ControllerError::Invalid(FieldErrors::from_iter([(
                    flag,
                    "not a toggleable field",
                )]))
            })?;
            if !state.in_flight.insert(id.clone()) {
                return Err(ControllerError::Conflict(id.clone()));
            }
            state.collection[pos].fields.set_flag(flag, !current);
            let flipped = state.collection[pos].fields.clone();
            let claim = Claim::new(&self.state, ClaimKey::Resource(id.clone()))
                .with_revert(flag, current);
            (claim, flipped)
        };

        let timeout = self.options.request_timeout;
        let outcome = match bounded(timeout, self.gateway.toggle(id, flag)).await {
            Err(GatewayError::Unsupported) => {
                debug!(resource = %F::KIND, id = %id, "controller: no toggle route, updating instead");
                bounded(timeout, self.gateway.update(id, &flipped)).await
            }
            other => other,
        };

        let mut state = self.state();
        let revert = claim.settle(&mut state);
        if state.detached {
            return Err(ControllerError::Detached);
        }
        match outcome {
            Ok(record) => {
                if let Some(pos) = state.position(id) {
                    state.collection[pos].fields = record.fields.clone();
                }
                info!(
                    resource = %F::KIND,
                    id = %id,
                    flag,
                    value = ?record.fields.flag(flag),
                    "controller: toggled"
                );
                Ok(Record::new(id.clone(), record.fields))
            }
            Err(cause) => {
                if let Some(revert) = revert {
                    state.revert_flag(id, &revert);
                }
                let err = ControllerError::UpdateFailed {
                    id: id.clone(),
                    cause,
                };
                warn!(resource = %F::KIND, id = %id, flag, "controller: toggle failed, reverted: {err}");
                state.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Re-reads a single entity and replaces it in place. An entity the
    /// server no longer knows is dropped from the collection.
    pub async fn refresh(&self, id: &ResourceId) -> ControllerResult<Record<F>> {
        let claim = self.claim_row(id)?;

        let outcome = bounded(self.options.request_timeout, self.gateway.get(id)).await;

        let mut state = self.state();
        claim.settle(&mut state);
        if state.detached {
            return Err(ControllerError::Detached);
        }
        match outcome {
            Ok(record) => {
                if let Some(pos) = state.position(id) {
                    state.collection[pos].fields = record.fields.clone();
                }
                state.reclamp();
                Ok(Record::new(id.clone(), record.fields))
            }
            Err(cause) => {
                if cause == GatewayError::NotFound {
                    state.collection.retain(|record| &record.id != id);
                    state.reclamp();
                }
                let err = ControllerError::RefreshFailed {
                    id: id.clone(),
                    cause,
                };
                warn!(resource = %F::KIND, id = %id, "controller: refresh failed: {err}");
                state.record_failure(&err);
                Err(err)
            }
        }
    }

    fn claim_row(&self, id: &ResourceId) -> ControllerResult<Claim<'_, F>> {
        let mut state = self.state();
        if state.detached {
            return Err(ControllerError::Detached);
        }
        if state.position(id).is_none() {
            return Err(ControllerError::NotFound(id.clone()));
        }
        if !state.in_flight.insert(id.clone()) {
            return Err(ControllerError::Conflict(id.clone()));
        }
        Ok(Claim::new(&self.state, ClaimKey::Resource(id.clone())))
    }

    /// Merges `update` into the filter state and returns the resulting page.
    pub fn set_filter(&self, update: FilterUpdate) -> VisibleSlice<F> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.filter.apply(update);
        visible_slice(&state.collection, &mut state.filter)
    }

    pub fn visible_slice(&self) -> VisibleSlice<F> {
        let mut guard = self.state();
        let state = &mut *guard;
        visible_slice(&state.collection, &mut state.filter)
    }

    pub fn filter(&self) -> FilterState {
        self.state().filter.clone()
    }

    pub fn snapshot(&self) -> Vec<Record<F>> {
        self.state().collection.clone()
    }

    pub fn get(&self, id: &ResourceId) -> Option<Record<F>> {
        let state = self.state();
        state.position(id).map(|pos| state.collection[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.state().collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().collection.is_empty()
    }

    pub fn is_in_flight(&self, id: &ResourceId) -> bool {
        self.state().in_flight.contains(id)
    }

    pub fn last_error(&self) -> Option<ControllerError> {
        self.state().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state().last_error = None;
    }

    /// Tears the controller down. Responses still in flight are discarded on
    /// arrival and their operations resolve to `Detached`.
    pub fn detach(&self) {
        let mut state = self.state();
        state.detached = true;
        state.pending_load = None;
        info!(resource = %F::KIND, in_flight = state.in_flight.len(), "controller: detached");
    }

    pub fn is_detached(&self) -> bool {
        self.state().detached
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
