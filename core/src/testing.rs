//! Test doubles shared by the unit tests of this crate

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{
    ClaimPhase, ClaimStatus, ClusterBackend, ComputeUnitSpec, StorageClaimSpec, UnitStatus,
};
use crate::error::BackendError;

#[derive(Debug, Default)]
struct MockObject {
    polls: usize,
    deleting: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    claims: HashMap<String, MockObject>,
    units: HashMap<String, MockObject>,
    claim_creates: usize,
    unit_creates: usize,
    gets: usize,
}

/// In-memory backend with scripted readiness and fault injection
///
/// Objects become ready on the `ready_after`-th status check and disappear
/// on the `gone_after`-th check after their delete call.
pub(crate) struct MockBackend {
    state: Mutex<MockState>,
    ready_after: usize,
    gone_after: usize,
    fail_unit_create: Option<usize>,
    panic_on_unit_create: Option<String>,
    fail_deletes: bool,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            ready_after: 1,
            gone_after: 1,
            fail_unit_create: None,
            panic_on_unit_create: None,
            fail_deletes: false,
        }
    }

    pub(crate) fn ready_after(mut self, polls: usize) -> Self {
        self.ready_after = polls;
        self
    }

    pub(crate) fn gone_after(mut self, polls: usize) -> Self {
        self.gone_after = polls;
        self
    }

    pub(crate) fn never_ready(self) -> Self {
        self.ready_after(usize::MAX)
    }

    /// Fail the `nth` compute unit create call (1-based) with a generic error
    pub(crate) fn fail_unit_create(mut self, nth: usize) -> Self {
        self.fail_unit_create = Some(nth);
        self
    }

    /// Panic inside the create call of the compute unit named `name`
    pub(crate) fn panic_on_unit_create(mut self, name: &str) -> Self {
        self.panic_on_unit_create = Some(name.to_string());
        self
    }

    pub(crate) fn fail_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    /// Insert a ready claim and unit named `name`
    pub(crate) fn preload(self, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.claims.insert(
                name.to_string(),
                MockObject {
                    polls: self.ready_after,
                    deleting: None,
                },
            );
            state.units.insert(
                name.to_string(),
                MockObject {
                    polls: self.ready_after,
                    deleting: None,
                },
            );
        }
        self
    }

    pub(crate) fn claim_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().claims.contains_key(name)
    }

    pub(crate) fn unit_exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().units.contains_key(name)
    }

    pub(crate) fn create_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.claim_creates + state.unit_creates
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    fn create(&self, claims: bool, name: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        let nth = if claims {
            state.claim_creates += 1;
            state.claim_creates
        } else {
            state.unit_creates += 1;
            state.unit_creates
        };

        if !claims && self.fail_unit_create == Some(nth) {
            return Err(BackendError::other(format!("admission denied for {name}")));
        }

        let objects = if claims {
            &mut state.claims
        } else {
            &mut state.units
        };
        if objects.contains_key(name) {
            return Err(BackendError::already_exists(format!("{name} already exists")));
        }
        objects.insert(name.to_string(), MockObject::default());
        Ok(())
    }

    /// Returns whether the object is ready
    fn get(&self, claims: bool, name: &str) -> Result<bool, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        let objects = if claims {
            &mut state.claims
        } else {
            &mut state.units
        };

        let object = objects
            .get_mut(name)
            .ok_or_else(|| BackendError::not_found(format!("{name} not found")))?;

        if let Some(polls) = object.deleting {
            let polls = polls + 1;
            if polls >= self.gone_after {
                objects.remove(name);
                return Err(BackendError::not_found(format!("{name} not found")));
            }
            object.deleting = Some(polls);
            return Ok(true);
        }

        object.polls = object.polls.saturating_add(1);
        Ok(object.polls >= self.ready_after)
    }

    fn delete(&self, claims: bool, name: &str) -> Result<(), BackendError> {
        if self.fail_deletes {
            return Err(BackendError::other(format!("cannot delete {name}")));
        }

        let mut state = self.state.lock().unwrap();
        let objects = if claims {
            &mut state.claims
        } else {
            &mut state.units
        };
        let object = objects
            .get_mut(name)
            .ok_or_else(|| BackendError::not_found(format!("{name} not found")))?;
        object.deleting.get_or_insert(0);
        Ok(())
    }
}

#[async_trait]
impl ClusterBackend for MockBackend {
    fn backend_name(&self) -> &str {
        "mock"
    }

    async fn create_storage_claim(&self, spec: &StorageClaimSpec) -> Result<(), BackendError> {
        self.create(true, &spec.name)
    }

    async fn get_storage_claim(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<ClaimStatus, BackendError> {
        let bound = self.get(true, name)?;
        Ok(ClaimStatus {
            phase: if bound {
                ClaimPhase::Bound
            } else {
                ClaimPhase::Pending
            },
        })
    }

    async fn delete_storage_claim(&self, _namespace: &str, name: &str) -> Result<(), BackendError> {
        self.delete(true, name)
    }

    async fn create_compute_unit(&self, spec: &ComputeUnitSpec) -> Result<(), BackendError> {
        // Before taking the lock, so the state mutex is not poisoned
        if self.panic_on_unit_create.as_deref() == Some(spec.name.as_str()) {
            panic!("compute unit create crashed for {}", spec.name);
        }
        self.create(false, &spec.name)
    }

    async fn get_compute_unit(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<UnitStatus, BackendError> {
        let ready = self.get(false, name)?;
        Ok(UnitStatus { ready })
    }

    async fn delete_compute_unit(&self, _namespace: &str, name: &str) -> Result<(), BackendError> {
        self.delete(false, name)
    }
}
