//! Access request storage contract
//!
//! Persistence is a collaborator of the validation core, not part of it: a
//! request is validated first, then handed to a [`DynamicAccess`]
//! implementation. The in-memory implementation backs tests and small
//! deployments; production backends implement the same trait.

use crate::error::{AccessError, Result};
use crate::request::{
    AccessRequest, AccessRequestFilter, AccessRequestUpdate, AccessRequestV1,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Service managing stored access requests
#[async_trait]
pub trait DynamicAccess: Send + Sync {
    /// Store a new access request
    async fn create_access_request(&self, req: AccessRequestV1) -> Result<()>;

    /// Apply a resolution to an existing access request
    async fn set_access_request_state(&self, update: AccessRequestUpdate) -> Result<()>;

    /// Get all access requests matching a filter
    async fn get_access_requests(
        &self,
        filter: &AccessRequestFilter,
    ) -> Result<Vec<AccessRequestV1>>;

    /// Delete an access request
    async fn delete_access_request(&self, id: Uuid) -> Result<()>;
}

/// Load a specific access request by id
pub async fn get_access_request(
    acc: &dyn DynamicAccess,
    id: Uuid,
) -> Result<AccessRequestV1> {
    let filter = AccessRequestFilter {
        id: id.to_string(),
        ..Default::default()
    };
    let mut reqs = acc.get_access_requests(&filter).await?;
    if reqs.is_empty() {
        return Err(AccessError::not_found(format!(
            "no access request matching {:?}",
            id.to_string()
        )));
    }
    Ok(reqs.swap_remove(0))
}

/// In-memory access request store
pub struct InMemoryDynamicAccess {
    requests: Arc<RwLock<HashMap<Uuid, AccessRequestV1>>>,
}

impl InMemoryDynamicAccess {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryDynamicAccess {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DynamicAccess for InMemoryDynamicAccess {
    async fn create_access_request(&self, mut req: AccessRequestV1) -> Result<()> {
        req.check_and_set_defaults()?;
        let mut requests = self.requests.write().await;
        if requests.contains_key(&req.id) {
            return Err(AccessError::bad_parameter(format!(
                "access request {:?} already exists",
                req.id.to_string()
            )));
        }
        debug!(id = %req.id, user = req.user.as_str(), "storing access request");
        requests.insert(req.id, req);
        Ok(())
    }

    async fn set_access_request_state(&self, update: AccessRequestUpdate) -> Result<()> {
        update.check()?;
        let id = Uuid::parse_str(&update.request_id).map_err(|_| {
            AccessError::bad_parameter(format!("invalid request id {:?}", update.request_id))
        })?;

        let mut requests = self.requests.write().await;
        let req = requests.get_mut(&id).ok_or_else(|| {
            AccessError::not_found(format!(
                "no access request matching {:?}",
                update.request_id
            ))
        })?;

        req.set_state(update.state)?;
        req.set_resolve_reason(update.reason);
        req.set_resolve_annotations(update.annotations);
        if !update.roles.is_empty() {
            req.set_roles(update.roles);
        }
        // System annotations stop being meaningful once the request leaves
        // PENDING.
        if !req.state.is_pending() {
            req.set_system_annotations(Default::default());
        }
        Ok(())
    }

    async fn get_access_requests(
        &self,
        filter: &AccessRequestFilter,
    ) -> Result<Vec<AccessRequestV1>> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|req| filter.matches(*req))
            .cloned()
            .collect())
    }

    async fn delete_access_request(&self, id: Uuid) -> Result<()> {
        let mut requests = self.requests.write().await;
        if requests.remove(&id).is_none() {
            return Err(AccessError::not_found(format!(
                "no access request matching {:?}",
                id.to_string()
            )));
        }
        Ok(())
    }
}
