//! Access request records
//!
//! An access request is a user's ask for temporary possession of roles beyond
//! those permanently held. It is constructed once (state defaults to
//! PENDING), mutated in place by validation (role list expansion, system
//! annotations), then handed to storage. A separate resolution workflow later
//! moves it to APPROVED or DENIED and sets the resolve fields.

use crate::error::{AccessError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Annotation key to values
pub type Annotations = HashMap<String, Vec<String>>;

/// Approval state of an access request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestState {
    /// Unset; promoted to PENDING on creation
    #[default]
    None,
    /// Awaiting resolution
    Pending,
    /// Granted by a resolver
    Approved,
    /// Rejected by a resolver; terminal
    Denied,
}

impl RequestState {
    pub fn is_none(&self) -> bool {
        *self == Self::None
    }

    pub fn is_pending(&self) -> bool {
        *self == Self::Pending
    }

    pub fn is_approved(&self) -> bool {
        *self == Self::Approved
    }

    pub fn is_denied(&self) -> bool {
        *self == Self::Denied
    }

    /// Interpret a string representation of a request state
    pub fn parse(val: &str) -> Result<Self> {
        match val {
            "NONE" => Ok(Self::None),
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "DENIED" => Ok(Self::Denied),
            other => Err(AccessError::bad_parameter(format!(
                "unknown request state: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        };
        f.write_str(s)
    }
}

/// Access request capability consumed and produced by validation
///
/// System annotations are computed by the validation core and only carry
/// meaning while the request is PENDING; resolve reason and resolve
/// annotations belong to the resolution workflow and are never written by
/// this core.
pub trait AccessRequest {
    /// Unique request id
    fn id(&self) -> Uuid;

    /// Name of the requesting user
    fn user(&self) -> &str;

    /// Requested role names
    fn roles(&self) -> &[String];

    /// Override the requested role names
    fn set_roles(&mut self, roles: Vec<String>);

    /// Current approval state
    fn state(&self) -> RequestState;

    /// Transition the approval state
    ///
    /// DENIED is terminal: once denied, only a repeated DENIED transition is
    /// accepted; any other target state is a `BadParameter` error.
    fn set_state(&mut self, state: RequestState) -> Result<()>;

    /// Time the request was registered
    fn creation_time(&self) -> DateTime<Utc>;

    /// Set the registration time
    fn set_creation_time(&mut self, t: DateTime<Utc>);

    /// Upper limit for which granted access may be considered active
    fn access_expiry(&self) -> Option<DateTime<Utc>>;

    /// Set the access expiry
    fn set_access_expiry(&mut self, t: DateTime<Utc>);

    /// Reason supplied by the requester
    fn request_reason(&self) -> &str;

    /// Set the requester's reason
    fn set_request_reason(&mut self, reason: String);

    /// Reason supplied by the resolver
    fn resolve_reason(&self) -> &str;

    /// Set the resolver's reason
    fn set_resolve_reason(&mut self, reason: String);

    /// Annotations supplied by the resolver
    fn resolve_annotations(&self) -> &Annotations;

    /// Set the resolver's annotations
    fn set_resolve_annotations(&mut self, annotations: Annotations);

    /// Annotations computed by validation while the request is pending
    fn system_annotations(&self) -> &Annotations;

    /// Set the computed system annotations
    fn set_system_annotations(&mut self, annotations: Annotations);
}

/// Canonical access request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequestV1 {
    /// Unique request id
    pub id: Uuid,

    /// Requesting user name
    pub user: String,

    /// Requested role names
    pub roles: Vec<String>,

    /// Approval state
    #[serde(default)]
    pub state: RequestState,

    /// Registration time
    pub created: DateTime<Utc>,

    /// Upper limit for which granted access may be considered active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    /// Requester-supplied reason
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_reason: String,

    /// Resolver-supplied reason
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resolve_reason: String,

    /// Resolver-supplied annotations
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub resolve_annotations: Annotations,

    /// Annotations computed by validation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub system_annotations: Annotations,
}

impl AccessRequestV1 {
    /// Assemble a new pending access request
    pub fn new(user: impl Into<String>, roles: Vec<String>) -> Result<Self> {
        let mut req = Self {
            id: Uuid::new_v4(),
            user: user.into(),
            roles,
            state: RequestState::None,
            created: Utc::now(),
            expires: None,
            request_reason: String::new(),
            resolve_reason: String::new(),
            resolve_annotations: Annotations::new(),
            system_annotations: Annotations::new(),
        };
        req.check_and_set_defaults()?;
        Ok(req)
    }

    /// Promote an unset state to PENDING and validate the record
    pub fn check_and_set_defaults(&mut self) -> Result<()> {
        if self.state.is_none() {
            self.set_state(RequestState::Pending)?;
        }
        self.check()
    }

    /// Structural validation applied at persistence time
    ///
    /// An in-flight request may carry a temporarily empty role list during
    /// wildcard expansion; by the time it is stored it must name at least one
    /// role.
    pub fn check(&self) -> Result<()> {
        if self.user.is_empty() {
            return Err(AccessError::bad_parameter(
                "access request user name not set",
            ));
        }
        if self.roles.is_empty() {
            return Err(AccessError::bad_parameter(
                "access request does not specify any roles",
            ));
        }
        if self.state.is_pending() {
            if !self.resolve_reason.is_empty() {
                return Err(AccessError::bad_parameter(
                    "pending requests cannot include resolve reason",
                ));
            }
            if !self.resolve_annotations.is_empty() {
                return Err(AccessError::bad_parameter(
                    "pending requests cannot include resolve annotations",
                ));
            }
        }
        Ok(())
    }
}

impl AccessRequest for AccessRequestV1 {
    fn id(&self) -> Uuid {
        self.id
    }

    fn user(&self) -> &str {
        &self.user
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn set_roles(&mut self, roles: Vec<String>) {
        self.roles = roles;
    }

    fn state(&self) -> RequestState {
        self.state
    }

    fn set_state(&mut self, state: RequestState) -> Result<()> {
        if self.state.is_denied() {
            if state.is_denied() {
                return Ok(());
            }
            return Err(AccessError::bad_parameter(format!(
                "cannot set request state {} (already denied)",
                state
            )));
        }
        self.state = state;
        Ok(())
    }

    fn creation_time(&self) -> DateTime<Utc> {
        self.created
    }

    fn set_creation_time(&mut self, t: DateTime<Utc>) {
        self.created = t;
    }

    fn access_expiry(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    fn set_access_expiry(&mut self, t: DateTime<Utc>) {
        self.expires = Some(t);
    }

    fn request_reason(&self) -> &str {
        &self.request_reason
    }

    fn set_request_reason(&mut self, reason: String) {
        self.request_reason = reason;
    }

    fn resolve_reason(&self) -> &str {
        &self.resolve_reason
    }

    fn set_resolve_reason(&mut self, reason: String) {
        self.resolve_reason = reason;
    }

    fn resolve_annotations(&self) -> &Annotations {
        &self.resolve_annotations
    }

    fn set_resolve_annotations(&mut self, annotations: Annotations) {
        self.resolve_annotations = annotations;
    }

    fn system_annotations(&self) -> &Annotations {
        &self.system_annotations
    }

    fn set_system_annotations(&mut self, annotations: Annotations) {
        self.system_annotations = annotations;
    }
}

// key values for map encoding of request filters
const KEY_ID: &str = "id";
const KEY_USER: &str = "user";
const KEY_STATE: &str = "state";

/// Filter over stored access requests
///
/// Empty fields (and a NONE state) match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequestFilter {
    /// Match a specific request id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Match requests by a specific user
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    /// Match requests in a specific state
    #[serde(default, skip_serializing_if = "RequestState::is_none")]
    pub state: RequestState,
}

impl AccessRequestFilter {
    /// Check if a given access request matches this filter
    pub fn matches(&self, req: &dyn AccessRequest) -> bool {
        if !self.id.is_empty() && req.id().to_string() != self.id {
            return false;
        }
        if !self.user.is_empty() && req.user() != self.user {
            return false;
        }
        if !self.state.is_none() && req.state() != self.state {
            return false;
        }
        true
    }

    /// Encode the filter as a string map, omitting unset fields
    pub fn into_map(&self) -> HashMap<String, String> {
        let mut m = HashMap::new();
        if !self.id.is_empty() {
            m.insert(KEY_ID.to_string(), self.id.clone());
        }
        if !self.user.is_empty() {
            m.insert(KEY_USER.to_string(), self.user.clone());
        }
        if !self.state.is_none() {
            m.insert(KEY_STATE.to_string(), self.state.to_string());
        }
        m
    }

    /// Decode a filter from a string map
    pub fn from_map(m: &HashMap<String, String>) -> Result<Self> {
        let mut filter = Self::default();
        for (key, val) in m {
            match key.as_str() {
                KEY_ID => filter.id = val.clone(),
                KEY_USER => filter.user = val.clone(),
                KEY_STATE => filter.state = RequestState::parse(val)?,
                other => {
                    return Err(AccessError::bad_parameter(format!(
                        "unknown filter key {}",
                        other
                    )));
                }
            }
        }
        Ok(filter)
    }
}

/// Parameters of a resolution applied to a stored request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRequestUpdate {
    /// Id of the request being resolved
    pub request_id: String,

    /// Target state
    pub state: RequestState,

    /// Resolver-supplied reason
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Resolver-supplied annotations
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: Annotations,

    /// Role override, only permitted when approving
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl AccessRequestUpdate {
    /// Validate the update parameters
    pub fn check(&self) -> Result<()> {
        if self.request_id.is_empty() {
            return Err(AccessError::bad_parameter("missing request id"));
        }
        if self.state.is_none() {
            return Err(AccessError::bad_parameter("missing request state"));
        }
        if !self.roles.is_empty() && !self.state.is_approved() {
            return Err(AccessError::bad_parameter(format!(
                "cannot override roles when setting state: {}",
                self.state
            )));
        }
        Ok(())
    }
}
