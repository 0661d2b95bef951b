//! Dynamic RBAC core: validation of temporary role escalation requests
//!
//! Users permanently hold a set of roles; each role may additionally grant or
//! deny the right to *request* further roles for a limited time. This crate
//! implements the policy evaluation behind that workflow: rule accumulation
//! across held roles, deny-overrides-allow precedence, trait-template
//! expansion, wildcard resolution, and system annotation attachment.
//!
//! # Example
//!
//! ```ignore
//! use dynamic_access::{validate_access_request, AccessRequestV1};
//!
//! let mut req = AccessRequestV1::new("alice", vec!["dev-infra".to_string()])?;
//! validate_access_request(&getter, &mut req, false)?;
//! // req now carries its system annotations and is ready to persist
//! ```
//!
//! Resolution (approve/deny), wire serialization, the command surface, and
//! credential issuance are external collaborators; see [`store::DynamicAccess`]
//! for the persistence seam.

pub mod error;
pub mod matcher;
pub mod request;
pub mod role;
pub mod store;
pub mod traits;
pub mod validator;

pub use error::{AccessError, Result};
pub use matcher::Matcher;
pub use request::{
    AccessRequest, AccessRequestFilter, AccessRequestUpdate, AccessRequestV1, Annotations,
    RequestState,
};
pub use role::{
    AccessRequestConditions, ConditionKind, RequestStrategy, Role, RoleOptions, RoleV1, User,
    UserV1,
};
pub use store::{get_access_request, DynamicAccess, InMemoryDynamicAccess};
pub use traits::{expand_template, TraitMapping, Traits};
pub use validator::{
    validate_access_request, RequestValidator, UserAndRoleGetter, WILDCARD_REQUEST,
};
