//! Role and user entities
//!
//! Roles and users are read-only inputs to request validation; they are owned
//! and mutated by role/user management elsewhere. Both are modeled as narrow
//! capability traits with one canonical record type each, so a future schema
//! revision can be added as another implementation without touching the
//! validation core.

use crate::traits::{TraitMapping, Traits};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a request must carry a non-empty reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStrategy {
    /// Reason is accepted but not required
    #[default]
    Optional,
    /// A non-empty request reason is mandatory
    Reason,
    /// Requests must always be filed to obtain the role
    Always,
}

/// Role options relevant to access requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOptions {
    /// Request strategy governing the reason requirement
    #[serde(default)]
    pub request_access: RequestStrategy,
}

/// One side (allow or deny) of a role's access request policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRequestConditions {
    /// Role name rule patterns (literal, glob, or anchored regex)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Claim-to-role mappings expanded against the requesting user's traits
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims_to_roles: Vec<TraitMapping>,

    /// Annotation key to templated values, attached to pending requests
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, Vec<String>>,
}

/// Which side of a role's access request policy to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Allow,
    Deny,
}

/// Role capability consumed by request validation
pub trait Role {
    /// Role name
    fn name(&self) -> &str;

    /// Options governing access requests against this role
    fn options(&self) -> &RoleOptions;

    /// Allow or deny access request conditions
    fn conditions(&self, kind: ConditionKind) -> &AccessRequestConditions;
}

/// Canonical role record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleV1 {
    /// Role name
    pub name: String,

    /// Role options
    #[serde(default)]
    pub options: RoleOptions,

    /// Allow conditions
    #[serde(default)]
    pub allow: AccessRequestConditions,

    /// Deny conditions
    #[serde(default)]
    pub deny: AccessRequestConditions,
}

impl RoleV1 {
    /// Create a role with empty conditions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the allow conditions
    pub fn with_allow(mut self, allow: AccessRequestConditions) -> Self {
        self.allow = allow;
        self
    }

    /// Set the deny conditions
    pub fn with_deny(mut self, deny: AccessRequestConditions) -> Self {
        self.deny = deny;
        self
    }

    /// Set the request strategy
    pub fn with_request_access(mut self, strategy: RequestStrategy) -> Self {
        self.options.request_access = strategy;
        self
    }
}

impl Role for RoleV1 {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &RoleOptions {
        &self.options
    }

    fn conditions(&self, kind: ConditionKind) -> &AccessRequestConditions {
        match kind {
            ConditionKind::Allow => &self.allow,
            ConditionKind::Deny => &self.deny,
        }
    }
}

/// User capability consumed by request validation
pub trait User {
    /// User name
    fn name(&self) -> &str;

    /// Names of the roles the user permanently holds
    fn roles(&self) -> &[String];

    /// Trait bindings, e.g. sourced from an identity provider
    fn traits(&self) -> &Traits;
}

/// Canonical user record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserV1 {
    /// User name
    pub name: String,

    /// Permanently held role names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Trait name to bound values
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub traits: Traits,
}

impl UserV1 {
    /// Create a user holding the given roles
    pub fn new(name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            roles,
            traits: Traits::new(),
        }
    }

    /// Bind values to a trait
    pub fn with_trait(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.traits.insert(name.into(), values);
        self
    }
}

impl User for UserV1 {
    fn name(&self) -> &str {
        &self.name
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn traits(&self) -> &Traits {
        &self.traits
    }
}
