//! Access request validation
//!
//! Orchestrates policy evaluation for role escalation requests:
//!
//! ```text
//! Request → user lookup → per-role rule accumulation → wildcard expansion
//!             ↓                    ↓                        ↓
//!         [getter]        [RequestValidator]        per-role admission
//!                                                          ↓
//!                                            system annotation attachment
//! ```
//!
//! Validation is synchronous and owns no shared state; each invocation
//! allocates its own [`RequestValidator`], so independent requests may be
//! validated concurrently. A failed validation leaves the request in an
//! unspecified partially-mutated state and it must not be persisted.

use crate::error::{AccessError, Result};
use crate::matcher::Matcher;
use crate::request::{AccessRequest, Annotations, RequestState};
use crate::role::{ConditionKind, RequestStrategy, Role, User};
use crate::traits::{expand_template, Traits};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Role list marker meaning "every role the user may request"
pub const WILDCARD_REQUEST: &str = "*";

/// Lookup collaborator feeding validation
///
/// Each call either returns a value or fails with `NotFound`; the
/// implementation may be backed by a network store, in which case the
/// caller's own deadline bounds the whole validation.
pub trait UserAndRoleGetter {
    /// Fetch a user by name
    fn get_user(&self, name: &str) -> Result<Box<dyn User>>;

    /// Fetch a role by name
    fn get_role(&self, name: &str) -> Result<Box<dyn Role>>;

    /// List every role in the system
    fn get_roles(&self) -> Result<Vec<Box<dyn Role>>>;
}

#[derive(Default)]
struct RuleSet {
    allow: Vec<Matcher>,
    deny: Vec<Matcher>,
}

#[derive(Default)]
struct AnnotationRules {
    allow: Annotations,
    deny: Annotations,
}

/// Accumulator for the allow/deny rules contributed by a set of roles
///
/// Pushing roles is commutative: each push only adds to unordered
/// accumulators, so the final answers do not depend on push order.
pub struct RequestValidator {
    traits: Traits,
    state: RequestState,
    roles: RuleSet,
    annotations: AnnotationRules,
}

impl RequestValidator {
    /// Create an empty accumulator for a user's traits and a request state
    pub fn new(traits: Traits, state: RequestState) -> Self {
        Self {
            traits,
            state,
            roles: RuleSet::default(),
            annotations: AnnotationRules::default(),
        }
    }

    /// Incorporate one role's access request policy
    ///
    /// Deny rules are accumulated before allow rules; annotation templates
    /// are only expanded while the request is PENDING, since resolved
    /// requests never need them. A malformed role pattern or trait mapping
    /// aborts the whole operation.
    pub fn push(&mut self, role: &dyn Role) -> Result<()> {
        let deny = role.conditions(ConditionKind::Deny);
        for pattern in &deny.roles {
            self.roles.deny.push(Matcher::new(pattern)?);
        }
        for mapping in &deny.claims_to_roles {
            for pattern in mapping.expand(&self.traits)? {
                self.roles.deny.push(Matcher::new(&pattern)?);
            }
        }
        if self.state.is_pending() {
            Self::accumulate_annotations(
                &mut self.annotations.deny,
                &deny.annotations,
                &self.traits,
                role.name(),
            );
        }

        let allow = role.conditions(ConditionKind::Allow);
        for pattern in &allow.roles {
            self.roles.allow.push(Matcher::new(pattern)?);
        }
        for mapping in &allow.claims_to_roles {
            for pattern in mapping.expand(&self.traits)? {
                self.roles.allow.push(Matcher::new(&pattern)?);
            }
        }
        if self.state.is_pending() {
            Self::accumulate_annotations(
                &mut self.annotations.allow,
                &allow.annotations,
                &self.traits,
                role.name(),
            );
        }
        Ok(())
    }

    /// Expand a role's annotation templates into an accumulator
    ///
    /// A template that fails to interpolate, or references an unbound trait,
    /// contributes nothing; the rest of the role's policy still applies.
    fn accumulate_annotations(
        target: &mut Annotations,
        source: &Annotations,
        traits: &Traits,
        role_name: &str,
    ) {
        for (key, templates) in source {
            let mut vals = Vec::new();
            for template in templates {
                match expand_template(template, traits) {
                    Ok(Some(expanded)) => vals.extend(expanded),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(
                            role = role_name,
                            key = key.as_str(),
                            template = template.as_str(),
                            "skipping annotation template: {}",
                            err
                        );
                    }
                }
            }
            target.entry(key.clone()).or_default().extend(vals);
        }
    }

    /// Whether the accumulated policy permits requesting a role
    ///
    /// Deny overrides allow regardless of which role contributed which rule;
    /// a name matching no rule at all is denied.
    pub fn can_request_role(&self, name: &str) -> bool {
        if self.roles.deny.iter().any(|m| m.is_match(name)) {
            return false;
        }
        self.roles.allow.iter().any(|m| m.is_match(name))
    }

    /// Compute the system annotations for a pending request
    ///
    /// For each allowed key, the values not covered by the deny accumulator
    /// survive; a key whose values are fully denied is omitted.
    pub fn system_annotations(&self) -> Annotations {
        let mut annotations = Annotations::new();
        for (key, allowed) in &self.annotations.allow {
            let denied = self.annotations.deny.get(key);
            let filtered: Vec<String> = allowed
                .iter()
                .filter(|v| denied.map_or(true, |d| !d.contains(v)))
                .cloned()
                .collect();
            if filtered.is_empty() {
                continue;
            }
            annotations.insert(key.clone(), filtered);
        }
        annotations
    }
}

/// Validate an access request against the requesting user's held roles
///
/// On success the request has been mutated in place: a wildcard role list is
/// replaced by its expansion, and system annotations are attached while the
/// request is PENDING. The mutated request is the caller's responsibility to
/// persist.
///
/// `expand_roles` gates wildcard resolution; it is only enabled on trusted
/// internal paths, never for a role list accepted verbatim from a client.
///
/// # Errors
///
/// - `NotFound` - the user or one of their roles does not exist
/// - `BadParameter` - missing required reason, wildcard without expansion
///   permission, a requested role not permitted by policy, or a malformed
///   rule pattern or trait mapping
pub fn validate_access_request(
    getter: &dyn UserAndRoleGetter,
    req: &mut dyn AccessRequest,
    expand_roles: bool,
) -> Result<()> {
    let user = getter.get_user(req.user())?;

    debug!(
        user = req.user(),
        roles = ?req.roles(),
        state = %req.state(),
        "validating access request"
    );

    let mut require_reason = false;
    let mut validator = RequestValidator::new(user.traits().clone(), req.state());

    for role_name in user.roles() {
        let role = getter.get_role(role_name)?;
        validator.push(role.as_ref())?;
        if role.options().request_access == RequestStrategy::Reason {
            require_reason = true;
        }
    }

    if require_reason && req.request_reason().is_empty() {
        return Err(AccessError::bad_parameter(
            "request reason must be specified",
        ));
    }

    if matches!(req.roles(), [name] if name.as_str() == WILDCARD_REQUEST) {
        if !expand_roles {
            return Err(AccessError::bad_parameter(
                "unexpected wildcard access request",
            ));
        }
        let all_roles = getter.get_roles()?;

        let held: HashSet<&str> = user.roles().iter().map(String::as_str).collect();
        let mut expanded = Vec::new();
        for role in &all_roles {
            let name = role.name();
            if !held.contains(name) && validator.can_request_role(name) {
                expanded.push(name.to_string());
            }
        }
        debug!(user = req.user(), roles = ?expanded, "expanded wildcard access request");
        // An empty expansion is accepted here; persistence owns the
        // at-least-one-role check.
        req.set_roles(expanded);
    }

    for role_name in req.roles() {
        if !validator.can_request_role(role_name) {
            return Err(AccessError::bad_parameter(format!(
                "user {:?} cannot request/assume role {:?}",
                req.user(),
                role_name
            )));
        }
    }

    if req.state().is_pending() {
        req.set_system_annotations(validator.system_annotations());
    }

    Ok(())
}
