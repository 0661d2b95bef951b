//! End-to-end validation tests
//!
//! Drives `validate_access_request` through an in-memory user/role catalog:
//! admission by pattern, wildcard expansion, reason enforcement, and system
//! annotation attachment.

use dynamic_access::{
    validate_access_request, AccessError, AccessRequestConditions, AccessRequestV1,
    RequestStrategy, Result, Role, RoleV1, User, UserAndRoleGetter, UserV1,
};
use std::collections::HashMap;

/// In-memory user/role catalog
#[derive(Default)]
struct Catalog {
    users: HashMap<String, UserV1>,
    roles: HashMap<String, RoleV1>,
}

impl Catalog {
    fn with_user(mut self, user: UserV1) -> Self {
        self.users.insert(user.name.clone(), user);
        self
    }

    fn with_role(mut self, role: RoleV1) -> Self {
        self.roles.insert(role.name.clone(), role);
        self
    }
}

impl UserAndRoleGetter for Catalog {
    fn get_user(&self, name: &str) -> Result<Box<dyn User>> {
        self.users
            .get(name)
            .cloned()
            .map(|u| Box::new(u) as Box<dyn User>)
            .ok_or_else(|| AccessError::not_found(format!("user {:?} not found", name)))
    }

    fn get_role(&self, name: &str) -> Result<Box<dyn Role>> {
        self.roles
            .get(name)
            .cloned()
            .map(|r| Box::new(r) as Box<dyn Role>)
            .ok_or_else(|| AccessError::not_found(format!("role {:?} not found", name)))
    }

    fn get_roles(&self) -> Result<Vec<Box<dyn Role>>> {
        Ok(self
            .roles
            .values()
            .cloned()
            .map(|r| Box::new(r) as Box<dyn Role>)
            .collect())
    }
}

fn allow_patterns(patterns: &[&str]) -> AccessRequestConditions {
    AccessRequestConditions {
        roles: patterns.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    }
}

/// alice holds `base`, which allows requesting `dev-*`
fn base_catalog() -> Catalog {
    Catalog::default()
        .with_user(UserV1::new("alice", vec!["base".to_string()]))
        .with_role(RoleV1::new("base").with_allow(allow_patterns(&["dev-*"])))
        .with_role(RoleV1::new("dev-infra"))
}

#[test]
fn test_explicit_role_within_policy() {
    let catalog = base_catalog();
    let mut req = AccessRequestV1::new("alice", vec!["dev-infra".to_string()]).unwrap();

    validate_access_request(&catalog, &mut req, false).unwrap();

    assert_eq!(req.roles, vec!["dev-infra".to_string()]);
    assert!(req.system_annotations.is_empty());
}

#[test]
fn test_role_outside_policy_is_rejected() {
    let catalog = base_catalog().with_role(RoleV1::new("prod-infra"));
    let mut req = AccessRequestV1::new("alice", vec!["prod-infra".to_string()]).unwrap();

    let err = validate_access_request(&catalog, &mut req, false).unwrap_err();
    assert!(err.is_bad_parameter());
    assert!(err.to_string().contains("cannot request/assume role"));
}

#[test]
fn test_wildcard_expansion_honors_deny_and_held_roles() {
    let catalog = Catalog::default()
        .with_user(UserV1::new("alice", vec!["base".to_string()]))
        .with_role(
            RoleV1::new("base")
                .with_allow(allow_patterns(&["*"]))
                .with_deny(allow_patterns(&["dev-secret"])),
        )
        .with_role(RoleV1::new("dev-infra"))
        .with_role(RoleV1::new("dev-secret"));
    let mut req = AccessRequestV1::new("alice", vec!["*".to_string()]).unwrap();

    validate_access_request(&catalog, &mut req, true).unwrap();

    // The denied role and the already-held role are both excluded
    assert_eq!(req.roles, vec!["dev-infra".to_string()]);
}

#[test]
fn test_empty_wildcard_expansion_is_accepted_until_persistence() {
    // Every role alice does not already hold falls outside her allow
    // patterns, so the wildcard expands to nothing
    let catalog = Catalog::default()
        .with_user(UserV1::new("alice", vec!["base".to_string()]))
        .with_role(RoleV1::new("base").with_allow(allow_patterns(&["dev-*"])))
        .with_role(RoleV1::new("prod-db"));
    let mut req = AccessRequestV1::new("alice", vec!["*".to_string()]).unwrap();

    // The validator accepts the empty expansion; storing the record is what
    // enforces the at-least-one-role rule
    validate_access_request(&catalog, &mut req, true).unwrap();
    assert!(req.roles.is_empty());

    let err = req.check().unwrap_err();
    assert!(err.is_bad_parameter());
    assert_eq!(
        err.to_string(),
        "access request does not specify any roles"
    );
}

#[test]
fn test_wildcard_rejected_without_expansion_permission() {
    let catalog = base_catalog();
    let mut req = AccessRequestV1::new("alice", vec!["*".to_string()]).unwrap();

    let err = validate_access_request(&catalog, &mut req, false).unwrap_err();
    assert!(err.is_bad_parameter());
    assert_eq!(err.to_string(), "unexpected wildcard access request");
}

#[test]
fn test_reason_strategy_requires_reason() {
    let catalog = Catalog::default()
        .with_user(UserV1::new("alice", vec!["base".to_string()]))
        .with_role(
            RoleV1::new("base")
                .with_allow(allow_patterns(&["dev-*"]))
                .with_request_access(RequestStrategy::Reason),
        )
        .with_role(RoleV1::new("dev-infra"));
    let mut req = AccessRequestV1::new("alice", vec!["dev-infra".to_string()]).unwrap();

    let err = validate_access_request(&catalog, &mut req, false).unwrap_err();
    assert!(err.is_bad_parameter());
    assert_eq!(err.to_string(), "request reason must be specified");

    req.request_reason = "deploying the new ingestion pipeline".to_string();
    validate_access_request(&catalog, &mut req, false).unwrap();
}

#[test]
fn test_annotations_expanded_from_traits() {
    let catalog = Catalog::default()
        .with_user(
            UserV1::new("alice", vec!["base".to_string()])
                .with_trait("team", vec!["infra".to_string()]),
        )
        .with_role(RoleV1::new("base").with_allow(AccessRequestConditions {
            roles: vec!["dev-*".to_string()],
            annotations: HashMap::from([(
                "team".to_string(),
                vec!["{{internal.team}}".to_string()],
            )]),
            ..Default::default()
        }))
        .with_role(RoleV1::new("dev-infra"));
    let mut req = AccessRequestV1::new("alice", vec!["dev-infra".to_string()]).unwrap();

    validate_access_request(&catalog, &mut req, false).unwrap();

    assert_eq!(
        req.system_annotations.get("team").unwrap(),
        &vec!["infra".to_string()]
    );
}

#[test]
fn test_denied_annotation_value_drops_the_key() {
    let catalog = Catalog::default()
        .with_user(
            UserV1::new("alice", vec!["base".to_string(), "scrubber".to_string()])
                .with_trait("team", vec!["infra".to_string()]),
        )
        .with_role(RoleV1::new("base").with_allow(AccessRequestConditions {
            roles: vec!["dev-*".to_string()],
            annotations: HashMap::from([(
                "team".to_string(),
                vec!["{{internal.team}}".to_string()],
            )]),
            ..Default::default()
        }))
        .with_role(RoleV1::new("scrubber").with_deny(AccessRequestConditions {
            annotations: HashMap::from([("team".to_string(), vec!["infra".to_string()])]),
            ..Default::default()
        }))
        .with_role(RoleV1::new("dev-infra"));
    let mut req = AccessRequestV1::new("alice", vec!["dev-infra".to_string()]).unwrap();

    validate_access_request(&catalog, &mut req, false).unwrap();

    assert!(req.system_annotations.is_empty());
}

#[test]
fn test_unknown_user_and_unknown_held_role() {
    let catalog = base_catalog();
    let mut req = AccessRequestV1::new("mallory", vec!["dev-infra".to_string()]).unwrap();
    assert!(validate_access_request(&catalog, &mut req, false)
        .unwrap_err()
        .is_not_found());

    let catalog = Catalog::default()
        .with_user(UserV1::new("alice", vec!["vanished".to_string()]))
        .with_role(RoleV1::new("dev-infra"));
    let mut req = AccessRequestV1::new("alice", vec!["dev-infra".to_string()]).unwrap();
    assert!(validate_access_request(&catalog, &mut req, false)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_revalidation_is_a_noop() {
    let catalog = Catalog::default()
        .with_user(
            UserV1::new("alice", vec!["base".to_string()])
                .with_trait("team", vec!["infra".to_string()]),
        )
        .with_role(
            RoleV1::new("base")
                .with_allow(AccessRequestConditions {
                    roles: vec!["*".to_string()],
                    annotations: HashMap::from([(
                        "team".to_string(),
                        vec!["{{internal.team}}".to_string()],
                    )]),
                    ..Default::default()
                })
                .with_deny(allow_patterns(&["dev-secret"])),
        )
        .with_role(RoleV1::new("dev-infra"))
        .with_role(RoleV1::new("dev-secret"));

    let mut req = AccessRequestV1::new("alice", vec!["*".to_string()]).unwrap();
    validate_access_request(&catalog, &mut req, true).unwrap();
    let expanded = req.clone();

    // Once expanded and annotated, another pass changes nothing
    validate_access_request(&catalog, &mut req, true).unwrap();
    assert_eq!(req, expanded);
    validate_access_request(&catalog, &mut req, false).unwrap();
    assert_eq!(req, expanded);
}
