//! Trait interpolation
//!
//! Users carry multi-valued attributes ("traits"), typically sourced from an
//! identity provider. Two kinds of rules are parameterized by them:
//!
//! - **Templated values** such as `"{{internal.team}}"` or
//!   `"team-{{external.groups}}"`, expanded to one output per bound value.
//! - **Trait mappings**, which convert a matching bound value of a claim into
//!   concrete role name patterns, with regex capture groups carried into the
//!   role templates.

use crate::error::{AccessError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from trait name to its bound values, in binding order
pub type Traits = HashMap<String, Vec<String>>;

/// Expand a templated value against a user's traits
///
/// The template may contain at most one variable of the form
/// `{{internal.<name>}}` or `{{external.<name>}}`, with optional literal text
/// around it. Each non-empty value bound to the referenced trait produces one
/// output. A template without a variable expands to itself.
///
/// Returns `Ok(None)` when the referenced trait is unbound or has no
/// non-empty values; callers decide whether that is an error. A structurally
/// malformed template is a `BadParameter` error.
pub fn expand_template(template: &str, traits: &Traits) -> Result<Option<Vec<String>>> {
    let Some(start) = template.find("{{") else {
        return Ok(Some(vec![template.to_string()]));
    };
    let Some(close) = template[start..].find("}}") else {
        return Err(AccessError::bad_parameter(format!(
            "unclosed variable in template {:?}",
            template
        )));
    };
    let end = start + close;

    let prefix = &template[..start];
    if prefix.contains("}}") {
        return Err(AccessError::bad_parameter(format!(
            "unmatched \"}}}}\" in template {:?}",
            template
        )));
    }
    let suffix = &template[end + 2..];
    if suffix.contains("{{") {
        return Err(AccessError::bad_parameter(format!(
            "template {:?} references more than one variable",
            template
        )));
    }

    let variable = template[start + 2..end].trim();
    let name = variable
        .strip_prefix("internal.")
        .or_else(|| variable.strip_prefix("external."))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            AccessError::bad_parameter(format!(
                "invalid variable {:?}: expected \"internal.<name>\" or \"external.<name>\"",
                variable
            ))
        })?;

    let Some(values) = traits.get(name) else {
        return Ok(None);
    };
    let expanded: Vec<String> = values
        .iter()
        .filter(|v| !v.is_empty())
        .map(|v| format!("{}{}{}", prefix, v, suffix))
        .collect();
    if expanded.is_empty() {
        return Ok(None);
    }
    Ok(Some(expanded))
}

/// Rule converting a bound claim value into role name patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitMapping {
    /// Claim (trait) name the rule matches against
    pub claim: String,

    /// Value pattern: `*` matches every bound value, anything else is an
    /// anchored regular expression (literals match exactly)
    pub value: String,

    /// Role name templates emitted per matching value; `$1`-style
    /// backreferences are substituted from the value pattern's capture groups
    pub roles: Vec<String>,
}

impl TraitMapping {
    /// Create a new trait mapping
    pub fn new(
        claim: impl Into<String>,
        value: impl Into<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            claim: claim.into(),
            value: value.into(),
            roles,
        }
    }

    /// Expand this mapping into role name patterns
    ///
    /// The result is the deduplicated union over all bound values matching
    /// the value pattern and all role templates. An unbound claim yields an
    /// empty set; a malformed value pattern is a `BadParameter` error.
    pub fn expand(&self, traits: &Traits) -> Result<Vec<String>> {
        let Some(values) = traits.get(&self.claim) else {
            return Ok(Vec::new());
        };

        fn push_unique(out: &mut Vec<String>, role: String) {
            if !role.is_empty() && !out.contains(&role) {
                out.push(role);
            }
        }

        let mut out: Vec<String> = Vec::new();

        if self.value == "*" {
            for _ in values.iter().filter(|v| !v.is_empty()) {
                for role in &self.roles {
                    push_unique(&mut out, role.clone());
                }
            }
            return Ok(out);
        }

        let expr = format!(
            "^{}$",
            self.value.trim_start_matches('^').trim_end_matches('$')
        );
        let re = Regex::new(&expr).map_err(|e| {
            AccessError::bad_parameter(format!(
                "invalid trait mapping value pattern {:?}: {}",
                self.value, e
            ))
        })?;

        for value in values {
            let Some(caps) = re.captures(value) else {
                continue;
            };
            for role in &self.roles {
                let mut expanded = String::new();
                caps.expand(role, &mut expanded);
                push_unique(&mut out, expanded);
            }
        }
        Ok(out)
    }
}
