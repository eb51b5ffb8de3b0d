// Actor identity and the single role-derivation function

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ActorId;

/// Actor roles, ordered by privilege
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Staff,
    Support,
    Admin,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Staff => "staff",
            ActorRole::Support => "support",
            ActorRole::Admin => "admin",
        }
    }

    /// Support and admin may act on projects they are not bound to
    pub fn has_override(self) -> bool {
        matches!(self, ActorRole::Support | ActorRole::Admin)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of an engine operation, as vouched for by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, role: ActorRole) -> Self {
        Self { id: id.into(), role }
    }

    pub fn customer(id: impl Into<ActorId>) -> Self {
        Self::new(id, ActorRole::Customer)
    }

    pub fn staff(id: impl Into<ActorId>) -> Self {
        Self::new(id, ActorRole::Staff)
    }

    pub fn support(id: impl Into<ActorId>) -> Self {
        Self::new(id, ActorRole::Support)
    }

    pub fn admin(id: impl Into<ActorId>) -> Self {
        Self::new(id, ActorRole::Admin)
    }
}

/// Raw account attributes as issued by the identity provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub subject: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub groups: Vec<String>,
}

fn role_from_name(name: &str) -> Option<ActorRole> {
    match name.trim().to_ascii_lowercase().as_str() {
        "admin" | "administrator" => Some(ActorRole::Admin),
        "support" => Some(ActorRole::Support),
        "staff" | "technician" => Some(ActorRole::Staff),
        "customer" | "client" => Some(ActorRole::Customer),
        _ => None,
    }
}

/// Effective role of an account: the most privileged role any attribute grants.
/// Unknown names grant nothing; an account with no grants is a customer.
pub fn effective_role(claims: &IdentityClaims) -> ActorRole {
    let staff_flag = claims.is_staff.then_some(ActorRole::Staff);

    claims
        .role
        .as_deref()
        .and_then(role_from_name)
        .into_iter()
        .chain(claims.groups.iter().filter_map(|g| role_from_name(g)))
        .chain(staff_flag)
        .max()
        .unwrap_or(ActorRole::Customer)
}

impl From<&IdentityClaims> for Actor {
    fn from(claims: &IdentityClaims) -> Self {
        Actor::new(claims.subject.as_str(), effective_role(claims))
    }
}
