// Authorization Policy - who may request which transition

pub mod authorization;
pub mod role;

pub use authorization::{authorize, permits, Action};
pub use role::{effective_role, Actor, ActorRole, IdentityClaims};
