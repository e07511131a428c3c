// Panorama common library - main library exports

pub mod configuration;
pub mod entity;
pub mod error;
pub mod silencing;

// Flattened re-exports
pub use self::entity::*;
pub use self::error::DashboardError;
pub use self::silencing::{Silenced, SilencingPredicate, SubscriptionSilencing};
