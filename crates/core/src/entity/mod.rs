mod capabilities;
mod error;
mod macros;
mod traits;

pub use capabilities::{CacheSettings, Capabilities};
pub use error::CapabilityError;
pub use traits::{
    Entity, EntityId, HasActiveStatus, HasCache, HasCreatedAudit, HasSoftDelete, HasTenant,
    HasUpdatedAudit,
};
