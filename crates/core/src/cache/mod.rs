mod error;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use serialization::{deserialize_snapshot, serialize_snapshot, SerializationError};
pub use traits::Cache;
