//! STOWAGE Core - Records and the Storage capability
//!
//! Data types and the async trait every backend implements. No backend
//! lives here; see `stowage-storage` and `stowage-client`.

pub mod action;
pub mod error;
pub mod filter;
pub mod record;
pub mod storage;

pub use action::StorageAction;
pub use error::{StorageError, StorageResult};
pub use filter::{FieldMatch, Filter};
pub use record::{from_payload, split_id, to_payload, Document, Payload, Record, RecordId, ID_FIELD};
pub use storage::Storage;
