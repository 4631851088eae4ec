//! Data models for Nook

mod field_value;
mod record;
mod sync_conflict;
mod sync_result;
mod task;

pub use field_value::{Document, FieldValue};
pub use record::{Record, ID_FIELD, UPDATED_AT_FIELD};
pub use sync_conflict::{SyncConflict, LAST_WRITE_WINS};
pub use sync_result::SyncResult;
pub use task::{Recurrence, Task};
