pub mod config;
pub mod entry;
pub mod enums;
pub mod status;

// Re-export commonly used types for convenience
pub use config::{EntryConfig, IconConfig, ProjectCatalog, TogglConfig};
pub use entry::{CurrentEntry, NewTimeEntry, ProjectRecord, TimeEntry};
pub use enums::{Activity, TagAction};
pub use status::{Query, StatusPayload};
