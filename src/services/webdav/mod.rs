// WebDAV client modules organized by functionality

pub mod config;
pub mod connection;
pub mod resource;
pub mod service;
pub mod smart_sync;

// Re-export main types for convenience
pub use config::ConnectionSettings;
pub use connection::{Action, Depth, WebDavConnection};
pub use resource::Resource;
pub use service::{WebDavClient, MAX_UPLOAD_SIZE};
pub use smart_sync::{parse_http_date, SmartSyncDecision, SmartSyncService};
