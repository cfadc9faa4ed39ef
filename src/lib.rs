pub mod errors;
pub mod models;
pub mod services;
pub mod urn;
pub mod webdav_xml_parser;

pub use errors::{Result, WebDavError};
pub use models::{ListedResource, PropertyOption, ResourceInfo};
pub use services::webdav::{
    Action, ConnectionSettings, Depth, Resource, SmartSyncDecision, SmartSyncService, WebDavClient,
};
pub use urn::Urn;
