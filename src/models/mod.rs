use serde::{Deserialize, Serialize};

/// Keys of [`ResourceInfo`], in the order they are reported
pub const RESOURCE_INFO_KEYS: [&str; 5] = ["created", "name", "size", "modified", "etag"];

/// Properties of one remote resource as reported in a multistatus `<response>`.
///
/// Values are kept verbatim: `size` is the decimal string from
/// `getcontentlength`, dates are the server's own formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub created: Option<String>,
    pub name: Option<String>,
    pub size: Option<String>,
    pub modified: Option<String>,
    pub etag: Option<String>,
}

impl ResourceInfo {
    /// Looks a field up by its key name
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "created" => self.created.as_deref(),
            "name" => self.name.as_deref(),
            "size" => self.size.as_deref(),
            "modified" => self.modified.as_deref(),
            "etag" => self.etag.as_deref(),
            _ => None,
        }
    }
}

/// A child entry returned by a listing that also requested properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedResource {
    /// Decoded path as reported by the server
    pub path: String,
    pub is_dir: bool,
    pub info: ResourceInfo,
}

/// One XML-qualified property to read or write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub namespace: Option<String>,
    pub name: String,
    pub value: Option<String>,
}

impl PropertyOption {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            value: None,
        }
    }

    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Namespace URI, empty when none was given
    pub fn namespace_or_empty(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// Value to write, empty when none was given
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}
