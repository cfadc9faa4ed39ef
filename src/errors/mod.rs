use std::path::PathBuf;

use thiserror::Error;

/// Namespace prefix used when reporting invalid connection options
pub const OPTION_NAMESPACE: &str = "webdav:";

/// Errors produced by WebDAV client operations
#[derive(Error, Debug)]
pub enum WebDavError {
    #[error("Option ({ns}{name}={value}) have invalid name or value")]
    OptionNotValid {
        name: String,
        value: String,
        ns: String,
    },

    #[error("Local file: {} not found", path.display())]
    LocalResourceNotFound { path: PathBuf },

    #[error("Remote resource: {path} not found")]
    RemoteResourceNotFound { path: String },

    #[error("Remote parent for: {path} not found")]
    RemoteParentNotFound { path: String },

    #[error(
        "Resource {} is too big, it should be less than {max_size} but actually: {size}",
        path.display()
    )]
    ResourceTooBig {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    #[error("Method '{name}' not supported for {server}")]
    MethodNotSupported { name: String, server: String },

    #[error("No connection with {hostname}")]
    NoConnection { hostname: String },

    #[error("{source}")]
    ConnectionException {
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with code {code} and message: {message}")]
    ResponseErrorCode {
        url: String,
        code: u16,
        message: String,
    },

    #[error("Not enough space on the server")]
    NotEnoughSpace,

    #[error("Local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build XML request body: {details}")]
    Xml { details: String },
}

pub type Result<T> = std::result::Result<T, WebDavError>;

/// Utility functions for common error creation patterns
impl WebDavError {
    pub fn option_not_valid<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::OptionNotValid {
            name: name.into(),
            value: value.into(),
            ns: OPTION_NAMESPACE.to_string(),
        }
    }

    pub fn remote_not_found<S: Into<String>>(path: S) -> Self {
        Self::RemoteResourceNotFound { path: path.into() }
    }

    pub fn parent_not_found<S: Into<String>>(path: S) -> Self {
        Self::RemoteParentNotFound { path: path.into() }
    }

    pub fn method_not_supported<N: Into<String>, S: Into<String>>(name: N, server: S) -> Self {
        Self::MethodNotSupported {
            name: name.into(),
            server: server.into(),
        }
    }

    pub fn local_io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// True for failures the server reported through an HTTP status code
    pub fn is_http_status(&self) -> bool {
        matches!(
            self,
            WebDavError::RemoteResourceNotFound { .. }
                | WebDavError::MethodNotSupported { .. }
                | WebDavError::ResponseErrorCode { .. }
                | WebDavError::NotEnoughSpace
        )
    }
}
