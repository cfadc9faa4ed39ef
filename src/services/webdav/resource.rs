use std::fmt;
use std::path::Path;

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;

use crate::errors::{Result, WebDavError};
use crate::models::{PropertyOption, ResourceInfo, RESOURCE_INFO_KEYS};
use crate::urn::Urn;

use super::connection::Depth;
use super::service::WebDavClient;

/// Handle pairing a client with one remote path.
///
/// Moving or renaming through the handle rebinds it to the new path.
#[derive(Debug, Clone)]
pub struct Resource {
    client: WebDavClient,
    urn: Urn,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource {}", self.urn.path())
    }
}

impl Resource {
    pub fn new(client: WebDavClient, remote_path: &str) -> Self {
        Self {
            client,
            urn: Urn::new(remote_path),
        }
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn path(&self) -> String {
        self.urn.path()
    }

    pub async fn is_dir(&self) -> Result<bool> {
        self.client.is_dir(&self.urn.path()).await
    }

    /// Renames the resource inside its current parent collection
    pub async fn rename(&mut self, new_name: &str) -> Result<()> {
        let old_path = self.urn.path();
        let mut new_path = format!("{}{}", self.urn.parent(), new_name);
        if self.urn.is_dir() && !new_path.ends_with('/') {
            new_path.push('/');
        }

        self.client.move_to(&old_path, &new_path, false).await?;
        self.urn = Urn::new(&new_path);
        Ok(())
    }

    /// Moves the resource and rebinds the handle to the new path
    pub async fn move_to(&mut self, remote_path: &str) -> Result<()> {
        let new_urn = Urn::new(remote_path);
        self.client
            .move_to(&self.urn.path(), &new_urn.path(), false)
            .await?;
        self.urn = new_urn;
        Ok(())
    }

    /// Copies the resource and returns a handle to the copy
    pub async fn copy_to(&self, remote_path: &str) -> Result<Resource> {
        let urn = Urn::new(remote_path);
        self.client
            .copy(&self.urn.path(), &urn.path(), Depth::default())
            .await?;
        Ok(self.client.resource(&urn.path()))
    }

    pub async fn info(&self) -> Result<ResourceInfo> {
        self.client.info(&self.urn.path()).await
    }

    /// Subset of the resource properties; every key must be a known one
    pub async fn info_fields(&self, keys: &[&str]) -> Result<Vec<(String, Option<String>)>> {
        if let Some(unknown) = keys.iter().find(|key| !RESOURCE_INFO_KEYS.contains(*key)) {
            return Err(WebDavError::option_not_valid("filter", *unknown));
        }

        let info = self.info().await?;
        Ok(keys
            .iter()
            .map(|key| (key.to_string(), info.get(key).map(str::to_string)))
            .collect())
    }

    pub async fn clean(&self) -> Result<()> {
        self.client.clean(&self.urn.path()).await
    }

    pub async fn check(&self) -> Result<bool> {
        self.client.check(&self.urn.path()).await
    }

    /// Replaces the remote content with `buffer`
    pub async fn read_from(&self, buffer: Vec<u8>) -> Result<()> {
        self.client.upload_to(buffer, &self.urn.path()).await
    }

    /// Uploads `local_path` to this resource
    pub async fn read(&self, local_path: &Path) -> Result<()> {
        self.client.upload(&self.urn.path(), local_path).await
    }

    pub fn read_async<F>(&self, local_path: &Path, callback: Option<F>) -> JoinHandle<Result<()>>
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        self.client
            .upload_async(&self.urn.path(), local_path, callback)
    }

    /// Streams the remote content into `buffer`
    pub async fn write_to<W>(&self, buffer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.client.download_from(buffer, &self.urn.path()).await
    }

    /// Downloads this resource to `local_path`
    pub async fn write(&self, local_path: &Path) -> Result<()> {
        self.client.download(&self.urn.path(), local_path).await
    }

    pub fn write_async<F>(&self, local_path: &Path, callback: Option<F>) -> JoinHandle<Result<()>>
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        self.client
            .download_async(&self.urn.path(), local_path, callback)
    }

    pub async fn get_property(&self, option: &PropertyOption) -> Result<Option<String>> {
        self.client.get_property(&self.urn.path(), option).await
    }

    /// Sets `option` to `value`
    pub async fn set_property(&self, option: PropertyOption, value: &str) -> Result<()> {
        self.client
            .set_property(&self.urn.path(), option.with_value(value))
            .await
    }
}
