use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use reqwest::{Body, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::errors::{Result, WebDavError};
use crate::models::{ListedResource, PropertyOption, ResourceInfo};
use crate::services::local_folder_service as local;
use crate::urn::{Urn, SEPARATOR};
use crate::webdav_xml_parser;

use super::config::ConnectionSettings;
use super::connection::{Action, Depth, WebDavConnection};
use super::resource::Resource;
use super::smart_sync::SmartSyncService;

/// Largest local file accepted for upload (2 GiB)
pub const MAX_UPLOAD_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// WebDAV client exposing typed operations on remote resources.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct WebDavClient {
    connection: Arc<WebDavConnection>,
}

fn transfer_error(source: reqwest::Error) -> WebDavError {
    WebDavError::ConnectionException { source }
}

impl WebDavClient {
    /// Validates `settings` and creates a client
    pub fn new(settings: ConnectionSettings) -> Result<Self> {
        let connection = WebDavConnection::new(settings)?;
        info!("🔗 WebDAV client ready for {}", connection.hostname());
        Ok(Self {
            connection: Arc::new(connection),
        })
    }

    pub fn connection(&self) -> &WebDavConnection {
        &self.connection
    }

    pub fn settings(&self) -> &ConnectionSettings {
        self.connection.settings()
    }

    /// Handle bound to `remote_path`
    pub fn resource(&self, remote_path: &str) -> Resource {
        Resource::new(self.clone(), remote_path)
    }

    async fn execute(&self, action: Action, urn: &Urn) -> Result<reqwest::Response> {
        self.connection.execute(action, urn, None, &[]).await
    }

    /// Fails with `RemoteResourceNotFound` unless the path exists as a file or a directory
    async fn check_remote_resource(&self, remote_path: &str, urn: &Urn) -> Result<()> {
        if !self.check(&urn.path()).await? && !self.check(&Urn::dir(remote_path).path()).await? {
            return Err(WebDavError::remote_not_found(remote_path));
        }
        Ok(())
    }

    /// Names of the children of a remote collection; subdirectories end with `/`
    pub async fn list(&self, remote_path: &str) -> Result<Vec<String>> {
        let directory_urn = Urn::dir(remote_path);
        self.check_listable(&directory_urn).await?;

        let response = self.execute(Action::List, &directory_urn).await?;
        let content = response.bytes().await.map_err(transfer_error)?;

        let queried = self.connection.full_path(&directory_urn);
        let hostname = self.connection.hostname();
        let names = webdav_xml_parser::parse_get_list_response(&content)
            .into_iter()
            .filter(|urn| !Urn::matches_href(&queried, urn.quote(), hostname))
            .map(|urn| urn.filename())
            .collect::<Vec<_>>();

        debug!("📂 Listed {} entries in {}", names.len(), directory_urn);
        Ok(names)
    }

    /// Children of a remote collection with their properties
    pub async fn list_with_info(&self, remote_path: &str) -> Result<Vec<ListedResource>> {
        let directory_urn = Urn::dir(remote_path);
        self.check_listable(&directory_urn).await?;

        let response = self.execute(Action::List, &directory_urn).await?;
        let content = response.bytes().await.map_err(transfer_error)?;

        let queried = self.connection.full_path(&directory_urn);
        let hostname = self.connection.hostname();
        Ok(webdav_xml_parser::parse_get_list_info_response(&content)
            .into_iter()
            .filter(|entry| {
                !Urn::matches_href(&queried, Urn::new(&entry.path).quote(), hostname)
            })
            .collect())
    }

    async fn check_listable(&self, directory_urn: &Urn) -> Result<()> {
        if directory_urn.path() != SEPARATOR.to_string()
            && !self.check(&directory_urn.path()).await?
        {
            return Err(WebDavError::remote_not_found(directory_urn.path()));
        }
        Ok(())
    }

    /// Free space reported by the server, `None` if the answer cannot be parsed
    pub async fn free(&self) -> Result<Option<u64>> {
        let body = webdav_xml_parser::create_free_space_request_content()?;
        let response = self
            .connection
            .execute(Action::Free, &Urn::new(""), Some(Body::from(body)), &[])
            .await?;
        let content = response.bytes().await.map_err(transfer_error)?;
        webdav_xml_parser::parse_free_space_response(&content, self.connection.hostname())
    }

    /// Tells whether a remote resource exists.
    ///
    /// Only `200 OK` means the resource exists. Error statuses are answered
    /// with `false`; transport failures still propagate.
    pub async fn check(&self, remote_path: &str) -> Result<bool> {
        if self.settings().disable_check {
            return Ok(true);
        }

        let urn = Urn::new(remote_path);
        match self.execute(Action::Check, &urn).await {
            Ok(response) => Ok(response.status() == StatusCode::OK),
            Err(e) if e.is_http_status() => {
                debug!("Check of {} answered: {}", urn, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a remote collection; the parent must exist
    pub async fn mkdir(&self, remote_path: &str) -> Result<bool> {
        let directory_urn = Urn::dir(remote_path);
        if !self.check(&directory_urn.parent()).await? {
            return Err(WebDavError::parent_not_found(directory_urn.path()));
        }

        match self.execute(Action::Mkdir, &directory_urn).await {
            Ok(response) => {
                info!("📁 Created remote directory {}", directory_urn);
                Ok(matches!(response.status().as_u16(), 200 | 201))
            }
            // Some servers answer 405 when the collection already exists
            Err(WebDavError::MethodNotSupported { .. }) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Streams a remote file into `buffer`
    pub async fn download_from<W>(&self, buffer: &mut W, remote_path: &str) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let urn = Urn::new(remote_path);
        if self.is_dir(&urn.path()).await? {
            return Err(WebDavError::option_not_valid("remote_path", remote_path));
        }
        if !self.check(&urn.path()).await? {
            return Err(WebDavError::remote_not_found(urn.path()));
        }

        let response = self.execute(Action::Download, &urn).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transfer_error)?;
            buffer
                .write_all(&chunk)
                .await
                .map_err(|e| WebDavError::local_io(remote_path, e))?;
        }
        buffer
            .flush()
            .await
            .map_err(|e| WebDavError::local_io(remote_path, e))
    }

    /// Downloads a remote file into memory
    pub async fn download_to_buffer(&self, remote_path: &str) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.download_from(&mut buffer, remote_path).await?;
        Ok(buffer)
    }

    /// Downloads a file or a whole directory, depending on the remote resource type
    pub fn download<'a>(
        &'a self,
        remote_path: &'a str,
        local_path: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if self.is_dir(remote_path).await? {
                self.download_directory(remote_path, local_path).await
            } else {
                self.download_file(remote_path, local_path).await
            }
        }
        .boxed()
    }

    /// Mirrors a remote collection into `local_path`, replacing whatever was there
    pub async fn download_directory(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let urn = Urn::dir(remote_path);
        if !self.is_dir(&urn.path()).await? {
            return Err(WebDavError::option_not_valid("remote_path", remote_path));
        }

        if local::exists(local_path).await {
            local::remove_dir_all(local_path).await?;
        }
        local::create_dir_all(local_path).await?;

        for name in self.list(&urn.path()).await? {
            let child_remote = format!("{}{}", urn.path(), name);
            let child_local = local_path.join(name.trim_end_matches(SEPARATOR));
            self.download(&child_remote, &child_local).await?;
        }

        Ok(())
    }

    /// Streams a remote file into `local_path`, creating missing parent directories
    pub async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let urn = Urn::new(remote_path);
        if self.is_dir(&urn.path()).await? {
            return Err(WebDavError::option_not_valid("remote_path", remote_path));
        }
        if local::is_dir(local_path).await {
            return Err(WebDavError::option_not_valid(
                "local_path",
                local_path.display().to_string(),
            ));
        }
        if !self.check(&urn.path()).await? {
            return Err(WebDavError::remote_not_found(urn.path()));
        }
        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            local::create_dir_all(parent).await?;
        }

        let response = self.execute(Action::Download, &urn).await?;
        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| WebDavError::local_io(local_path, e))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transfer_error)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| WebDavError::local_io(local_path, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| WebDavError::local_io(local_path, e))?;

        info!("⬇️ Downloaded {} ({} bytes) to {}", urn, written, local_path.display());
        Ok(())
    }

    /// Downloads and then runs `callback` on the calling task
    pub async fn download_sync<F>(
        &self,
        remote_path: &str,
        local_path: &Path,
        callback: Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(),
    {
        self.download(remote_path, local_path).await?;
        if let Some(callback) = callback {
            callback();
        }
        Ok(())
    }

    /// Downloads on a spawned task; `callback` runs on that task with the outcome.
    ///
    /// There is no cancellation. Await the handle to observe completion.
    pub fn download_async<F>(
        &self,
        remote_path: &str,
        local_path: &Path,
        callback: Option<F>,
    ) -> JoinHandle<Result<()>>
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        let client = self.clone();
        let remote_path = remote_path.to_string();
        let local_path = local_path.to_path_buf();

        tokio::spawn(async move {
            let result = client.download(&remote_path, &local_path).await;
            if let Some(callback) = callback {
                callback(&result);
            }
            result
        })
    }

    /// Uploads an in-memory buffer to a remote file
    pub async fn upload_to(&self, buffer: Vec<u8>, remote_path: &str) -> Result<()> {
        let urn = Urn::new(remote_path);
        if urn.is_dir() {
            return Err(WebDavError::option_not_valid("remote_path", remote_path));
        }
        if !self.check(&urn.parent()).await? {
            return Err(WebDavError::parent_not_found(urn.path()));
        }

        let size = buffer.len();
        self.connection
            .execute(Action::Upload, &urn, Some(Body::from(buffer)), &[])
            .await?;
        info!("⬆️ Uploaded {} bytes to {}", size, urn);
        Ok(())
    }

    /// Uploads a file or a whole directory, depending on the local resource type
    pub fn upload<'a>(
        &'a self,
        remote_path: &'a str,
        local_path: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if local::is_dir(local_path).await {
                self.upload_directory(remote_path, local_path).await
            } else {
                self.upload_file(remote_path, local_path).await
            }
        }
        .boxed()
    }

    /// Recreates `remote_path` from scratch and mirrors `local_path` into it
    pub async fn upload_directory(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let urn = Urn::dir(remote_path);
        if !local::exists(local_path).await {
            return Err(WebDavError::LocalResourceNotFound {
                path: local_path.to_path_buf(),
            });
        }
        if !local::is_dir(local_path).await {
            return Err(WebDavError::option_not_valid(
                "local_path",
                local_path.display().to_string(),
            ));
        }

        if self.check(&urn.path()).await? {
            self.clean(&urn.path()).await?;
        }
        self.mkdir(remote_path).await?;

        for name in local::list_dir(local_path).await? {
            let child_remote = format!("{}{}", urn.path(), name);
            let child_local = local_path.join(name.trim_end_matches(SEPARATOR));
            self.upload(&child_remote, &child_local).await?;
        }

        Ok(())
    }

    /// Streams a local file to a remote file whose parent collection must exist
    pub async fn upload_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        if !local::exists(local_path).await {
            return Err(WebDavError::LocalResourceNotFound {
                path: local_path.to_path_buf(),
            });
        }

        let urn = Urn::new(remote_path);
        if urn.is_dir() {
            return Err(WebDavError::option_not_valid("remote_path", remote_path));
        }
        if local::is_dir(local_path).await {
            return Err(WebDavError::option_not_valid(
                "local_path",
                local_path.display().to_string(),
            ));
        }
        if !self.check(&urn.parent()).await? {
            return Err(WebDavError::parent_not_found(urn.path()));
        }

        let size = local::file_size(local_path).await?;
        if size > MAX_UPLOAD_SIZE {
            return Err(WebDavError::ResourceTooBig {
                path: local_path.to_path_buf(),
                size,
                max_size: MAX_UPLOAD_SIZE,
            });
        }

        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| WebDavError::local_io(local_path, e))?;
        let body = Body::wrap_stream(ReaderStream::new(file));

        self.connection
            .execute(
                Action::Upload,
                &urn,
                Some(body),
                &[("Content-Length", size.to_string())],
            )
            .await?;

        info!("⬆️ Uploaded {} ({} bytes) to {}", local_path.display(), size, urn);
        Ok(())
    }

    /// Uploads and then runs `callback` on the calling task
    pub async fn upload_sync<F>(
        &self,
        remote_path: &str,
        local_path: &Path,
        callback: Option<F>,
    ) -> Result<()>
    where
        F: FnOnce(),
    {
        self.upload(remote_path, local_path).await?;
        if let Some(callback) = callback {
            callback();
        }
        Ok(())
    }

    /// Uploads on a spawned task; `callback` runs on that task with the outcome.
    ///
    /// There is no cancellation. Await the handle to observe completion.
    pub fn upload_async<F>(
        &self,
        remote_path: &str,
        local_path: &Path,
        callback: Option<F>,
    ) -> JoinHandle<Result<()>>
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        let client = self.clone();
        let remote_path = remote_path.to_string();
        let local_path: PathBuf = local_path.to_path_buf();

        tokio::spawn(async move {
            let result = client.upload(&remote_path, &local_path).await;
            if let Some(callback) = callback {
                callback(&result);
            }
            result
        })
    }

    /// Copies a remote resource; `depth` is only sent for collections
    pub async fn copy(
        &self,
        remote_path_from: &str,
        remote_path_to: &str,
        depth: Depth,
    ) -> Result<()> {
        let urn_from = Urn::new(remote_path_from);
        if !self.check(&urn_from.path()).await? {
            return Err(WebDavError::remote_not_found(urn_from.path()));
        }

        let urn_to = Urn::new(remote_path_to);
        if !self.check(&urn_to.parent()).await? {
            return Err(WebDavError::parent_not_found(urn_to.path()));
        }

        let mut headers = vec![("Destination", self.connection.url_for(&urn_to))];
        if self.is_dir(&urn_from.path()).await? {
            headers.push(("Depth", depth.as_header_value().to_string()));
        }

        self.connection
            .execute(Action::Copy, &urn_from, None, &headers)
            .await?;
        info!("📋 Copied {} to {}", urn_from, urn_to);
        Ok(())
    }

    /// Moves a remote resource, replacing the target when `overwrite` is set
    pub async fn move_to(
        &self,
        remote_path_from: &str,
        remote_path_to: &str,
        overwrite: bool,
    ) -> Result<()> {
        let urn_from = Urn::new(remote_path_from);
        if !self.check(&urn_from.path()).await? {
            return Err(WebDavError::remote_not_found(urn_from.path()));
        }

        let urn_to = Urn::new(remote_path_to);
        if !self.check(&urn_to.parent()).await? {
            return Err(WebDavError::parent_not_found(urn_to.path()));
        }

        let headers = [
            ("Destination", self.connection.url_for(&urn_to)),
            ("Overwrite", if overwrite { "T" } else { "F" }.to_string()),
        ];

        self.connection
            .execute(Action::Move, &urn_from, None, &headers)
            .await?;
        info!("🚚 Moved {} to {}", urn_from, urn_to);
        Ok(())
    }

    /// Deletes a remote resource
    pub async fn clean(&self, remote_path: &str) -> Result<()> {
        let urn = Urn::new(remote_path);
        self.execute(Action::Clean, &urn).await?;
        info!("🗑️ Removed {}", urn);
        Ok(())
    }

    /// Properties of a remote resource
    pub async fn info(&self, remote_path: &str) -> Result<ResourceInfo> {
        let urn = Urn::new(remote_path);
        self.check_remote_resource(remote_path, &urn).await?;

        let response = self.execute(Action::Info, &urn).await?;
        let content = response.bytes().await.map_err(transfer_error)?;
        let path = self.connection.full_path(&urn);
        webdav_xml_parser::parse_info_response(&content, &path, self.connection.hostname())
    }

    /// Tells whether a remote resource is a collection.
    ///
    /// The parent collection is listed instead of querying the resource itself.
    pub async fn is_dir(&self, remote_path: &str) -> Result<bool> {
        let urn = Urn::new(remote_path);
        let parent_urn = Urn::new(&urn.parent());
        self.check_remote_resource(remote_path, &urn).await?;

        let response = self.execute(Action::Info, &parent_urn).await?;
        let content = response.bytes().await.map_err(transfer_error)?;
        let path = self.connection.full_path(&urn);
        webdav_xml_parser::parse_is_dir_response(&content, &path, self.connection.hostname())
    }

    /// Value of one property, `None` when the server does not report it
    pub async fn get_property(
        &self,
        remote_path: &str,
        option: &PropertyOption,
    ) -> Result<Option<String>> {
        let urn = Urn::new(remote_path);
        self.check_remote_resource(remote_path, &urn).await?;

        let body = webdav_xml_parser::create_get_property_request_content(option)?;
        let response = self
            .connection
            .execute(Action::GetProperty, &urn, Some(Body::from(body)), &[])
            .await?;
        let content = response.bytes().await.map_err(transfer_error)?;
        Ok(webdav_xml_parser::parse_get_property_response(&content, &option.name))
    }

    /// Sets one property
    pub async fn set_property(&self, remote_path: &str, option: PropertyOption) -> Result<()> {
        self.set_property_batch(remote_path, &[option]).await
    }

    /// Sets several properties in a single PROPPATCH
    pub async fn set_property_batch(
        &self,
        remote_path: &str,
        options: &[PropertyOption],
    ) -> Result<()> {
        let urn = Urn::new(remote_path);
        self.check_remote_resource(remote_path, &urn).await?;

        let body = webdav_xml_parser::create_set_property_batch_request_content(options)?;
        self.connection
            .execute(Action::SetProperty, &urn, Some(Body::from(body)), &[])
            .await?;
        Ok(())
    }

    /// Uploads local changes; see [`SmartSyncService::push`]
    pub async fn push(&self, remote_directory: &str, local_directory: &Path) -> Result<bool> {
        SmartSyncService::new(self.clone())
            .push(remote_directory, local_directory)
            .await
    }

    /// Downloads remote changes; see [`SmartSyncService::pull`]
    pub async fn pull(&self, remote_directory: &str, local_directory: &Path) -> Result<bool> {
        SmartSyncService::new(self.clone())
            .pull(remote_directory, local_directory)
            .await
    }

    /// Pull then push
    pub async fn sync(&self, remote_directory: &str, local_directory: &Path) -> Result<bool> {
        SmartSyncService::new(self.clone())
            .sync(remote_directory, local_directory)
            .await
    }
}
