use std::path::Path;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::errors::{Result, WebDavError};
use crate::services::local_folder_service as local;
use crate::urn::{Urn, SEPARATOR};

use super::service::WebDavClient;

/// Outcome of comparing the modification times of both copies of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartSyncDecision {
    /// The source copy is strictly newer
    Transfer,
    /// The target copy is as recent as the source, or newer
    UpToDate,
    /// One of the timestamps could not be read; the file is left alone
    Undetermined,
}

impl SmartSyncDecision {
    /// Compares at whole-second resolution
    pub fn compare(source: Option<DateTime<Utc>>, target: Option<DateTime<Utc>>) -> Self {
        match (source, target) {
            (Some(source), Some(target)) if source.timestamp() > target.timestamp() => {
                Self::Transfer
            }
            (Some(_), Some(_)) => Self::UpToDate,
            _ => Self::Undetermined,
        }
    }
}

/// Parses the date formats WebDAV servers report (`getlastmodified`, `creationdate`)
pub fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    let date_str = date_str.trim();
    if date_str.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
                .ok()
                .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
        })
}

/// Push/pull synchronization between a remote collection and a local directory.
///
/// Nothing is persisted between runs: every call walks both trees and
/// compares modification times. After each transfer the local file takes the
/// remote modification time, so a push followed by a pull (or the reverse)
/// transfers nothing.
pub struct SmartSyncService {
    client: WebDavClient,
}

impl SmartSyncService {
    pub fn new(client: WebDavClient) -> Self {
        Self { client }
    }

    async fn remote_modified(&self, remote_path: &str) -> Option<DateTime<Utc>> {
        match self.client.info(remote_path).await {
            Ok(info) => info.modified.as_deref().and_then(parse_http_date),
            Err(e) => {
                debug!("Could not read modification time of {}: {}", remote_path, e);
                None
            }
        }
    }

    async fn local_modified(&self, local_path: &Path) -> Option<DateTime<Utc>> {
        local::modified_time(local_path).await.ok()
    }

    /// Decision for uploading `local_path` over `remote_path`
    pub async fn push_decision(&self, local_path: &Path, remote_path: &str) -> SmartSyncDecision {
        let local = self.local_modified(local_path).await;
        let remote = self.remote_modified(remote_path).await;
        SmartSyncDecision::compare(local, remote)
    }

    /// Decision for downloading `remote_path` over `local_path`
    pub async fn pull_decision(&self, remote_path: &str, local_path: &Path) -> SmartSyncDecision {
        let remote = self.remote_modified(remote_path).await;
        let local = self.local_modified(local_path).await;
        SmartSyncDecision::compare(remote, local)
    }

    /// Gives the local file the remote modification time
    async fn align_local_mtime(&self, remote_path: &str, local_path: &Path) {
        let Some(modified) = self.remote_modified(remote_path).await else {
            return;
        };
        if let Err(e) = local::set_modified_time(local_path, modified) {
            warn!("Could not align modification time of {}: {}", local_path.display(), e);
        }
    }

    async fn validate_remote_directory(&self, urn: &Urn) -> Result<()> {
        if !self.client.is_dir(&urn.path()).await? {
            return Err(WebDavError::option_not_valid("remote_path", urn.path()));
        }
        Ok(())
    }

    async fn validate_local_directory(&self, local_directory: &Path) -> Result<()> {
        if !local::is_dir(local_directory).await {
            return Err(WebDavError::option_not_valid(
                "local_path",
                local_directory.display().to_string(),
            ));
        }
        Ok(())
    }

    /// Uploads local files missing remotely or newer than their remote copy.
    ///
    /// Returns whether anything was created or uploaded.
    pub fn push<'a>(
        &'a self,
        remote_directory: &'a str,
        local_directory: &'a Path,
    ) -> BoxFuture<'a, Result<bool>> {
        async move {
            let urn = Urn::dir(remote_directory);
            self.validate_remote_directory(&urn).await?;
            self.validate_local_directory(local_directory).await?;

            let remote_names = self.client.list(&urn.path()).await?;
            let mut updated = false;

            for name in local::list_dir(local_directory).await? {
                let local_path = local_directory.join(name.trim_end_matches(SEPARATOR));
                let remote_path = format!("{}{}", urn.path(), name);

                if name.ends_with(SEPARATOR) {
                    if !self.client.check(&remote_path).await? {
                        self.client.mkdir(&remote_path).await?;
                        updated = true;
                    }
                    let pushed = self.push(&remote_path, &local_path).await?;
                    updated = updated || pushed;
                    continue;
                }

                if remote_names.contains(&name) {
                    match self.push_decision(&local_path, &remote_path).await {
                        SmartSyncDecision::Transfer => {}
                        SmartSyncDecision::UpToDate => {
                            debug!("Skipping {}: remote copy is up to date", local_path.display());
                            continue;
                        }
                        SmartSyncDecision::Undetermined => {
                            debug!(
                                "Skipping {}: cannot determine which copy is newer",
                                local_path.display()
                            );
                            continue;
                        }
                    }
                }

                self.client.upload_file(&remote_path, &local_path).await?;
                self.align_local_mtime(&remote_path, &local_path).await;
                info!("⬆️ Pushed {} to {}", local_path.display(), remote_path);
                updated = true;
            }

            Ok(updated)
        }
        .boxed()
    }

    /// Downloads remote files missing locally or newer than their local copy.
    ///
    /// Returns whether anything was created or downloaded.
    pub fn pull<'a>(
        &'a self,
        remote_directory: &'a str,
        local_directory: &'a Path,
    ) -> BoxFuture<'a, Result<bool>> {
        async move {
            let urn = Urn::dir(remote_directory);
            self.validate_remote_directory(&urn).await?;
            self.validate_local_directory(local_directory).await?;

            let local_names = local::list_dir(local_directory).await?;
            let mut updated = false;

            for name in self.client.list(&urn.path()).await? {
                let local_path = local_directory.join(name.trim_end_matches(SEPARATOR));
                let remote_path = format!("{}{}", urn.path(), name);

                if name.ends_with(SEPARATOR) {
                    if !local::exists(&local_path).await {
                        local::create_dir_all(&local_path).await?;
                        updated = true;
                    }
                    let pulled = self.pull(&remote_path, &local_path).await?;
                    updated = updated || pulled;
                    continue;
                }

                if local_names.contains(&name) {
                    match self.pull_decision(&remote_path, &local_path).await {
                        SmartSyncDecision::Transfer => {}
                        SmartSyncDecision::UpToDate => {
                            debug!("Skipping {}: local copy is up to date", remote_path);
                            continue;
                        }
                        SmartSyncDecision::Undetermined => {
                            debug!(
                                "Skipping {}: cannot determine which copy is newer",
                                remote_path
                            );
                            continue;
                        }
                    }
                }

                self.client.download_file(&remote_path, &local_path).await?;
                self.align_local_mtime(&remote_path, &local_path).await;
                info!("⬇️ Pulled {} to {}", remote_path, local_path.display());
                updated = true;
            }

            Ok(updated)
        }
        .boxed()
    }

    /// Pulls, then pushes what is left
    pub async fn sync(&self, remote_directory: &str, local_directory: &Path) -> Result<bool> {
        info!("🔄 Syncing {} with {}", remote_directory, local_directory.display());
        let pulled = self.pull(remote_directory, local_directory).await?;
        let pushed = self.push(remote_directory, local_directory).await?;
        Ok(pulled || pushed)
    }
}
