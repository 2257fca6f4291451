// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Entry point for callers such as a UI or the CLI.
//!
//! There is no locking: concurrent operations on overlapping paths are not
//! coordinated and the last write to a key wins. Composite operations are
//! not atomic, their errors tell which stage failed and whether the store
//! was left in a mixed state.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    config::FsConfig,
    ensure, file, folder,
    listing::{self, DirectoryEntry, FileEntry, FolderEntry},
    operation::Operation,
    path::VirtualPath,
    store::ObjectStoreAdapterRef,
    Result,
};

pub struct VirtualFileSystem {
    store: ObjectStoreAdapterRef,
    config: FsConfig,
}

impl VirtualFileSystem {
    pub fn new(store: ObjectStoreAdapterRef, config: FsConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    fn operation(&self, cancel: &CancellationToken) -> Operation {
        Operation::new(self.store.clone(), &self.config, cancel.clone())
    }

    pub async fn list_directory(&self, path: &VirtualPath) -> Result<Vec<DirectoryEntry>> {
        let op = self.operation(&CancellationToken::new());
        listing::list_directory(&op, path).await
    }

    /// Looks up `path` in its parent's listing. A file and a folder may
    /// share the name, `folder` selects which one.
    pub async fn find_entry(
        &self,
        path: &VirtualPath,
        folder: bool,
    ) -> Result<Option<DirectoryEntry>> {
        let Some(name) = path.name() else {
            return Ok(None);
        };
        let entries = self.list_directory(&path.parent()).await?;

        Ok(entries
            .into_iter()
            .find(|e| e.is_folder() == folder && e.name() == name))
    }

    /// Creating an existing folder succeeds and leaves a single entry.
    pub async fn create_folder(&self, parent: &VirtualPath, name: &str) -> Result<FolderEntry> {
        let op = self.operation(&CancellationToken::new());
        let full_path = folder::create(&op, parent, name).await?;

        Ok(FolderEntry {
            name: name.to_string(),
            full_path,
        })
    }

    pub async fn delete_entry(&self, entry: &DirectoryEntry) -> Result<()> {
        self.delete_entry_with_cancel(entry, &CancellationToken::new())
            .await
    }

    pub async fn delete_entry_with_cancel(
        &self,
        entry: &DirectoryEntry,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let op = self.operation(cancel);
        match entry {
            DirectoryEntry::Folder(v) => folder::delete_recursive(&op, &v.full_path)
                .await
                .map(|_| ()),
            DirectoryEntry::File(v) => file::delete(&op, &v.full_path).await,
        }
    }

    /// Renames within the same parent folder.
    pub async fn rename_entry(&self, entry: &DirectoryEntry, new_name: &str) -> Result<DirectoryEntry> {
        self.rename_entry_with_cancel(entry, new_name, &CancellationToken::new())
            .await
    }

    pub async fn rename_entry_with_cancel(
        &self,
        entry: &DirectoryEntry,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        let dest = entry.full_path().parent().join(new_name)?;
        self.relocate(entry, dest, cancel).await
    }

    /// Moves `entry` into `dest_parent`, keeping its name.
    pub async fn move_entry(
        &self,
        entry: &DirectoryEntry,
        dest_parent: &VirtualPath,
    ) -> Result<DirectoryEntry> {
        self.move_entry_with_cancel(entry, dest_parent, &CancellationToken::new())
            .await
    }

    pub async fn move_entry_with_cancel(
        &self,
        entry: &DirectoryEntry,
        dest_parent: &VirtualPath,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        let dest = dest_parent.join(entry.name())?;
        self.relocate(entry, dest, cancel).await
    }

    async fn relocate(
        &self,
        entry: &DirectoryEntry,
        dest: VirtualPath,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        let op = self.operation(cancel);
        match entry {
            DirectoryEntry::Folder(v) => {
                folder::rename(&op, &v.full_path, &dest).await?;
                Ok(DirectoryEntry::Folder(self.folder_entry(dest)))
            }
            DirectoryEntry::File(v) => {
                file::rename(&op, &v.full_path, &dest).await?;
                Ok(DirectoryEntry::File(self.file_entry(dest)))
            }
        }
    }

    pub async fn upload_file(&self, path: &VirtualPath, bytes: Bytes) -> Result<FileEntry> {
        let op = self.operation(&CancellationToken::new());
        file::upload(&op, path, bytes).await?;

        Ok(self.file_entry(path.clone()))
    }

    /// Uploads plain files into `dir`, names must be single segments.
    pub async fn upload_files(
        &self,
        dir: &VirtualPath,
        files: Vec<(String, Bytes)>,
    ) -> Result<Vec<VirtualPath>> {
        let files = files
            .into_iter()
            .map(|(name, bytes)| Ok((dir.join(&name)?, bytes)))
            .collect::<Result<Vec<_>>>()?;
        let op = self.operation(&CancellationToken::new());
        file::upload_many(&op, files).await
    }

    /// Uploads a tree given as `(relative path, bytes)` pairs under `dir`.
    /// Intermediate folders get no marker, they show up through their
    /// files.
    pub async fn upload_files_under_relative_paths(
        &self,
        dir: &VirtualPath,
        pairs: Vec<(String, Bytes)>,
    ) -> Result<Vec<VirtualPath>> {
        self.upload_files_under_relative_paths_with_cancel(dir, pairs, &CancellationToken::new())
            .await
    }

    pub async fn upload_files_under_relative_paths_with_cancel(
        &self,
        dir: &VirtualPath,
        pairs: Vec<(String, Bytes)>,
        cancel: &CancellationToken,
    ) -> Result<Vec<VirtualPath>> {
        let mut files = Vec::with_capacity(pairs.len());
        for (relative, bytes) in pairs {
            let relative = VirtualPath::parse(&relative)?;
            ensure!(!relative.is_root(), "relative path must not be empty");
            files.push((dir.join_relative(&relative), bytes));
        }
        let op = self.operation(cancel);
        file::upload_many(&op, files).await
    }

    pub async fn download_file(&self, path: &VirtualPath) -> Result<Bytes> {
        let op = self.operation(&CancellationToken::new());
        file::download(&op, path).await
    }

    pub fn public_url(&self, path: &VirtualPath) -> String {
        self.store.public_url(&path.to_key())
    }

    fn folder_entry(&self, full_path: VirtualPath) -> FolderEntry {
        FolderEntry {
            name: full_path.name().unwrap_or_default().to_string(),
            full_path,
        }
    }

    fn file_entry(&self, full_path: VirtualPath) -> FileEntry {
        FileEntry {
            name: full_path.name().unwrap_or_default().to_string(),
            public_url: self.public_url(&full_path),
            full_path,
        }
    }
}
