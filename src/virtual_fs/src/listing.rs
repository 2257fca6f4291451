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

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::{
    operation::Operation,
    path::{classify_key, KeyShape, VirtualPath},
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub full_path: VirtualPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub full_path: VirtualPath,
    pub public_url: String,
}

/// One item of a directory listing. A folder and a file may share a name,
/// they are independent entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    Folder(FolderEntry),
    File(FileEntry),
}

impl DirectoryEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(v) => &v.name,
            Self::File(v) => &v.name,
        }
    }

    pub fn full_path(&self) -> &VirtualPath {
        match self {
            Self::Folder(v) => &v.full_path,
            Self::File(v) => &v.full_path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }
}

/// Lists `path`: folders first, then files, each sorted by name.
///
/// Folders come from marker keys one level down and from sub-prefixes
/// reported by the store. The marker of `path` itself and anything nested
/// deeper are left out. Any store error fails the whole listing.
pub async fn list_directory(op: &Operation, path: &VirtualPath) -> Result<Vec<DirectoryEntry>> {
    let prefix = path.to_key();
    let listing = op.list_all(&prefix).await?;

    let mut folders = BTreeSet::new();
    let mut files = BTreeMap::new();
    for key in &listing.keys {
        match classify_key(&prefix, key) {
            KeyShape::File(name) => {
                files.insert(name.to_string(), key.as_str());
            }
            KeyShape::FolderMarker(name) => {
                folders.insert(name.to_string());
            }
            KeyShape::OwnMarker | KeyShape::Other => {}
        }
    }
    for sub_prefix in &listing.common_prefixes {
        // A sub-prefix has the shape of a file key one level down.
        if let KeyShape::File(name) = classify_key(&prefix, sub_prefix) {
            folders.insert(name.to_string());
        }
    }
    debug!(
        path = %path,
        folders = folders.len(),
        files = files.len(),
        "List directory"
    );

    let folders = folders.into_iter().map(|name| {
        DirectoryEntry::Folder(FolderEntry {
            full_path: path.child(&name),
            name,
        })
    });
    let files = files.into_iter().map(|(name, key)| {
        DirectoryEntry::File(FileEntry {
            full_path: path.child(&name),
            public_url: op.public_url(key),
            name,
        })
    });

    Ok(folders.chain(files).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::{
        config::FsConfig,
        test_util::{Fault, FaultyStore},
        Error, Stage,
    };

    async fn list(store: &Arc<FaultyStore>, path: &str) -> Result<Vec<DirectoryEntry>> {
        let op = Operation::new(store.clone(), &FsConfig::default(), CancellationToken::new());
        list_directory(&op, &VirtualPath::parse(path).unwrap()).await
    }

    fn names(entries: &[DirectoryEntry]) -> Vec<(bool, &str)> {
        entries.iter().map(|e| (e.is_folder(), e.name())).collect()
    }

    #[test(tokio::test)]
    async fn test_marker_and_file_at_root() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("a/.folder", b"").await;
        store.put("b", b"data").await;

        let entries = list(&store, "").await.unwrap();
        assert_eq!(names(&entries), vec![(true, "a"), (false, "b")]);
        match &entries[1] {
            DirectoryEntry::File(file) => {
                assert_eq!(file.full_path.to_key(), "b");
                assert_eq!(file.public_url, "http://files.test/b");
            }
            other => panic!("expect file, got {other:?}"),
        }
    }

    #[test(tokio::test)]
    async fn test_folders_before_files_sorted() {
        let store = Arc::new(FaultyStore::in_memory());
        for key in ["z.txt", "a.txt", "m/.folder", "c/x.txt", "b/.folder", "b/y.txt"] {
            store.put(key, b"").await;
        }

        let entries = list(&store, "").await.unwrap();
        assert_eq!(
            names(&entries),
            vec![
                (true, "b"),
                (true, "c"),
                (true, "m"),
                (false, "a.txt"),
                (false, "z.txt")
            ]
        );
    }

    #[test(tokio::test)]
    async fn test_nested_keys_are_not_direct_children() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("a/.folder", b"").await;
        store.put("a/top.txt", b"").await;
        store.put("a/b/c.txt", b"").await;

        let entries = list(&store, "a").await.unwrap();
        assert_eq!(names(&entries), vec![(true, "b"), (false, "top.txt")]);
        assert_eq!(entries[0].full_path().to_key(), "a/b");

        let entries = list(&store, "a/b").await.unwrap();
        assert_eq!(names(&entries), vec![(false, "c.txt")]);
    }

    #[test(tokio::test)]
    async fn test_same_name_file_and_folder() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("report", b"file").await;
        store.put("report/part1", b"").await;

        let entries = list(&store, "").await.unwrap();
        assert_eq!(names(&entries), vec![(true, "report"), (false, "report")]);
    }

    #[test(tokio::test)]
    async fn test_empty_and_missing_directory() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("empty/.folder", b"").await;

        assert!(list(&store, "empty").await.unwrap().is_empty());
        assert!(list(&store, "missing").await.unwrap().is_empty());
    }

    #[test(tokio::test)]
    async fn test_listing_failure_returns_nothing() {
        let store = Arc::new(FaultyStore::in_memory());
        store.put("a.txt", b"").await;
        store.inject(Fault::List { nth: 1 });

        let err = list(&store, "").await.unwrap_err();
        assert!(matches!(err, Error::Store { stage: Stage::List, .. }));
    }

    #[test(tokio::test)]
    async fn test_listing_spans_pages() {
        let store = Arc::new(FaultyStore::in_memory());
        for i in 0..7 {
            store.put(&format!("big/f{i}.bin"), b"").await;
        }
        store.put("big/sub/.folder", b"").await;

        let config = FsConfig {
            list_page_size: 3,
            ..Default::default()
        };
        let op = Operation::new(store.clone(), &config, CancellationToken::new());
        let entries = list_directory(&op, &VirtualPath::parse("big").unwrap())
            .await
            .unwrap();
        assert_eq!(entries.len(), 8);
        assert!(entries[0].is_folder());
    }
}
