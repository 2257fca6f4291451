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

//! A hierarchical folder view over a flat object store.
//!
//! Folders are never stored. A folder exists while at least one key lives
//! beneath it, either a file or the zero byte `.folder` marker written when
//! the folder is created explicitly. Every listing is computed from the
//! store when asked, nothing is cached.

pub mod config;
mod error;
pub mod file;
pub mod filesystem;
pub mod folder;
pub mod listing;
mod macros;
pub mod navigation;
pub mod operation;
pub mod path;
pub mod store;
#[cfg(test)]
mod test_util;

pub use error::{
    AnyhowError, Error, GenericError, Result, Stage, StoreError, StoreErrorKind, StoreResult,
};
pub use filesystem::VirtualFileSystem;
pub use listing::{DirectoryEntry, FileEntry, FolderEntry};
pub use navigation::{Breadcrumb, Navigator};
pub use path::VirtualPath;
pub use tokio_util::sync::CancellationToken;
