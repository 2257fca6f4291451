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

use crate::{ensure, listing::FolderEntry, path::VirtualPath, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: VirtualPath,
}

/// Current folder of a browsing session. Pure state, it never checks that
/// the folder exists in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    current: VirtualPath,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(path: VirtualPath) -> Self {
        Self { current: path }
    }

    pub fn current(&self) -> &VirtualPath {
        &self.current
    }

    pub fn go_to(&mut self, path: VirtualPath) {
        self.current = path;
    }

    /// Descends into a direct child folder.
    pub fn enter(&mut self, name: &str) -> Result<()> {
        self.current = self.current.join(name)?;
        Ok(())
    }

    pub fn open(&mut self, folder: &FolderEntry) {
        self.current = folder.full_path.clone();
    }

    /// Moves to the parent folder, returns false when already at the root.
    pub fn up(&mut self) -> bool {
        if self.current.is_root() {
            return false;
        }
        self.current = self.current.parent();
        true
    }

    /// Jumps to the breadcrumb at `index`, 0 being the top level folder.
    pub fn go_to_breadcrumb(&mut self, index: usize) -> Result<()> {
        let depth = self.current.segments().len();
        ensure!(
            index < depth,
            "breadcrumb index:{index} out of range, depth:{depth}"
        );
        let mut path = self.current.clone();
        for _ in index + 1..depth {
            path = path.parent();
        }
        self.current = path;
        Ok(())
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let mut path = VirtualPath::root();
        self.current
            .segments()
            .iter()
            .map(|segment| {
                path = path.child(segment);
                Breadcrumb {
                    name: segment.clone(),
                    path: path.clone(),
                }
            })
            .collect()
    }
}
