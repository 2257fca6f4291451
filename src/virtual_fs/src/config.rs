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

use std::time::Duration;

use common::ReadableDuration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FsConfig {
    /// Entries requested per listing page, the store is paged until
    /// exhausted.
    pub list_page_size: usize,
    /// Bound on every single store call, a timeout is reported like any
    /// other store failure.
    pub op_timeout: ReadableDuration,
    /// Max in-flight sibling uploads or copies.
    pub max_concurrency: usize,
    pub public_base_url: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            list_page_size: 100,
            op_timeout: ReadableDuration::secs(30),
            max_concurrency: 4,
            public_base_url: "http://localhost/storage".to_string(),
        }
    }
}

impl FsConfig {
    pub fn op_timeout(&self) -> Duration {
        self.op_timeout.into()
    }

    pub(crate) fn page_size(&self) -> usize {
        self.list_page_size.max(1)
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config: FsConfig = toml::from_str(
            r#"
list_page_size = 10
op_timeout = "5s"
"#,
        )
        .unwrap();
        assert_eq!(config.list_page_size, 10);
        assert_eq!(config.op_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_concurrency, 4);

        assert!(toml::from_str::<FsConfig>("unknown = 1").is_err());
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = FsConfig {
            list_page_size: 0,
            max_concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.page_size(), 1);
        assert_eq!(config.concurrency(), 1);
    }
}
