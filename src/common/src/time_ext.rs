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

//! Durations written the way operators type them in config files, e.g.
//! `30s`, `1m30s` or `250ms`.

use std::{fmt, str::FromStr, time::Duration};

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

const MILLIS_PER_SECOND: u64 = 1000;
const MILLIS_PER_MINUTE: u64 = MILLIS_PER_SECOND * 60;
const MILLIS_PER_HOUR: u64 = MILLIS_PER_MINUTE * 60;

/// Units in descending order, each paired with its length in milliseconds.
const UNITS: [(&str, u64); 4] = [
    ("h", MILLIS_PER_HOUR),
    ("m", MILLIS_PER_MINUTE),
    ("s", MILLIS_PER_SECOND),
    ("ms", 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Ord, PartialOrd, Default)]
pub struct ReadableDuration(pub Duration);

impl ReadableDuration {
    pub const fn millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub const fn secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn minutes(minutes: u64) -> Self {
        Self::secs(minutes * 60)
    }

    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for ReadableDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<ReadableDuration> for Duration {
    fn from(d: ReadableDuration) -> Self {
        d.0
    }
}

impl FromStr for ReadableDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty duration".to_string());
        }

        let mut rest = s;
        let mut total = 0u64;
        // Index into UNITS of the last unit seen, units must strictly descend.
        let mut last_unit: Option<usize> = None;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("expect a number in duration:{s}"));
            }
            let value: u64 = rest[..digits]
                .parse()
                .map_err(|e| format!("invalid number in duration:{s}, err:{e}"))?;
            rest = &rest[digits..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(rest.len());
            let unit = &rest[..unit_len];
            let unit_idx = UNITS
                .iter()
                .position(|(name, _)| *name == unit)
                .ok_or_else(|| format!("unknown unit:{unit:?} in duration:{s}, expect h, m, s or ms"))?;
            if last_unit.is_some_and(|last| last >= unit_idx) {
                return Err(format!("units must be in order h, m, s, ms, duration:{s}"));
            }
            last_unit = Some(unit_idx);
            rest = &rest[unit_len..];

            total = value
                .checked_mul(UNITS[unit_idx].1)
                .and_then(|v| v.checked_add(total))
                .ok_or_else(|| format!("duration overflow:{s}"))?;
        }

        Ok(Self::millis(total))
    }
}

impl fmt::Display for ReadableDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.as_millis();
        if remaining == 0 {
            return write!(f, "0s");
        }

        for (name, len) in UNITS {
            if remaining >= len {
                write!(f, "{}{name}", remaining / len)?;
                remaining %= len;
            }
        }
        Ok(())
    }
}

impl Serialize for ReadableDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReadableDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = ReadableDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a duration such as 30s or 1m30s")
            }

            fn visit_str<E>(self, v: &str) -> Result<ReadableDuration, E>
            where
                E: de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(DurationVisitor)
    }
}
