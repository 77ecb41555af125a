/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/firmware/version.rs
// Current/available firmware versions, the mlxfwmanager XML query
// format, and the retry policy wrapped around version queries.

use std::cell::Cell;
use std::time::Duration;

use backon::{BlockingRetryable, ConstantBuilder};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::firmware::error::{FirmwareError, FirmwareResult};

pub const DEFAULT_QUERY_ATTEMPTS: usize = 10;
pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPair {
    pub current: String,
    pub available: String,
}

impl VersionPair {
    pub fn new(current: impl Into<String>, available: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            available: available.into(),
        }
    }

    // is_upgrade_required is plain string inequality; no semantic
    // version ordering is applied.
    pub fn is_upgrade_required(&self) -> bool {
        self.current != self.available
    }
}

// DevicesXml is the root of `mlxfwmanager --query-format XML -d <pci>`.
#[derive(Debug, Deserialize)]
struct DevicesXml {
    #[serde(rename = "Device", default)]
    devices: Vec<DeviceXml>,
}

#[derive(Debug, Deserialize)]
struct DeviceXml {
    #[serde(rename = "@psid", default)]
    psid: String,
    #[serde(rename = "Versions", default)]
    versions: Option<VersionsXml>,
}

#[derive(Debug, Deserialize)]
struct VersionsXml {
    #[serde(rename = "FW", default)]
    fw: Option<VersionXml>,
}

#[derive(Debug, Deserialize)]
struct VersionXml {
    #[serde(rename = "@current", default)]
    current: String,
}

// DeviceQuery is what version lookup needs from the device query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceQuery {
    pub current_version: String,
    pub psid: String,
}

// parse_device_query extracts the running FW version and the PSID of
// the first device in mlxfwmanager XML output.
pub fn parse_device_query(xml: &str) -> FirmwareResult<DeviceQuery> {
    let parsed: DevicesXml = from_str(xml.trim()).map_err(|e| FirmwareError::Parse {
        tool: "mlxfwmanager",
        reason: e.to_string(),
    })?;

    let device = parsed
        .devices
        .into_iter()
        .next()
        .ok_or_else(|| FirmwareError::Parse {
            tool: "mlxfwmanager",
            reason: "no Device element in response".to_string(),
        })?;

    let current_version = device
        .versions
        .and_then(|v| v.fw)
        .map(|fw| fw.current.trim().to_string())
        .unwrap_or_default();
    let psid = device.psid.trim().to_string();

    if current_version.is_empty() || psid.is_empty() {
        return Err(FirmwareError::Parse {
            tool: "mlxfwmanager",
            reason: "Version or PSID not found in response".to_string(),
        });
    }

    Ok(DeviceQuery {
        current_version,
        psid,
    })
}

// RetryPolicy bounds how often a version query is attempted, with a
// constant pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_QUERY_ATTEMPTS,
            delay: DEFAULT_QUERY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    // query_versions runs `query` until it succeeds or the attempts are
    // exhausted. The final failure is reported as VersionQuery.
    pub fn query_versions<F>(&self, asic_index: usize, query: F) -> FirmwareResult<VersionPair>
    where
        F: FnMut() -> FirmwareResult<VersionPair>,
    {
        let attempts = self.attempts.max(1);
        let attempt = Cell::new(1usize);
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(attempts - 1);

        let result = query
            .retry(backoff)
            .notify(|err, _| {
                info!(
                    asic = asic_index,
                    "Unable to get firmware versions (attempt {}/{attempts}): {err}, retrying...",
                    attempt.get()
                );
                attempt.set(attempt.get() + 1);
            })
            .call();

        result.map_err(|err| {
            error!(
                asic = asic_index,
                "Failed to get firmware versions after {attempts} attempts: {err}"
            );
            FirmwareError::VersionQuery {
                asic_index,
                attempts,
                reason: err.to_string(),
            }
        })
    }
}
