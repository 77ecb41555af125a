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

// src/platform/probe.rs
// Platform identity comes from /host/machine.conf, a line-oriented
// KEY=VALUE file written by ONIE at install time.

use std::fs;

use tracing::{error, info};

use crate::platform::error::{PlatformError, PlatformResult};
use crate::platform::paths::PlatformPaths;

const ONIE_PLATFORM_KEY: &str = "onie_platform";

// key_values yields trimmed (key, value) pairs from KEY=VALUE content,
// skipping blank lines, comments and lines without '='.
pub fn key_values(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        line.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
    })
}

// detect_platform returns the onie_platform value from machine.conf.
pub fn detect_platform(paths: &PlatformPaths) -> PlatformResult<String> {
    let path = &paths.machine_conf;
    if !path.exists() {
        error!("Platform configuration file not found: {}", path.display());
        return Err(PlatformError::MachineConfNotFound(path.clone()));
    }

    let content = fs::read_to_string(path).map_err(|source| {
        error!("Platform detection failed: {source}");
        PlatformError::Io {
            path: path.clone(),
            source,
        }
    })?;

    match key_values(&content).find(|(key, _)| *key == ONIE_PLATFORM_KEY) {
        Some((_, platform)) if !platform.is_empty() => {
            info!("Detected platform: {platform}");
            Ok(platform.to_string())
        }
        _ => {
            error!(
                "Could not find {ONIE_PLATFORM_KEY} variable in {}",
                path.display()
            );
            Err(PlatformError::PlatformNotFound(path.clone()))
        }
    }
}
