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

// src/coordinator/image.rs
// Resolution of the firmware root: either the running image's default
// location, or the firmware shipped with the next-boot SONiC image.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::exec::command::CommandSpec;
use crate::exec::runner::CommandRunner;
use crate::firmware::error::{FirmwareError, FirmwareResult};
use crate::platform::paths::PlatformPaths;

pub const SONIC_IMAGE_PREFIX: &str = "SONiC-OS-";

// InstalledImages is the relevant part of `sonic-installer list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledImages {
    pub current: Option<String>,
    pub next: Option<String>,
}

// parse_installer_list picks the `Current:` and `Next:` lines.
pub fn parse_installer_list(output: &str) -> InstalledImages {
    let mut images = InstalledImages {
        current: None,
        next: None,
    };
    for line in output.lines() {
        if let Some(next) = line.strip_prefix("Next:") {
            images.next = Some(next.trim().to_string()).filter(|s| !s.is_empty());
        } else if let Some(current) = line.strip_prefix("Current:") {
            images.current = Some(current.trim().to_string()).filter(|s| !s.is_empty());
        }
    }
    images
}

// image_tag turns "SONiC-OS-202505.1" into "202505.1".
pub fn image_tag(image: &str) -> &str {
    image.strip_prefix(SONIC_IMAGE_PREFIX).unwrap_or(image)
}

// is_mounted reports whether mount_point appears as a mount target in
// the given mount table (/proc/mounts format).
pub fn is_mounted(mounts_file: &Path, mount_point: &Path) -> bool {
    let Ok(table) = fs::read_to_string(mounts_file) else {
        return false;
    };
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|target| Path::new(target) == mount_point)
}

// resolve_fw_root returns the directory fw-<type>.mfa files are read from.
pub fn resolve_fw_root(
    from_image: bool,
    paths: &PlatformPaths,
    runner: &dyn CommandRunner,
) -> FirmwareResult<PathBuf> {
    if !from_image {
        return Ok(paths.default_fw_root.clone());
    }
    next_image_fw_root(paths, runner).inspect_err(|e| {
        error!("Failed to get firmware path from image: {e}");
    })
}

fn next_image_fw_root(paths: &PlatformPaths, runner: &dyn CommandRunner) -> FirmwareResult<PathBuf> {
    let spec = CommandSpec::new("sonic-installer").arg("list");
    let output = runner.run(&spec).map_err(|source| FirmwareError::Spawn {
        command: spec.to_string(),
        source,
    })?;
    if !output.success() {
        let stderr = output.stderr.trim();
        return Err(FirmwareError::ImageSource(format!(
            "Failed to get SONiC image list: {}",
            if stderr.is_empty() { "Unknown error" } else { stderr }
        )));
    }

    let images = parse_installer_list(&output.stdout);
    let next = images
        .next
        .ok_or_else(|| FirmwareError::ImageSource("No next SONiC image found".to_string()))?;
    info!(
        current = images.current.as_deref().unwrap_or("unknown"),
        next = %next,
        "Resolving firmware from next SONiC image"
    );

    let tag = image_tag(&next);
    let image_dir = paths.image_dir(tag);

    let platform_fw = image_dir.join("platform").join("fw").join("asic");
    if platform_fw.is_dir() {
        info!("Using FW binaries from {}", platform_fw.display());
        return Ok(platform_fw);
    }

    let squashfs = image_dir.join("fs.squashfs");
    let mount_point = paths.image_mount_point(tag);
    let fw_root = mount_point.join("etc").join("mlnx");
    info!("Using FW binaries from {}", fw_root.display());

    fs::create_dir_all(&mount_point).map_err(|e| {
        FirmwareError::ImageSource(format!(
            "Failed to create mount point directory {}: {e}",
            mount_point.display()
        ))
    })?;

    if is_mounted(&paths.mounts_file, &mount_point) {
        debug!(mount_point = %mount_point.display(), "Image filesystem already mounted");
        return Ok(fw_root);
    }

    let spec = CommandSpec::new("mount")
        .args(["-t", "squashfs", "-o", "ro"])
        .arg(squashfs.display().to_string())
        .arg(mount_point.display().to_string());
    let output = runner.run(&spec).map_err(|source| FirmwareError::Spawn {
        command: spec.to_string(),
        source,
    })?;
    if !output.success() {
        let stderr = output.stderr.trim();
        return Err(FirmwareError::ImageSource(format!(
            "Failed to mount {}: {}",
            squashfs.display(),
            if stderr.is_empty() { "Unknown error" } else { stderr }
        )));
    }

    Ok(fw_root)
}
