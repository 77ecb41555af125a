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

// src/platform/paths.rs
// PlatformPaths gathers every filesystem location the firmware manager
// reads or writes. The defaults are the production SONiC locations;
// relocated() moves all of them under a root directory, which is how
// the tests build throwaway platforms.

use std::path::{Path, PathBuf};

pub const DEFAULT_MACHINE_CONF: &str = "/host/machine.conf";
pub const DEFAULT_DEVICE_DIR: &str = "/usr/share/sonic/device";
pub const DEFAULT_FW_ROOT: &str = "/etc/mlnx";
pub const DEFAULT_HOST_DIR: &str = "/host";
pub const DEFAULT_IMAGE_MOUNT_DIR: &str = "/tmp";
pub const DEFAULT_MOUNTS_FILE: &str = "/proc/mounts";
pub const DEFAULT_LOCK_FILE: &str = "/tmp/mlxfwmanager-lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPaths {
    // machine_conf is the KEY=VALUE file carrying onie_platform.
    pub machine_conf: PathBuf,
    // device_dir holds one directory per platform, each of which may
    // contain an asic.conf.
    pub device_dir: PathBuf,
    // default_fw_root is where the installed image keeps fw-*.mfa files.
    pub default_fw_root: PathBuf,
    // host_dir contains the image-<tag> directories of installed images.
    pub host_dir: PathBuf,
    // image_mount_dir is where next-image squashfs filesystems get
    // mounted (as image-<tag>-fs).
    pub image_mount_dir: PathBuf,
    // mounts_file is the mount table consulted before mounting.
    pub mounts_file: PathBuf,
    // lock_file is the advisory lock shared by all mutating runs.
    pub lock_file: PathBuf,
}

impl Default for PlatformPaths {
    fn default() -> Self {
        Self {
            machine_conf: PathBuf::from(DEFAULT_MACHINE_CONF),
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
            default_fw_root: PathBuf::from(DEFAULT_FW_ROOT),
            host_dir: PathBuf::from(DEFAULT_HOST_DIR),
            image_mount_dir: PathBuf::from(DEFAULT_IMAGE_MOUNT_DIR),
            mounts_file: PathBuf::from(DEFAULT_MOUNTS_FILE),
            lock_file: PathBuf::from(DEFAULT_LOCK_FILE),
        }
    }
}

impl PlatformPaths {
    // relocated re-roots every default path under root, e.g.
    // /host/machine.conf becomes <root>/host/machine.conf.
    pub fn relocated(root: &Path) -> Self {
        let under = |p: &str| root.join(p.trim_start_matches('/'));
        Self {
            machine_conf: under(DEFAULT_MACHINE_CONF),
            device_dir: under(DEFAULT_DEVICE_DIR),
            default_fw_root: under(DEFAULT_FW_ROOT),
            host_dir: under(DEFAULT_HOST_DIR),
            image_mount_dir: under(DEFAULT_IMAGE_MOUNT_DIR),
            mounts_file: under(DEFAULT_MOUNTS_FILE),
            lock_file: under(DEFAULT_LOCK_FILE),
        }
    }

    pub fn with_lock_file(mut self, lock_file: impl Into<PathBuf>) -> Self {
        self.lock_file = lock_file.into();
        self
    }

    pub fn with_default_fw_root(mut self, fw_root: impl Into<PathBuf>) -> Self {
        self.default_fw_root = fw_root.into();
        self
    }

    // asic_conf returns the asic.conf location for a platform.
    pub fn asic_conf(&self, platform: &str) -> PathBuf {
        self.device_dir.join(platform).join("asic.conf")
    }

    // image_dir returns /host/image-<tag>.
    pub fn image_dir(&self, tag: &str) -> PathBuf {
        self.host_dir.join(format!("image-{tag}"))
    }

    // image_mount_point returns /tmp/image-<tag>-fs.
    pub fn image_mount_point(&self, tag: &str) -> PathBuf {
        self.image_mount_dir.join(format!("image-{tag}-fs"))
    }
}
