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

// src/cmd/lock.rs
// StateLock serializes every state-changing invocation on the host with
// an exclusive flock on a well-known file. The lock is held for the
// lifetime of the value and released when it is dropped.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{FlockArg, flock};
use tracing::{info, warn};

use crate::firmware::error::{FirmwareError, FirmwareResult};

#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    // acquire blocks until the exclusive lock is held.
    pub fn acquire(path: &Path) -> FirmwareResult<Self> {
        info!("Locking {} from CLI", path.display());
        let file = open_lock_file(path)?;
        flock(file.as_raw_fd(), FlockArg::LockExclusive).map_err(|e| lock_error(path, e))?;
        info!("Locked {} from CLI", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    // try_acquire takes the lock only if nobody else holds it.
    pub fn try_acquire(path: &Path) -> FirmwareResult<Option<Self>> {
        let file = open_lock_file(path)?;
        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(Errno::EWOULDBLOCK) => Ok(None),
            Err(e) => Err(lock_error(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        info!("Unlocking {} from CLI", self.path.display());
        if let Err(e) = flock(self.file.as_raw_fd(), FlockArg::Unlock) {
            warn!("Failed to unlock: {e}");
        }
    }
}

fn open_lock_file(path: &Path) -> FirmwareResult<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| FirmwareError::Lock {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn lock_error(path: &Path, errno: Errno) -> FirmwareError {
    FirmwareError::Lock {
        path: path.to_path_buf(),
        reason: errno.to_string(),
    }
}
