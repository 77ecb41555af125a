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

use std::path::PathBuf;

use thiserror::Error;

// PlatformError covers failures while identifying the platform and
// discovering its ASICs. Any of these prevents the coordinator from
// being constructed.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Platform configuration file not found: {}", .0.display())]
    MachineConfNotFound(PathBuf),

    #[error("Could not find onie_platform variable in {}", .0.display())]
    PlatformNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to run lspci: {0}")]
    LspciFailed(String),

    #[error("No Mellanox ASIC detected in the system")]
    NoAsicDetected,
}

// PlatformResult is a result type alias for platform probing.
pub type PlatformResult<T> = Result<T, PlatformError>;
