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

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::inventory::asic::{AsicFamily, AsicType};
use crate::platform::error::PlatformError;

// Operation names a fan-out operation whose per-ASIC outcomes are
// aggregated into all-failed / partial / success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upgrade,
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upgrade => f.write_str("ASIC upgrades"),
            Operation::Reset => f.write_str("BlueField ASIC resets"),
        }
    }
}

// FirmwareError is the error type for firmware management, from
// per-ASIC manager construction through aggregated outcomes.
#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("Unsupported ASIC type '{asic_type}' for ASIC {asic_index}")]
    UnsupportedAsicType {
        asic_index: usize,
        asic_type: AsicType,
    },

    #[error("Firmware file not found: {}", .0.display())]
    FirmwareFileNotFound(PathBuf),

    #[error(
        "Could not retrieve firmware versions for ASIC {asic_index} after {attempts} attempts: {reason}"
    )]
    VersionQuery {
        asic_index: usize,
        attempts: usize,
        reason: String,
    },

    #[error("Firmware versions are unknown for ASIC {0}")]
    VersionUnknown(usize),

    #[error("Failed to parse {tool} output: {reason}")]
    Parse { tool: &'static str, reason: String },

    // CommandFailed is a vendor tool that ran but exited non-zero.
    #[error("Command failed: {command}\n{details}")]
    CommandFailed { command: String, details: String },

    // Spawn is a tool that could not be executed at all.
    #[error("Failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{operation} is not supported on {family} ASIC {asic_index}")]
    Unsupported {
        operation: &'static str,
        family: AsicFamily,
        asic_index: usize,
    },

    #[error("Image source error: {0}")]
    ImageSource(String),

    #[error("Failed to start worker for ASIC {asic_index}: {reason}")]
    WorkerLaunch { asic_index: usize, reason: String },

    #[error("Failed to acquire lock {}: {reason}", .path.display())]
    Lock { path: PathBuf, reason: String },

    #[error("No BlueField ASICs found for reset operation")]
    NoBluefieldAsics,

    #[error("All {operation} failed")]
    AllFailed {
        operation: Operation,
        failed: usize,
        total: usize,
    },

    #[error("Some {operation} failed ({failed}/{total})")]
    PartialFailure {
        operation: Operation,
        failed: usize,
        total: usize,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FirmwareError {
    // is_vendor_failure distinguishes a vendor tool reporting failure
    // from everything else that can go wrong around it.
    pub fn is_vendor_failure(&self) -> bool {
        matches!(self, FirmwareError::CommandFailed { .. })
    }

    // aggregate maps failure counts onto the all/partial/none rules.
    pub fn aggregate(operation: Operation, failed: usize, total: usize) -> FirmwareResult<()> {
        if total > 0 && failed >= total {
            Err(FirmwareError::AllFailed {
                operation,
                failed,
                total,
            })
        } else if failed > 0 {
            Err(FirmwareError::PartialFailure {
                operation,
                failed,
                total,
            })
        } else {
            Ok(())
        }
    }
}

// FirmwareResult is a result type alias for firmware operations.
pub type FirmwareResult<T> = Result<T, FirmwareError>;
