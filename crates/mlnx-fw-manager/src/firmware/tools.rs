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

// src/firmware/tools.rs
// MlxTools builds and runs the MFT vendor tool invocations (mlxfwmanager,
// flint, mlxconfig) against one PCI device. Nothing here decides what a
// non-zero exit means; callers interpret the returned CommandOutput.

use std::path::Path;

use tracing::debug;

use crate::exec::command::{CommandOutput, CommandSpec};
use crate::exec::runner::CommandRunner;
use crate::firmware::error::{FirmwareError, FirmwareResult};

pub const MLXFWMANAGER: &str = "mlxfwmanager";
pub const FLINT: &str = "flint";
pub const MLXCONFIG: &str = "mlxconfig";

// MFT_DEBUG_ENV turns on MFT diagnostics; added to every vendor tool
// invocation in verbose mode.
pub const MFT_DEBUG_ENV: [(&str, &str); 2] = [("FLASH_ACCESS_DEBUG", "1"), ("FW_COMPS_DEBUG", "1")];

pub struct MlxTools<'a> {
    runner: &'a dyn CommandRunner,
    // pci_id is the device every command targets.
    pci_id: &'a str,
    verbose: bool,
}

impl<'a> MlxTools<'a> {
    pub fn new(runner: &'a dyn CommandRunner, pci_id: &'a str, verbose: bool) -> Self {
        Self {
            runner,
            pci_id,
            verbose,
        }
    }

    pub fn pci_id(&self) -> &str {
        self.pci_id
    }

    fn command(&self, program: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(program);
        if self.verbose {
            for (key, value) in MFT_DEBUG_ENV {
                spec = spec.env(key, value);
            }
        }
        spec
    }

    fn run(&self, spec: CommandSpec) -> FirmwareResult<CommandOutput> {
        debug!(device = %self.pci_id, cmd = %spec, "Running MFT command");
        self.runner
            .run(&spec)
            .map_err(|source| FirmwareError::Spawn {
                command: spec.to_string(),
                source,
            })
    }

    // run_checked is run() with a non-zero exit turned into CommandFailed.
    fn run_checked(&self, spec: CommandSpec) -> FirmwareResult<CommandOutput> {
        let command = spec.to_string();
        let output = self.run(spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(FirmwareError::CommandFailed {
                command,
                details: output.describe_failure(),
            })
        }
    }

    // query_device runs `mlxfwmanager --query-format XML -d <pci>`.
    pub fn query_device(&self) -> FirmwareResult<String> {
        let spec = self
            .command(MLXFWMANAGER)
            .args(["--query-format", "XML", "-d", self.pci_id]);
        Ok(self.run_checked(spec)?.stdout)
    }

    // list_content runs `mlxfwmanager --list-content -i <fw> -d <pci>`.
    pub fn list_content(&self, fw_file: &Path) -> FirmwareResult<String> {
        let spec = self
            .command(MLXFWMANAGER)
            .arg("--list-content")
            .arg("-i")
            .arg(fw_file.display().to_string())
            .args(["-d", self.pci_id]);
        Ok(self.run_checked(spec)?.stdout)
    }

    // update runs `mlxfwmanager -u -f -y -d <pci> -i <fw>`. The exit code
    // is returned as-is since 2 carries meaning for Spectrum devices.
    pub fn update(&self, fw_file: &Path) -> FirmwareResult<CommandOutput> {
        let spec = self
            .command(MLXFWMANAGER)
            .args(["-u", "-f", "-y", "-d", self.pci_id, "-i"])
            .arg(fw_file.display().to_string());
        self.run(spec)
    }

    // query_image runs `flint -i <fw> --psid <psid> query`.
    pub fn query_image(&self, fw_file: &Path, psid: &str) -> FirmwareResult<String> {
        let spec = self
            .command(FLINT)
            .arg("-i")
            .arg(fw_file.display().to_string())
            .args(["--psid", psid, "query"]);
        Ok(self.run_checked(spec)?.stdout)
    }

    // reactivate runs `flint -d <pci> ir`.
    pub fn reactivate(&self) -> FirmwareResult<CommandOutput> {
        let spec = self.command(FLINT).args(["-d", self.pci_id, "ir"]);
        self.run(spec)
    }

    // burn runs `flint -d <pci> -i <fw> -y burn`.
    pub fn burn(&self, fw_file: &Path) -> FirmwareResult<CommandOutput> {
        let spec = self
            .command(FLINT)
            .args(["-d", self.pci_id, "-i"])
            .arg(fw_file.display().to_string())
            // -y answers flint's confirmation prompt; stdin is null.
            .args(["-y", "burn"]);
        self.run_checked(spec)
    }

    // clear_semaphore runs `flint -d <pci> --clear_semaphore`.
    pub fn clear_semaphore(&self) -> FirmwareResult<CommandOutput> {
        let spec = self
            .command(FLINT)
            .args(["-d", self.pci_id, "--clear_semaphore"]);
        self.run_checked(spec)
    }

    // reset_config runs `mlxconfig -d <pci> -y r`.
    pub fn reset_config(&self) -> FirmwareResult<CommandOutput> {
        let spec = self.command(MLXCONFIG).args(["-d", self.pci_id, "-y", "r"]);
        self.run_checked(spec)
    }
}
