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

// src/cmd/cmds.rs
// App is the CLI driver: QEMU short-circuit, global lock, dispatch to
// the status / reset / dry-run / upgrade handlers, and the mapping of
// their outcomes onto exit codes. All user-facing text is written to
// the supplied writer (stdout in production).

use std::io::{self, Write};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cmd::args::{Cli, STATUS_FLAG_VALUE};
use crate::cmd::lock::StateLock;
use crate::coordinator::coordinator::FirmwareCoordinator;
use crate::coordinator::options::CoordinatorOptions;
use crate::coordinator::worker::WorkerLauncher;
use crate::exec::command::CommandSpec;
use crate::exec::runner::CommandRunner;
use crate::firmware::error::{FirmwareError, FirmwareResult};
use crate::platform::paths::PlatformPaths;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const FW_UPGRADE_IS_REQUIRED: i32 = 10;

// SIMX_MARKER in `lspci -vvv` output identifies a SimX/QEMU platform.
pub const SIMX_MARKER: &str = "SimX";

pub struct App {
    paths: PlatformPaths,
    runner: Arc<dyn CommandRunner>,
    launcher: Arc<dyn WorkerLauncher>,
    // options is the base the CLI flags are layered on.
    options: CoordinatorOptions,
}

impl App {
    pub fn new(
        paths: PlatformPaths,
        runner: Arc<dyn CommandRunner>,
        launcher: Arc<dyn WorkerLauncher>,
    ) -> Self {
        Self {
            paths,
            runner,
            launcher,
            options: CoordinatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    // run executes one CLI invocation and returns its exit code.
    pub fn run(&self, cli: &Cli, out: &mut dyn Write) -> i32 {
        info!("Mellanox Firmware Manager started");
        let exit_code = self.dispatch(cli, out).unwrap_or_else(|e| {
            error!("Failed to write output: {e}");
            EXIT_FAILURE
        });
        info!("Mellanox Firmware Manager finished with exit code {exit_code}");
        exit_code
    }

    fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> io::Result<i32> {
        if self.is_qemu() {
            writeln!(out, "No FW upgrade for SimX platform")?;
            return Ok(EXIT_SUCCESS);
        }

        if let Some(asic_id) = &cli.status {
            return self.handle_status(asic_id, cli, out);
        }

        let _lock = match StateLock::acquire(&self.paths.lock_file) {
            Ok(lock) => lock,
            Err(e) => {
                error!("Failed to acquire lock: {e}");
                writeln!(out, "Error: {e}")?;
                return Ok(EXIT_FAILURE);
            }
        };

        if cli.reset {
            self.handle_reset(cli, out)
        } else if cli.dry_run {
            self.handle_dry_run(cli, out)
        } else {
            self.handle_upgrade(cli, out)
        }
    }

    // is_qemu runs `lspci -vvv` and looks for the SimX marker. A failing
    // lspci is logged and treated as real hardware.
    fn is_qemu(&self) -> bool {
        let spec = CommandSpec::new("lspci").arg("-vvv");
        match self.runner.run(&spec) {
            Ok(output) => output.success() && output.stdout.contains(SIMX_MARKER),
            Err(e) => {
                warn!("Failed to check for QEMU platform: {e}");
                false
            }
        }
    }

    fn coordinator(
        &self,
        cli: &Cli,
        from_image: bool,
        clear_semaphore: bool,
    ) -> FirmwareResult<FirmwareCoordinator> {
        let options = self
            .options
            .clone()
            .with_verbose(cli.verbose)
            .with_from_image(from_image)
            .with_clear_semaphore(clear_semaphore);
        FirmwareCoordinator::new(
            options,
            &self.paths,
            self.runner.clone(),
            self.launcher.clone(),
        )
    }

    fn handle_status(&self, asic_id: &str, cli: &Cli, out: &mut dyn Write) -> io::Result<i32> {
        let coordinator = match self.coordinator(cli, cli.upgrade, false) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                writeln!(out, "Status check failed: {e}")?;
                return Ok(EXIT_FAILURE);
            }
        };
        let num_asics = coordinator.get_asic_count();

        let asic_id = if asic_id == STATUS_FLAG_VALUE {
            if num_asics == 1 {
                "0"
            } else {
                writeln!(out, "Error: Multi-ASIC system detected ({num_asics} ASICs).")?;
                writeln!(out, "Usage: mlnx-fw-manager --status <ASIC_ID|all>")?;
                writeln!(out, "Example: mlnx-fw-manager --status all")?;
                return Ok(EXIT_FAILURE);
            }
        } else {
            asic_id
        };

        let managers = if asic_id.eq_ignore_ascii_case("all") {
            writeln!(out, "Firmware Status Report ({num_asics} ASIC(s)):")?;
            coordinator.managers()
        } else {
            let Ok(index) = asic_id.trim().parse::<usize>() else {
                writeln!(out, "Error: Invalid ASIC ID '{asic_id}'. Use a number or 'all'.")?;
                return Ok(EXIT_FAILURE);
            };
            if index >= num_asics {
                writeln!(
                    out,
                    "Error: ASIC {index} not found. System has {num_asics} ASIC(s)."
                )?;
                return Ok(EXIT_FAILURE);
            }
            writeln!(out, "Firmware Status Report (ASIC {index}):")?;
            &coordinator.managers()[index..=index]
        };

        let (mut up_to_date, mut need_upgrade, mut errors) = (0, 0, 0);
        for manager in managers {
            let index = manager.asic_index();
            match manager.is_upgrade_required() {
                Ok(true) => {
                    need_upgrade += 1;
                    writeln!(out, "ASIC {index}: Upgrade needed")?;
                }
                Ok(false) => {
                    up_to_date += 1;
                    writeln!(out, "ASIC {index}: Up to date")?;
                }
                Err(e) => {
                    errors += 1;
                    writeln!(out, "ASIC {index}: Error checking status - {e}")?;
                }
            }
        }
        writeln!(
            out,
            "Summary: {up_to_date} up to date, {need_upgrade} need upgrade, {errors} errors"
        )?;

        if need_upgrade > 0 || errors > 0 {
            Ok(FW_UPGRADE_IS_REQUIRED)
        } else {
            Ok(EXIT_SUCCESS)
        }
    }

    fn handle_reset(&self, cli: &Cli, out: &mut dyn Write) -> io::Result<i32> {
        let result = self
            .coordinator(cli, false, false)
            .and_then(|coordinator| coordinator.reset_firmware_config());
        match result {
            Ok(()) => {
                writeln!(out, "Firmware configuration reset completed successfully.")?;
                Ok(EXIT_SUCCESS)
            }
            Err(e @ FirmwareError::PartialFailure { .. }) => {
                writeln!(out, "Firmware configuration reset partially failed: {e}")?;
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                writeln!(out, "Firmware reset failed: {e}")?;
                Ok(EXIT_FAILURE)
            }
        }
    }

    fn handle_dry_run(&self, cli: &Cli, out: &mut dyn Write) -> io::Result<i32> {
        match self.coordinator(cli, cli.upgrade, false) {
            Ok(coordinator) if coordinator.check_upgrade_required() => {
                writeln!(out, "Firmware upgrade is required.")?;
                info!("Dry-run check: upgrade required, exiting with {FW_UPGRADE_IS_REQUIRED}");
                Ok(FW_UPGRADE_IS_REQUIRED)
            }
            Ok(_) => {
                writeln!(out, "Firmware is up to date.")?;
                info!("Dry-run check: up to date, exiting with {EXIT_SUCCESS}");
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                writeln!(out, "Firmware check failed: {e}")?;
                error!("Dry-run check failed, exiting with {EXIT_FAILURE}");
                Ok(EXIT_FAILURE)
            }
        }
    }

    fn handle_upgrade(&self, cli: &Cli, out: &mut dyn Write) -> io::Result<i32> {
        let coordinator = match self.coordinator(cli, cli.upgrade, cli.clear_semaphore) {
            Ok(coordinator) => coordinator,
            Err(e) => {
                writeln!(out, "Firmware upgrade failed: {e}")?;
                return Ok(EXIT_FAILURE);
            }
        };

        if !coordinator.check_upgrade_required() {
            writeln!(out, "Firmware is up to date.")?;
            info!("Upgrade check: up to date, exiting with {EXIT_SUCCESS}");
            return Ok(EXIT_SUCCESS);
        }

        match coordinator.upgrade_firmware() {
            Ok(()) => {
                writeln!(out, "Firmware upgrade completed successfully.")?;
                info!("Upgrade completed successfully, exiting with {EXIT_SUCCESS}");
                Ok(EXIT_SUCCESS)
            }
            Err(e @ FirmwareError::PartialFailure { .. }) => {
                writeln!(out, "Firmware upgrade partially failed: {e}")?;
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                writeln!(out, "Firmware upgrade failed: {e}")?;
                Ok(EXIT_FAILURE)
            }
        }
    }
}
