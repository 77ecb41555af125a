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

// src/coordinator/coordinator.rs
// FirmwareCoordinator owns one FirmwareManager per ASIC and drives the
// fleet-level operations: parallel upgrade, dry-run, and BlueField
// configuration reset.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::coordinator::image::resolve_fw_root;
use crate::coordinator::options::CoordinatorOptions;
use crate::coordinator::report::{AsicOutcome, UpgradeReport};
use crate::coordinator::worker::{WorkerHandle, WorkerJob, WorkerLauncher};
use crate::exec::runner::CommandRunner;
use crate::firmware::error::{FirmwareError, FirmwareResult, Operation};
use crate::firmware::manager::FirmwareManager;
use crate::firmware::status::status_queue;
use crate::inventory::asic::AsicFamily;
use crate::inventory::discovery::AsicInventory;
use crate::platform::paths::PlatformPaths;
use crate::platform::probe::detect_platform;

pub struct FirmwareCoordinator {
    options: CoordinatorOptions,
    inventory: AsicInventory,
    fw_root: PathBuf,
    managers: Vec<FirmwareManager>,
    launcher: Arc<dyn WorkerLauncher>,
}

impl FirmwareCoordinator {
    // new probes the platform, discovers the ASICs, resolves the
    // firmware root and eagerly constructs every manager. Any failure
    // aborts construction before a single worker is started.
    pub fn new(
        options: CoordinatorOptions,
        paths: &PlatformPaths,
        runner: Arc<dyn CommandRunner>,
        launcher: Arc<dyn WorkerLauncher>,
    ) -> FirmwareResult<Self> {
        let platform = detect_platform(paths).inspect_err(|e| {
            error!("Failed to detect platform: {e}");
        })?;
        let inventory = AsicInventory::discover(&platform, paths, runner.as_ref())?;
        let fw_root = resolve_fw_root(options.from_image, paths, runner.as_ref())?;

        let manager_options = options.manager_options();
        let mut managers = Vec::with_capacity(inventory.asic_count());
        for asic in inventory.asics() {
            let manager =
                FirmwareManager::new(asic.clone(), &fw_root, &manager_options, runner.clone())
                    .inspect_err(|e| error!("Failed to initialize ASIC {}: {e}", asic.index))?;
            managers.push(manager);
        }

        info!(
            platform = %platform,
            "Initialized firmware coordinator with {} ASIC(s) and image from {}",
            managers.len(),
            fw_root.display()
        );

        Ok(Self {
            options,
            inventory,
            fw_root,
            managers,
            launcher,
        })
    }

    pub fn get_asic_count(&self) -> usize {
        self.inventory.asic_count()
    }

    pub fn get_asic_pci_ids(&self) -> Vec<String> {
        self.inventory.pci_ids()
    }

    pub fn inventory(&self) -> &AsicInventory {
        &self.inventory
    }

    pub fn fw_root(&self) -> &Path {
        &self.fw_root
    }

    pub fn managers(&self) -> &[FirmwareManager] {
        &self.managers
    }

    // run_upgrade starts one worker per ASIC, joins them under the
    // per-worker deadline, then drains the status queue into a report.
    pub fn run_upgrade(&self) -> UpgradeReport {
        info!(
            "Starting firmware upgrade for {} ASIC(s) from {}",
            self.managers.len(),
            self.fw_root.display()
        );

        let (sender, receiver) = status_queue();
        let mut report = UpgradeReport::new();

        // Start every worker before joining any of them.
        let mut handles: Vec<Box<dyn WorkerHandle>> = Vec::with_capacity(self.managers.len());
        for manager in &self.managers {
            let job = WorkerJob::new(manager.state().clone());
            match self.launcher.start(job, sender.clone()) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(asic = manager.asic_index(), "{e}");
                    report.record(manager.asic_index(), AsicOutcome::LaunchFailed(e.to_string()));
                }
            }
        }
        drop(sender);

        let timeout = self.options.worker_timeout;
        let mut timed_out = BTreeSet::new();
        for handle in handles.iter_mut() {
            let index = handle.asic_index();
            if self.join_or_stop(handle.as_mut()) {
                handle.finish();
            } else {
                error!(
                    "ASIC {index} firmware upgrade timed out after {} seconds",
                    timeout.as_secs()
                );
                timed_out.insert(index);
            }
        }

        let mut reported: BTreeMap<usize, _> = BTreeMap::new();
        for status in receiver.drain() {
            reported.insert(status.asic_index, status);
        }

        for handle in &handles {
            let index = handle.asic_index();
            let outcome = if timed_out.contains(&index) {
                AsicOutcome::TimedOut
            } else if let Some(status) = reported.remove(&index) {
                AsicOutcome::Reported(status)
            } else {
                error!(
                    "ASIC {index} completed but did not report status, treating as failure"
                );
                AsicOutcome::Missing
            };
            report.record(index, outcome);
        }

        info!(
            "Upgrade results: {} successful, {} failed",
            report.success_count(),
            report.failure_count()
        );
        report
    }

    // join_or_stop joins a worker under the deadline. On timeout the
    // worker is terminated, given the grace period, and then killed.
    // Returns false if the worker had to be stopped.
    fn join_or_stop(&self, handle: &mut dyn WorkerHandle) -> bool {
        let index = handle.asic_index();
        match handle.join(self.options.worker_timeout) {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => warn!(asic = index, "Failed to wait for worker: {e}"),
        }

        if let Err(e) = handle.terminate() {
            warn!(asic = index, "Failed to terminate worker: {e}");
        }
        let exited = handle
            .join(self.options.terminate_grace)
            .unwrap_or(false);
        if !exited {
            error!("Force killing stuck process for ASIC {index}");
            if let Err(e) = handle.kill() {
                warn!(asic = index, "Failed to kill worker: {e}");
            }
        }
        false
    }

    // upgrade_firmware runs the parallel upgrade and folds the report
    // into all-failed / partial / success.
    pub fn upgrade_firmware(&self) -> FirmwareResult<()> {
        let report = self.run_upgrade();
        match report.result() {
            Ok(()) => {
                info!("All ASIC upgrades completed successfully");
                Ok(())
            }
            Err(e @ FirmwareError::AllFailed { .. }) => {
                error!("{e}");
                Err(e)
            }
            Err(e) => {
                warn!("{e}");
                Err(e)
            }
        }
    }

    // check_upgrade_required is the dry-run: true if any ASIC needs an
    // upgrade, or if its state could not be evaluated.
    pub fn check_upgrade_required(&self) -> bool {
        info!(
            "Checking if firmware upgrade is required from {}",
            self.fw_root.display()
        );

        let mut upgrade_needed = false;
        for manager in &self.managers {
            match manager.is_upgrade_required() {
                Ok(true) => {
                    info!(
                        "Firmware upgrade is required for ASIC {}",
                        manager.asic_index()
                    );
                    upgrade_needed = true;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(
                        "Error checking upgrade status for ASIC {}: {e}",
                        manager.asic_index()
                    );
                    upgrade_needed = true;
                }
            }
        }

        if upgrade_needed {
            info!("Firmware upgrade is required");
        } else {
            info!("Firmware is up to date");
        }
        upgrade_needed
    }

    // reset_firmware_config resets NV configuration on every BlueField
    // ASIC, with the same aggregation rules as the upgrade.
    pub fn reset_firmware_config(&self) -> FirmwareResult<()> {
        let bluefield: Vec<&FirmwareManager> = self
            .managers
            .iter()
            .filter(|m| m.family() == AsicFamily::BlueField)
            .collect();
        if bluefield.is_empty() {
            return Err(FirmwareError::NoBluefieldAsics);
        }

        info!(
            "Resetting firmware configuration for {} BlueField ASIC(s)",
            bluefield.len()
        );

        let mut failures = 0;
        for manager in &bluefield {
            match manager.reset_firmware_config() {
                Ok(()) => info!("Reset successful for ASIC {}", manager.asic_index()),
                Err(e) => {
                    failures += 1;
                    error!("Reset failed for ASIC {}: {e}", manager.asic_index());
                }
            }
        }

        info!(
            "Reset completed: {} successful, {failures} failed",
            bluefield.len() - failures
        );
        FirmwareError::aggregate(Operation::Reset, failures, bluefield.len())
            .inspect_err(|e| warn!("{e}"))
    }
}
