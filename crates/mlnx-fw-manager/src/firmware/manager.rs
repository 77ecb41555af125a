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

// src/firmware/manager.rs
// FirmwareManager is bound to exactly one ASIC. Construction is eager:
// the ASIC type is checked against the family, the firmware binary must
// exist, and the version pair is queried (with retries) before anything
// side-effecting happens. The resulting ManagerState is plain data and is
// what gets shipped to the worker process that performs the upgrade.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::exec::runner::CommandRunner;
use crate::firmware::bluefield::BlueFieldFirmware;
use crate::firmware::error::{FirmwareError, FirmwareResult};
use crate::firmware::spectrum::SpectrumFirmware;
use crate::firmware::status::{StatusSink, UpgradeStatus, UpgradeStatusType};
use crate::firmware::tools::MlxTools;
use crate::firmware::version::{RetryPolicy, VersionPair, parse_device_query};
use crate::inventory::asic::{AsicDescriptor, AsicFamily, AsicType};

// AsicFirmware is the family-specific half of firmware management.
pub trait AsicFirmware: Send + Sync {
    fn family(&self) -> AsicFamily;

    // mst_device_type is the MST name of the device family.
    fn mst_device_type(&self) -> &'static str;

    // available_version reports the firmware version packaged in
    // fw_file for the device identified by psid.
    fn available_version(
        &self,
        tools: &MlxTools<'_>,
        fw_file: &Path,
        psid: &str,
    ) -> FirmwareResult<String>;

    // run_firmware_update flashes fw_file. CommandFailed means a vendor
    // tool rejected the update.
    fn run_firmware_update(&self, tools: &MlxTools<'_>, fw_file: &Path) -> FirmwareResult<()>;

    fn reset_firmware_config(&self, tools: &MlxTools<'_>, asic_index: usize) -> FirmwareResult<()> {
        let _ = tools;
        Err(FirmwareError::Unsupported {
            operation: "Firmware configuration reset",
            family: self.family(),
            asic_index,
        })
    }
}

// firmware_for returns the implementation for an ASIC family.
pub fn firmware_for(family: AsicFamily) -> Box<dyn AsicFirmware> {
    match family {
        AsicFamily::Spectrum => Box::new(SpectrumFirmware),
        AsicFamily::BlueField => Box::new(BlueFieldFirmware),
    }
}

// ManagerOptions carries the knobs every manager is built with.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerOptions {
    pub verbose: bool,
    pub clear_semaphore: bool,
    pub retry: RetryPolicy,
}

// ManagerState is everything a constructed manager knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerState {
    pub asic: AsicDescriptor,
    pub fw_file: PathBuf,
    pub versions: VersionPair,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub clear_semaphore: bool,
}

// UpgradeOutcome is what a completed upgrade attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    UpToDate,
    Upgraded,
}

pub struct FirmwareManager {
    state: ManagerState,
    firmware: Box<dyn AsicFirmware>,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for FirmwareManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmwareManager")
            .field("state", &self.state)
            .field("family", &self.firmware.family())
            .finish()
    }
}

impl FirmwareManager {
    // new builds a manager using the implementation for the ASIC's own
    // family.
    pub fn new(
        asic: AsicDescriptor,
        fw_root: &Path,
        options: &ManagerOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> FirmwareResult<Self> {
        let firmware = firmware_for(asic.family());
        Self::with_firmware(asic, firmware, fw_root, options, runner)
    }

    // with_firmware performs the eager construction checks against an
    // explicit family implementation.
    pub fn with_firmware(
        asic: AsicDescriptor,
        firmware: Box<dyn AsicFirmware>,
        fw_root: &Path,
        options: &ManagerOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> FirmwareResult<Self> {
        let result = Self::initialize(asic, firmware, fw_root, options, runner);
        if let Err(e) = &result {
            error!("Initialization failed: {e}");
        }
        result
    }

    fn initialize(
        asic: AsicDescriptor,
        firmware: Box<dyn AsicFirmware>,
        fw_root: &Path,
        options: &ManagerOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> FirmwareResult<Self> {
        check_supported(firmware.as_ref(), &asic)?;

        let fw_file = firmware_file_path(fw_root, asic.asic_type);
        if !fw_file.is_file() {
            return Err(FirmwareError::FirmwareFileNotFound(fw_file));
        }

        let tools = MlxTools::new(runner.as_ref(), &asic.pci_id, options.verbose);
        let versions = options.retry.query_versions(asic.index, || {
            query_versions(&tools, firmware.as_ref(), &fw_file)
        })?;

        info!(
            asic = asic.index,
            device = %asic.pci_id,
            mst = firmware.mst_device_type(),
            "ASIC {} initialized: {}, current: {}, available: {}",
            asic.index,
            asic.asic_type,
            versions.current,
            versions.available
        );

        let state = ManagerState {
            asic,
            fw_file,
            versions,
            verbose: options.verbose,
            clear_semaphore: options.clear_semaphore,
        };
        Ok(Self {
            state,
            firmware,
            runner,
        })
    }

    // from_state rebuilds a manager from a previously constructed state
    // without querying the device again.
    pub fn from_state(state: ManagerState, runner: Arc<dyn CommandRunner>) -> FirmwareResult<Self> {
        let firmware = firmware_for(state.asic.family());
        check_supported(firmware.as_ref(), &state.asic)?;
        Ok(Self {
            state,
            firmware,
            runner,
        })
    }

    pub fn state(&self) -> &ManagerState {
        &self.state
    }

    pub fn asic_index(&self) -> usize {
        self.state.asic.index
    }

    pub fn pci_id(&self) -> &str {
        &self.state.asic.pci_id
    }

    pub fn asic_type(&self) -> AsicType {
        self.state.asic.asic_type
    }

    pub fn family(&self) -> AsicFamily {
        self.firmware.family()
    }

    pub fn fw_file(&self) -> &Path {
        &self.state.fw_file
    }

    pub fn current_version(&self) -> &str {
        &self.state.versions.current
    }

    pub fn available_version(&self) -> &str {
        &self.state.versions.available
    }

    fn tools(&self) -> MlxTools<'_> {
        MlxTools::new(self.runner.as_ref(), self.pci_id(), self.state.verbose)
    }

    // is_upgrade_required compares the cached version pair and never
    // touches the device.
    pub fn is_upgrade_required(&self) -> FirmwareResult<bool> {
        let versions = &self.state.versions;
        if versions.current.is_empty() || versions.available.is_empty() {
            return Err(FirmwareError::VersionUnknown(self.asic_index()));
        }
        Ok(versions.is_upgrade_required())
    }

    // clear_semaphore releases the device's hardware semaphore. Failure
    // is logged and reported as false.
    pub fn clear_semaphore(&self) -> bool {
        info!(device = %self.pci_id(), "Clearing semaphore for device {}", self.pci_id());
        match self.tools().clear_semaphore() {
            Ok(_) => {
                info!("Successfully cleared semaphore for {}", self.pci_id());
                true
            }
            Err(e) => {
                error!(
                    asic = self.asic_index(),
                    "Failed to clear semaphore for {}: {e}",
                    self.pci_id()
                );
                false
            }
        }
    }

    // upgrade runs the serial per-ASIC flow: predicate, optional
    // semaphore clear, then the family update.
    pub fn upgrade(&self) -> FirmwareResult<UpgradeOutcome> {
        if !self.is_upgrade_required()? {
            return Ok(UpgradeOutcome::UpToDate);
        }

        if self.state.clear_semaphore {
            info!(
                "Clearing semaphore before upgrade for ASIC {}",
                self.asic_index()
            );
            if !self.clear_semaphore() {
                warn!(
                    "Failed to clear semaphore for ASIC {}, continuing with upgrade",
                    self.asic_index()
                );
            }
        }

        info!(
            asic = self.asic_index(),
            device = %self.pci_id(),
            from = %self.current_version(),
            to = %self.available_version(),
            "Starting firmware upgrade"
        );
        self.firmware
            .run_firmware_update(&self.tools(), self.fw_file())?;
        Ok(UpgradeOutcome::Upgraded)
    }

    // upgrade_status runs upgrade() and turns the result into the single
    // status record for this ASIC.
    pub fn upgrade_status(&self) -> UpgradeStatus {
        let index = self.asic_index();
        let (status, message) = match self.upgrade() {
            Ok(UpgradeOutcome::UpToDate) => (
                UpgradeStatusType::Success,
                format!("ASIC {index} firmware is up to date"),
            ),
            Ok(UpgradeOutcome::Upgraded) => {
                info!(asic = index, "Firmware upgrade completed");
                (
                    UpgradeStatusType::Success,
                    format!("ASIC {index} upgrade completed"),
                )
            }
            Err(e) if e.is_vendor_failure() => {
                error!(asic = index, "Firmware upgrade failed: {e}");
                (
                    UpgradeStatusType::Failed,
                    format!("ASIC {index} upgrade failed"),
                )
            }
            Err(e) => {
                error!(asic = index, "Unexpected error during upgrade: {e}");
                (UpgradeStatusType::Error, format!("Unexpected error: {e}"))
            }
        };

        UpgradeStatus::new(index, status, message)
            .with_versions(self.current_version(), self.available_version())
            .with_pci_id(self.pci_id())
            .stamped()
    }

    // run is the worker entry point; exactly one record is published.
    pub fn run(&self, sink: &dyn StatusSink) -> FirmwareResult<()> {
        sink.publish(self.upgrade_status())
    }

    pub fn reset_firmware_config(&self) -> FirmwareResult<()> {
        self.firmware
            .reset_firmware_config(&self.tools(), self.asic_index())
    }
}

// firmware_file_path is <fw_root>/fw-<type>.mfa.
pub fn firmware_file_path(fw_root: &Path, asic_type: AsicType) -> PathBuf {
    fw_root.join(asic_type.firmware_filename())
}

fn check_supported(firmware: &dyn AsicFirmware, asic: &AsicDescriptor) -> FirmwareResult<()> {
    if firmware.family().supports(asic.asic_type) {
        Ok(())
    } else {
        Err(FirmwareError::UnsupportedAsicType {
            asic_index: asic.index,
            asic_type: asic.asic_type,
        })
    }
}

// query_versions is a single, un-retried version query.
fn query_versions(
    tools: &MlxTools<'_>,
    firmware: &dyn AsicFirmware,
    fw_file: &Path,
) -> FirmwareResult<VersionPair> {
    let xml = tools.query_device()?;
    let query = parse_device_query(&xml)?;
    let available = firmware.available_version(tools, fw_file, &query.psid)?;
    Ok(VersionPair::new(query.current_version, available))
}
