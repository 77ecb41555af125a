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

// src/firmware/bluefield.rs
// BlueField DPUs are flashed directly with flint, preceded by a
// reactivation attempt and followed by an NV-config reset.

use std::path::Path;

use tracing::{info, warn};

use crate::firmware::error::{FirmwareError, FirmwareResult};
use crate::firmware::manager::AsicFirmware;
use crate::firmware::tools::MlxTools;
use crate::inventory::asic::AsicFamily;

pub const MST_DEVICE_TYPE: &str = "BlueField3";

const FW_VERSION_PREFIX: &str = "FW Version:";

#[derive(Debug, Default, Clone, Copy)]
pub struct BlueFieldFirmware;

impl AsicFirmware for BlueFieldFirmware {
    fn family(&self) -> AsicFamily {
        AsicFamily::BlueField
    }

    fn mst_device_type(&self) -> &'static str {
        MST_DEVICE_TYPE
    }

    fn available_version(
        &self,
        tools: &MlxTools<'_>,
        fw_file: &Path,
        psid: &str,
    ) -> FirmwareResult<String> {
        let output = tools.query_image(fw_file, psid)?;
        parse_image_version(&output).ok_or_else(|| FirmwareError::Parse {
            tool: "flint query",
            reason: format!("no '{FW_VERSION_PREFIX}' line for PSID {psid}"),
        })
    }

    fn run_firmware_update(&self, tools: &MlxTools<'_>, fw_file: &Path) -> FirmwareResult<()> {
        let reactivation = tools.reactivate()?;
        if !reactivation.success() {
            warn!(
                device = %tools.pci_id(),
                "Firmware reactivation returned non-zero, continuing with burn: {}",
                reactivation.describe_failure()
            );
        }

        tools.burn(fw_file)?;
        info!(device = %tools.pci_id(), "Firmware burned, resetting NV configuration");

        tools.reset_config()?;
        Ok(())
    }

    fn reset_firmware_config(&self, tools: &MlxTools<'_>, asic_index: usize) -> FirmwareResult<()> {
        info!(
            asic = asic_index,
            device = %tools.pci_id(),
            "Resetting firmware configuration"
        );
        tools.reset_config()?;
        Ok(())
    }
}

// parse_image_version returns the text after the first "FW Version:".
pub fn parse_image_version(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix(FW_VERSION_PREFIX))
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .map(str::to_string)
}
