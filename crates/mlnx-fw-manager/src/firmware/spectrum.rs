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

// src/firmware/spectrum.rs
// Spectrum switch ASICs are upgraded through mlxfwmanager. The one
// quirk is exit code 2 from the update, which asks for a firmware
// reactivation (`flint ir`) followed by a single retry.

use std::path::Path;

use tracing::{info, warn};

use crate::firmware::error::{FirmwareError, FirmwareResult};
use crate::firmware::manager::AsicFirmware;
use crate::firmware::tools::MlxTools;
use crate::inventory::asic::AsicFamily;

// FW_ALREADY_UPDATED_FAILURE is the mlxfwmanager exit code meaning the
// firmware needs reactivation before it can be updated again.
pub const FW_ALREADY_UPDATED_FAILURE: i32 = 2;

pub const MST_DEVICE_TYPE: &str = "Spectrum";

#[derive(Debug, Default, Clone, Copy)]
pub struct SpectrumFirmware;

impl AsicFirmware for SpectrumFirmware {
    fn family(&self) -> AsicFamily {
        AsicFamily::Spectrum
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
        let content = tools.list_content(fw_file)?;
        parse_list_content(&content, psid).ok_or_else(|| FirmwareError::Parse {
            tool: "mlxfwmanager --list-content",
            reason: format!("no version found for PSID {psid}"),
        })
    }

    fn run_firmware_update(&self, tools: &MlxTools<'_>, fw_file: &Path) -> FirmwareResult<()> {
        let mut output = tools.update(fw_file)?;

        if output.exit_code == Some(FW_ALREADY_UPDATED_FAILURE) {
            info!(
                device = %tools.pci_id(),
                "Firmware reactivation required, running flint ir before retrying"
            );
            let reactivation = tools.reactivate()?;
            if !reactivation.success() {
                warn!(
                    device = %tools.pci_id(),
                    "Firmware reactivation returned non-zero: {}",
                    reactivation.describe_failure()
                );
            }
            output = tools.update(fw_file)?;
        }

        if output.success() {
            Ok(())
        } else {
            Err(FirmwareError::CommandFailed {
                command: format!(
                    "mlxfwmanager -u -f -y -d {} -i {}",
                    tools.pci_id(),
                    fw_file.display()
                ),
                details: output.describe_failure(),
            })
        }
    }
}

// parse_list_content returns the 4th whitespace-separated field of the
// first line mentioning psid.
pub fn parse_list_content(content: &str, psid: &str) -> Option<String> {
    content
        .lines()
        .find(|line| line.contains(psid))
        .and_then(|line| line.split_whitespace().nth(3))
        .map(str::to_string)
}
