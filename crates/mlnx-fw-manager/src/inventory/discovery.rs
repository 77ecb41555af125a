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

// src/inventory/discovery.rs
// ASIC discovery: combine what asic.conf declares with what `lspci -Dn`
// actually sees, and produce the ordered set of AsicDescriptors the
// coordinator builds one firmware manager per.

use tracing::{info, warn};

use crate::exec::command::CommandSpec;
use crate::exec::runner::CommandRunner;
use crate::inventory::asic::{AsicDescriptor, AsicFamily, AsicType};
use crate::inventory::asic_conf::AsicConf;
use crate::platform::error::{PlatformError, PlatformResult};
use crate::platform::paths::PlatformPaths;

// DetectedDevice is one lspci line that matched a device table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDevice {
    pub pci_address: String,
    pub device_id: String,
    pub asic_type: AsicType,
}

// Detection is the result of scanning lspci output: the platform's ASIC
// type (that of the first match) and every matching device of that
// family, in order of appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub asic_type: AsicType,
    pub devices: Vec<DetectedDevice>,
}

impl Detection {
    pub fn contains(&self, pci_id: &str) -> bool {
        self.find(pci_id).is_some()
    }

    pub fn find(&self, pci_id: &str) -> Option<&DetectedDevice> {
        self.devices
            .iter()
            .find(|d| same_pci_address(&d.pci_address, pci_id))
    }
}

// same_pci_address compares two PCI addresses, treating a missing
// domain as the default 0000 domain ("03:00.0" == "0000:03:00.0").
pub fn same_pci_address(a: &str, b: &str) -> bool {
    fn normalize(addr: &str) -> String {
        let addr = addr.trim().to_ascii_lowercase();
        if addr.matches(':').count() == 1 {
            format!("0000:{addr}")
        } else {
            addr
        }
    }
    normalize(a) == normalize(b)
}

// parse_lspci scans `lspci -Dn` output. Families are tried in
// AsicFamily::DETECTION_ORDER and the first family with any match wins.
// A line matches when one of its fields is a vendor:device id from the
// family table; its first field is the PCI address.
pub fn parse_lspci(output: &str) -> Option<Detection> {
    for family in AsicFamily::DETECTION_ORDER {
        let mut devices: Vec<DetectedDevice> = Vec::new();

        for line in output.lines() {
            let mut fields = line.split_whitespace();
            let Some(pci_address) = fields.next() else {
                continue;
            };
            let Some((device_id, asic_type)) =
                fields.find_map(|field| family.lookup(field).map(|t| (field, t)))
            else {
                continue;
            };
            if devices.iter().any(|d| d.pci_address == pci_address) {
                continue;
            }
            info!("Found {asic_type} device at {pci_address}");
            devices.push(DetectedDevice {
                pci_address: pci_address.to_string(),
                device_id: device_id.to_ascii_lowercase(),
                asic_type,
            });
        }

        if let Some(first) = devices.first() {
            return Some(Detection {
                asic_type: first.asic_type,
                devices,
            });
        }
    }
    None
}

// detect_devices runs `lspci -Dn` and parses its output.
pub fn detect_devices(runner: &dyn CommandRunner) -> PlatformResult<Detection> {
    let spec = CommandSpec::new("lspci").arg("-Dn");
    let output = runner
        .run(&spec)
        .map_err(|e| PlatformError::LspciFailed(e.to_string()))?;
    if !output.success() {
        return Err(PlatformError::LspciFailed(output.describe_failure()));
    }

    let detection = parse_lspci(&output.stdout).ok_or(PlatformError::NoAsicDetected)?;
    info!(
        "Detected ASIC type: {}, PCI devices: {:?}",
        detection.asic_type,
        detection
            .devices
            .iter()
            .map(|d| d.pci_address.as_str())
            .collect::<Vec<_>>()
    );
    Ok(detection)
}

// AsicInventory is the reconciled ASIC set for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsicInventory {
    platform: String,
    asic_type: AsicType,
    asics: Vec<AsicDescriptor>,
}

impl AsicInventory {
    // discover loads asic.conf for the platform, runs lspci, and
    // reconciles the two.
    pub fn discover(
        platform: &str,
        paths: &PlatformPaths,
        runner: &dyn CommandRunner,
    ) -> PlatformResult<Self> {
        let conf = AsicConf::load(&paths.asic_conf(platform));
        let detection = detect_devices(runner)?;
        Ok(Self::reconcile(platform, &conf, &detection))
    }

    // reconcile applies the declared-vs-detected rules:
    //   - multi-ASIC: the declared list is authoritative; declared
    //     addresses lspci did not report are warned about.
    //   - single-ASIC: the first detected address is used.
    pub fn reconcile(platform: &str, conf: &AsicConf, detection: &Detection) -> Self {
        let pci_ids: Vec<String> = if conf.is_multi_asic() {
            for pci_id in &conf.pci_ids {
                if !detection.contains(pci_id) {
                    warn!("PCI device {pci_id} not found in detected PCI devices");
                }
            }
            let undeclared: Vec<&str> = detection
                .devices
                .iter()
                .filter(|d| {
                    !conf
                        .pci_ids
                        .iter()
                        .any(|p| same_pci_address(p, &d.pci_address))
                })
                .map(|d| d.pci_address.as_str())
                .collect();
            if !undeclared.is_empty() {
                info!("Ignoring detected devices not declared in asic.conf: {undeclared:?}");
            }
            conf.pci_ids.clone()
        } else {
            detection
                .devices
                .first()
                .map(|d| vec![d.pci_address.clone()])
                .unwrap_or_default()
        };

        let asics = pci_ids
            .into_iter()
            .enumerate()
            .map(|(index, pci_id)| AsicDescriptor {
                index,
                device_id: detection.find(&pci_id).map(|d| d.device_id.clone()),
                pci_id,
                asic_type: detection.asic_type,
            })
            .collect();

        Self {
            platform: platform.to_string(),
            asic_type: detection.asic_type,
            asics,
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn asic_type(&self) -> AsicType {
        self.asic_type
    }

    pub fn asic_count(&self) -> usize {
        self.asics.len()
    }

    pub fn is_multi_asic(&self) -> bool {
        self.asics.len() > 1
    }

    pub fn asics(&self) -> &[AsicDescriptor] {
        &self.asics
    }

    pub fn pci_ids(&self) -> Vec<String> {
        self.asics.iter().map(|a| a.pci_id.clone()).collect()
    }
}
