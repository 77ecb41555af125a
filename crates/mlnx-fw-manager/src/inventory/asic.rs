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

// src/inventory/asic.rs
// ASIC identity: the supported ASIC types, the PCI vendor:device tables
// used to recognise them in lspci output, and the immutable descriptor
// produced for each discovered ASIC.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// UNKNOWN_PCI_ID pads the declared PCI list when asic.conf declares
// more ASICs than it gives DEV_ID_ASIC_<n> entries for.
pub const UNKNOWN_PCI_ID: &str = "unknown";

// SPECTRUM_DEVICES maps Spectrum switch ASIC vendor:device ids to types.
pub const SPECTRUM_DEVICES: &[(&str, AsicType)] = &[
    ("15b3:cb84", AsicType::Spc),
    ("15b3:cf6c", AsicType::Spc2),
    ("15b3:cf70", AsicType::Spc3),
    ("15b3:cf80", AsicType::Spc4),
    ("15b3:cf82", AsicType::Spc5),
];

// BLUEFIELD_DEVICES maps BlueField DPU vendor:device ids to types.
pub const BLUEFIELD_DEVICES: &[(&str, AsicType)] = &[("15b3:a2dc", AsicType::Bf3)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AsicType {
    Spc,
    Spc2,
    Spc3,
    Spc4,
    Spc5,
    Bf3,
}

impl AsicType {
    pub const ALL: [AsicType; 6] = [
        AsicType::Spc,
        AsicType::Spc2,
        AsicType::Spc3,
        AsicType::Spc4,
        AsicType::Spc5,
        AsicType::Bf3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AsicType::Spc => "SPC",
            AsicType::Spc2 => "SPC2",
            AsicType::Spc3 => "SPC3",
            AsicType::Spc4 => "SPC4",
            AsicType::Spc5 => "SPC5",
            AsicType::Bf3 => "BF3",
        }
    }

    pub fn family(&self) -> AsicFamily {
        match self {
            AsicType::Bf3 => AsicFamily::BlueField,
            _ => AsicFamily::Spectrum,
        }
    }

    // firmware_filename is fw-<type>.mfa with the type lowercased.
    pub fn firmware_filename(&self) -> String {
        format!("fw-{}.mfa", self.as_str().to_lowercase())
    }
}

impl fmt::Display for AsicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AsicType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AsicType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unsupported ASIC type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsicFamily {
    Spectrum,
    BlueField,
}

impl AsicFamily {
    // DETECTION_ORDER is the order families are tried against lspci.
    // BlueField goes last: on a Smart Switch the DPUs sit next to the
    // Spectrum switch ASIC, and the switch ASIC is the one we manage.
    pub const DETECTION_ORDER: [AsicFamily; 2] = [AsicFamily::Spectrum, AsicFamily::BlueField];

    pub fn device_table(&self) -> &'static [(&'static str, AsicType)] {
        match self {
            AsicFamily::Spectrum => SPECTRUM_DEVICES,
            AsicFamily::BlueField => BLUEFIELD_DEVICES,
        }
    }

    // lookup returns the ASIC type for a vendor:device id in this family.
    pub fn lookup(&self, device_id: &str) -> Option<AsicType> {
        self.device_table()
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(device_id))
            .map(|(_, asic_type)| *asic_type)
    }

    pub fn supports(&self, asic_type: AsicType) -> bool {
        self.device_table().iter().any(|(_, t)| *t == asic_type)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AsicFamily::Spectrum => "Spectrum",
            AsicFamily::BlueField => "BlueField",
        }
    }
}

impl fmt::Display for AsicFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// AsicDescriptor identifies one managed ASIC. It is created once during
// discovery and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsicDescriptor {
    // index is 0-based and contiguous across the ASIC set.
    pub index: usize,
    // pci_id is the domain:bus:device.function address, as declared in
    // asic.conf or as reported by lspci.
    pub pci_id: String,
    // device_id is the vendor:device pair lspci reported for this
    // address, if the address was seen at all.
    pub device_id: Option<String>,
    pub asic_type: AsicType,
}

impl AsicDescriptor {
    pub fn family(&self) -> AsicFamily {
        self.asic_type.family()
    }
}
