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

// src/inventory/asic_conf.rs
// asic.conf declares how many ASICs a platform has and, on multi-ASIC
// platforms, which PCI address each ASIC index lives at:
//
//   NUM_ASIC=3
//   DEV_ID_ASIC_0=03:00.0
//   DEV_ID_ASIC_1=06:00.0
//   DEV_ID_ASIC_2=09:00.0

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::inventory::asic::UNKNOWN_PCI_ID;
use crate::platform::probe::key_values;

const NUM_ASIC_KEY: &str = "NUM_ASIC";
const DEV_ID_PREFIX: &str = "DEV_ID_ASIC_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsicConf {
    // num_asics is the declared ASIC count, never below 1.
    pub num_asics: usize,
    // pci_ids is ordered by ASIC index, padded with "unknown" and
    // truncated to num_asics. Empty when nothing was declared.
    pub pci_ids: Vec<String>,
}

impl AsicConf {
    // single is the configuration assumed when asic.conf is absent.
    pub fn single() -> Self {
        Self {
            num_asics: 1,
            pci_ids: Vec::new(),
        }
    }

    pub fn is_multi_asic(&self) -> bool {
        self.num_asics > 1
    }

    // parse reads NUM_ASIC and DEV_ID_ASIC_<n> entries. A malformed
    // count or index is an error; unrelated keys are ignored.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut num_asics = 1usize;
        let mut declared: Vec<(usize, String)> = Vec::new();

        for (key, value) in key_values(content) {
            if key == NUM_ASIC_KEY {
                num_asics = value
                    .parse()
                    .map_err(|e| format!("invalid {NUM_ASIC_KEY} value '{value}': {e}"))?;
            } else if let Some(index) = key.strip_prefix(DEV_ID_PREFIX) {
                let index: usize = index
                    .parse()
                    .map_err(|e| format!("invalid ASIC index in '{key}': {e}"))?;
                declared.push((index, value.to_string()));
            }
        }

        declared.sort_by_key(|(index, _)| *index);
        let num_asics = num_asics.max(1);
        let mut pci_ids: Vec<String> = declared.into_iter().map(|(_, pci)| pci).collect();
        if !pci_ids.is_empty() || num_asics > 1 {
            pci_ids.resize(num_asics, UNKNOWN_PCI_ID.to_string());
        }

        Ok(Self { num_asics, pci_ids })
    }

    // load reads asic.conf from path. A missing file means a single-ASIC
    // system; an unparsable file is logged and treated the same way.
    pub fn load(path: &Path) -> Self {
        info!("Loading ASIC configuration from {}", path.display());

        if !path.exists() {
            info!(
                "No asic.conf file found, assuming single ASIC system ({})",
                path.display()
            );
            return Self::single();
        }

        let parsed = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| Self::parse(&content));

        match parsed {
            Ok(conf) => {
                info!(
                    "Loaded ASIC data: {} ASICs, PCI IDs: {:?}",
                    conf.num_asics, conf.pci_ids
                );
                conf
            }
            Err(e) => {
                warn!(
                    "Could not parse ASIC configuration from {}: {e}",
                    path.display()
                );
                Self::single()
            }
        }
    }
}
