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

// mlnx_fw_manager coordinates firmware upgrades across the Mellanox
// (Spectrum) and NVIDIA BlueField ASICs of a SONiC switch. The layers
// stack bottom-up:
//
//   platform    -> machine.conf probing and filesystem locations
//   inventory   -> asic.conf + lspci discovery of the ASIC set
//   firmware    -> one FirmwareManager per ASIC, family-specific tooling
//   coordinator -> image-source selection, per-ASIC worker processes
//   cmd         -> CLI surface, global lock, logging, exit codes

pub mod exec {
    pub mod command;
    pub mod runner;
}

pub mod platform {
    pub mod error;
    pub mod paths;
    pub mod probe;
}

pub mod inventory {
    pub mod asic;
    pub mod asic_conf;
    pub mod discovery;
}

pub mod firmware {
    pub mod bluefield;
    pub mod error;
    pub mod manager;
    pub mod spectrum;
    pub mod status;
    pub mod tools;
    pub mod version;
}

pub mod coordinator {
    pub mod coordinator;
    pub mod image;
    pub mod options;
    pub mod report;
    pub mod worker;
}

pub mod cmd {
    pub mod args;
    pub mod cmds;
    pub mod lock;
    pub mod logging;
}
