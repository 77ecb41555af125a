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

use clap::Parser;

// STATUS_FLAG_VALUE is what --status parses to when given no value.
pub const STATUS_FLAG_VALUE: &str = "__flag__";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mlnx-fw-manager")]
#[command(about = "Mellanox Firmware Manager")]
#[command(
    after_help = "Examples:\n  mlnx-fw-manager --verbose\n  mlnx-fw-manager --upgrade\n  mlnx-fw-manager --reset\n  mlnx-fw-manager --clear-semaphore --upgrade\n  mlnx-fw-manager --status              (single-ASIC)\n  mlnx-fw-manager --status all          (multi-ASIC)\n  mlnx-fw-manager --status 0 --upgrade  (ASIC 0 against next image)"
)]
pub struct Cli {
    // --upgrade reads firmware from the next-boot image.
    #[arg(
        short = 'u',
        long,
        help = "Upgrade ASIC firmware using next boot image (useful after SONiC-To-SONiC update)"
    )]
    pub upgrade: bool,

    #[arg(short = 'v', long, help = "Verbose mode")]
    pub verbose: bool,

    // --dry-run exits 0 when up to date and 10 when an upgrade is needed.
    #[arg(
        short = 'd',
        long = "dry-run",
        help = "Compare the FW versions without installation. Return code \"0\" means the FW is up-to-date, return code \"10\" means an upgrade is required, otherwise an error is detected."
    )]
    pub dry_run: bool,

    #[arg(
        short = 'c',
        long = "clear-semaphore",
        help = "Clear hw semaphore before firmware upgrade"
    )]
    pub clear_semaphore: bool,

    #[arg(
        short = 'r',
        long,
        help = "Reset firmware configuration (NVIDIA BlueField platform only)"
    )]
    pub reset: bool,

    #[arg(long, help = "Disable syslog and log to console only")]
    pub nosyslog: bool,

    // --status takes an optional ASIC id or "all". As a bare flag it
    // becomes STATUS_FLAG_VALUE, which is only valid on single-ASIC
    // systems.
    #[arg(
        long,
        value_name = "ASIC_ID|all",
        num_args = 0..=1,
        default_missing_value = STATUS_FLAG_VALUE,
        help = "Show firmware version status. Single-ASIC: use as flag. Multi-ASIC: specify ASIC ID or \"all\"."
    )]
    pub status: Option<String>,

    // --worker runs a single per-ASIC upgrade job read from stdin.
    #[arg(long, hide = true)]
    pub worker: bool,
}

impl Cli {
    // worker_args are the flags a spawned worker inherits.
    pub fn worker_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.verbose {
            args.push("--verbose".to_string());
        }
        if self.nosyslog {
            args.push("--nosyslog".to_string());
        }
        args
    }
}
