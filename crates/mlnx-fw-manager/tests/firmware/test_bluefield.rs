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

#[path = "../common/mod.rs"]
mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedRunner, exit, script_bluefield};
use mlnx_fw_manager::firmware::error::FirmwareError;
use mlnx_fw_manager::firmware::manager::{FirmwareManager, ManagerOptions};
use mlnx_fw_manager::firmware::status::UpgradeStatusType;
use mlnx_fw_manager::firmware::version::RetryPolicy;
use mlnx_fw_manager::inventory::asic::{AsicDescriptor, AsicFamily, AsicType};

const PCI: &str = "0000:08:00.0";

fn bluefield_manager(runner: &Arc<ScriptedRunner>, fw_root: &Path) -> FirmwareManager {
    std::fs::write(fw_root.join("fw-bf3.mfa"), b"MFA2").unwrap();
    let asic = AsicDescriptor {
        index: 0,
        pci_id: PCI.to_string(),
        device_id: Some("15b3:a2dc".to_string()),
        asic_type: AsicType::Bf3,
    };
    let options = ManagerOptions {
        retry: RetryPolicy::new(1, Duration::ZERO),
        ..Default::default()
    };
    FirmwareManager::new(asic, fw_root, &options, runner.clone()).unwrap()
}

// flash_lines returns the flashing commands in the order they ran.
fn flash_lines(runner: &ScriptedRunner) -> Vec<String> {
    runner
        .command_lines()
        .into_iter()
        .filter(|l| l.ends_with(" ir") || l.ends_with(" burn") || l.starts_with("mlxconfig"))
        .collect()
}

#[test]
fn test_available_version_comes_from_flint_query() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_bluefield(&runner, PCI, "32.43.1014", "32.44.1000");
    let manager = bluefield_manager(&runner, root.path());

    assert_eq!(manager.family(), AsicFamily::BlueField);
    assert_eq!(manager.current_version(), "32.43.1014");
    assert_eq!(manager.available_version(), "32.44.1000");
    assert_eq!(runner.count("mlxfwmanager", &["--list-content"]), 0);
}

#[test]
fn test_upgrade_order_is_ir_burn_reset() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_bluefield(&runner, PCI, "FW1", "FW2");
    runner.on("flint", &["ir"], exit(0));
    runner.on("flint", &["burn"], exit(0));
    runner.on("mlxconfig", &["r"], exit(0));
    let manager = bluefield_manager(&runner, root.path());

    let status = manager.upgrade_status();
    assert_eq!(status.status, UpgradeStatusType::Success);
    assert_eq!(status.message, "ASIC 0 upgrade completed");

    let fw = root.path().join("fw-bf3.mfa");
    assert_eq!(
        flash_lines(&runner),
        vec![
            format!("flint -d {PCI} ir"),
            format!("flint -d {PCI} -i {} -y burn", fw.display()),
            format!("mlxconfig -d {PCI} -y r"),
        ]
    );
    assert_eq!(runner.count("mlxfwmanager", &["-u"]), 0);
}

#[test]
fn test_reactivation_failure_does_not_stop_burn() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_bluefield(&runner, PCI, "FW1", "FW2");
    runner.on("flint", &["ir"], exit(1));
    runner.on("flint", &["burn"], exit(0));
    runner.on("mlxconfig", &["r"], exit(0));
    let manager = bluefield_manager(&runner, root.path());

    assert_eq!(manager.upgrade_status().status, UpgradeStatusType::Success);
    assert_eq!(runner.count("flint", &["burn"]), 1);
}

#[test]
fn test_burn_failure_skips_config_reset() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_bluefield(&runner, PCI, "FW1", "FW2");
    runner.on("flint", &["ir"], exit(0));
    runner.on("flint", &["burn"], exit(1));
    let manager = bluefield_manager(&runner, root.path());

    let status = manager.upgrade_status();
    assert_eq!(status.status, UpgradeStatusType::Failed);
    assert_eq!(runner.count("mlxconfig", &["r"]), 0);
}

#[test]
fn test_config_reset_failure_fails_upgrade() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_bluefield(&runner, PCI, "FW1", "FW2");
    runner.on("flint", &["ir"], exit(0));
    runner.on("flint", &["burn"], exit(0));
    runner.on("mlxconfig", &["r"], exit(5));
    let manager = bluefield_manager(&runner, root.path());

    assert_eq!(manager.upgrade_status().status, UpgradeStatusType::Failed);
}

#[test]
fn test_reset_firmware_config() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_bluefield(&runner, PCI, "FW1", "FW1");
    runner.on("mlxconfig", &["r"], exit(0));
    let manager = bluefield_manager(&runner, root.path());

    manager.reset_firmware_config().unwrap();
    assert_eq!(runner.count("mlxconfig", &["-d", PCI, "-y", "r"]), 1);
    assert_eq!(runner.count("flint", &["burn"]), 0);

    runner.on("mlxconfig", &["r"], exit(1));
    assert!(matches!(
        manager.reset_firmware_config(),
        Err(FirmwareError::CommandFailed { .. })
    ));
}
