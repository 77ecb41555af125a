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

use common::{ScriptedRunner, exit, ok, query_xml, script_spectrum};
use mlnx_fw_manager::firmware::bluefield::BlueFieldFirmware;
use mlnx_fw_manager::firmware::error::FirmwareError;
use mlnx_fw_manager::firmware::manager::{FirmwareManager, ManagerOptions, UpgradeOutcome};
use mlnx_fw_manager::firmware::status::{UpgradeStatusType, status_queue};
use mlnx_fw_manager::firmware::version::RetryPolicy;
use mlnx_fw_manager::inventory::asic::{AsicDescriptor, AsicFamily, AsicType};

const PCI: &str = "0000:03:00.0";

fn spc3() -> AsicDescriptor {
    AsicDescriptor {
        index: 0,
        pci_id: PCI.to_string(),
        device_id: Some("15b3:cf70".to_string()),
        asic_type: AsicType::Spc3,
    }
}

fn options() -> ManagerOptions {
    ManagerOptions {
        retry: RetryPolicy::new(3, Duration::ZERO),
        ..Default::default()
    }
}

fn fw_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("fw-spc3.mfa"), b"MFA2").unwrap();
    dir
}

fn manager(runner: &Arc<ScriptedRunner>, fw_root: &Path, options: ManagerOptions) -> FirmwareManager {
    FirmwareManager::new(spc3(), fw_root, &options, runner.clone()).unwrap()
}

#[test]
fn test_construction_queries_versions() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "30.2012.1012", "30.2016.1040");

    let manager = manager(&runner, root.path(), options());
    assert_eq!(manager.asic_index(), 0);
    assert_eq!(manager.family(), AsicFamily::Spectrum);
    assert_eq!(manager.fw_file(), root.path().join("fw-spc3.mfa"));
    assert_eq!(manager.current_version(), "30.2012.1012");
    assert_eq!(manager.available_version(), "30.2016.1040");
    assert!(manager.is_upgrade_required().unwrap());
}

#[test]
fn test_missing_firmware_file_fails_before_any_query() {
    let root = tempfile::tempdir().unwrap();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "1", "1");

    let err = FirmwareManager::new(spc3(), root.path(), &options(), runner.clone()).unwrap_err();
    assert!(matches!(err, FirmwareError::FirmwareFileNotFound(_)));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_unsupported_asic_type_for_family() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    let err = FirmwareManager::with_firmware(
        spc3(),
        Box::new(BlueFieldFirmware),
        root.path(),
        &options(),
        runner.clone(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        FirmwareError::UnsupportedAsicType {
            asic_index: 0,
            asic_type: AsicType::Spc3
        }
    ));
}

#[test]
fn test_version_query_is_retried() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW1");
    // device not ready on the first attempt
    runner.on_sequence(
        "mlxfwmanager",
        &["--query-format", PCI],
        vec![exit(1), ok(&query_xml("MT_0000000563", "FW1"))],
    );

    let manager = manager(&runner, root.path(), options());
    assert!(!manager.is_upgrade_required().unwrap());
    assert_eq!(runner.count("mlxfwmanager", &["--query-format"]), 2);
}

#[test]
fn test_version_query_gives_up() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    runner.on("mlxfwmanager", &["--query-format"], ok("<Devices></Devices>"));

    let err = FirmwareManager::new(spc3(), root.path(), &options(), runner.clone()).unwrap_err();
    assert!(matches!(
        err,
        FirmwareError::VersionQuery { attempts: 3, .. }
    ));
    assert_eq!(runner.count("mlxfwmanager", &["--query-format"]), 3);
}

#[test]
fn test_upgrade_required_is_stable() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW2");
    let manager = manager(&runner, root.path(), options());
    let calls = runner.calls().len();

    let first = manager.is_upgrade_required().unwrap();
    let second = manager.is_upgrade_required().unwrap();
    assert_eq!(first, second);
    assert_eq!(runner.calls().len(), calls);
}

#[test]
fn test_up_to_date_worker_reports_success_without_upgrading() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW1");
    let manager = manager(&runner, root.path(), options());

    let status = manager.upgrade_status();
    assert_eq!(status.status, UpgradeStatusType::Success);
    assert_eq!(status.message, "ASIC 0 firmware is up to date");
    assert_eq!(status.pci_id.as_deref(), Some(PCI));
    assert!(status.timestamp.is_some());
    assert_eq!(runner.count("mlxfwmanager", &["-u"]), 0);
}

#[test]
fn test_clear_semaphore_runs_before_upgrade_and_is_non_fatal() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW2");
    runner.on("flint", &["--clear_semaphore"], exit(3));
    runner.on("mlxfwmanager", &["-u"], exit(0));

    let options = ManagerOptions {
        clear_semaphore: true,
        ..options()
    };
    let manager = manager(&runner, root.path(), options);
    assert_eq!(manager.upgrade().unwrap(), UpgradeOutcome::Upgraded);

    let lines = runner.command_lines();
    let clear = lines.iter().position(|l| l.contains("--clear_semaphore")).unwrap();
    let update = lines.iter().position(|l| l.starts_with("mlxfwmanager -u")).unwrap();
    assert!(clear < update);
    assert_eq!(lines[clear], format!("flint -d {PCI} --clear_semaphore"));
}

#[test]
fn test_vendor_failure_is_failed_and_spawn_error_is_error() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW2");
    runner.on("mlxfwmanager", &["-u"], exit(1));
    let manager = manager(&runner, root.path(), options());

    let status = manager.upgrade_status();
    assert_eq!(status.status, UpgradeStatusType::Failed);
    assert_eq!(status.message, "ASIC 0 upgrade failed");
    assert_eq!(status.current_version, "FW1");
    assert_eq!(status.available_version, "FW2");

    runner.on_spawn_error("mlxfwmanager", &["-u"]);
    let status = manager.upgrade_status();
    assert_eq!(status.status, UpgradeStatusType::Error);
    assert!(status.message.starts_with("Unexpected error: "));
}

#[test]
fn test_run_publishes_exactly_one_record() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW2");
    runner.on("mlxfwmanager", &["-u"], exit(0));
    let manager = manager(&runner, root.path(), options());

    let (sender, receiver) = status_queue();
    manager.run(&sender).unwrap();
    let records = receiver.drain();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, UpgradeStatusType::Success);
    assert_eq!(records[0].message, "ASIC 0 upgrade completed");
}

#[test]
fn test_from_state_does_not_requery() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW2");
    let state = manager(&runner, root.path(), options()).state().clone();

    let fresh = ScriptedRunner::new();
    let rebuilt = FirmwareManager::from_state(state.clone(), fresh.clone()).unwrap();
    assert_eq!(rebuilt.state(), &state);
    assert!(fresh.calls().is_empty());
}

#[test]
fn test_verbose_sets_mft_debug_env() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW1");
    let options = ManagerOptions {
        verbose: true,
        ..options()
    };
    manager(&runner, root.path(), options);

    for call in runner.calls() {
        assert_eq!(call.env_value("FLASH_ACCESS_DEBUG"), Some("1"));
        assert_eq!(call.env_value("FW_COMPS_DEBUG"), Some("1"));
    }
}

#[test]
fn test_reset_is_unsupported_on_spectrum() {
    let root = fw_root();
    let runner = ScriptedRunner::new();
    script_spectrum(&runner, PCI, "FW1", "FW1");
    let manager = manager(&runner, root.path(), options());
    assert!(matches!(
        manager.reset_firmware_config(),
        Err(FirmwareError::Unsupported { .. })
    ));
    assert_eq!(runner.count("mlxconfig", &[]), 0);
}
