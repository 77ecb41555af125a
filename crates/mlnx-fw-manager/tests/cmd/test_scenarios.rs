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

use std::sync::Arc;

use clap::Parser;
use common::{
    Behavior, Event, FakeLauncher, ScriptedRunner, TestPlatform, exit, lspci_dn, ok,
    script_bluefield, script_spectrum, test_options,
};
use mlnx_fw_manager::cmd::args::Cli;
use mlnx_fw_manager::cmd::cmds::{App, EXIT_FAILURE, EXIT_SUCCESS, FW_UPGRADE_IS_REQUIRED};
use mlnx_fw_manager::firmware::status::UpgradeStatusType;
use mlnx_fw_manager::inventory::asic::AsicType;

const SPC3: &str = "15b3:cf70";
const BF3: &str = "15b3:a2dc";
const PCI: &str = "0000:03:00.0";

fn run(
    platform: &TestPlatform,
    runner: &Arc<ScriptedRunner>,
    launcher: &Arc<FakeLauncher>,
    args: &[&str],
) -> (i32, String) {
    let app = App::new(platform.paths.clone(), runner.clone(), launcher.clone())
        .with_options(test_options());
    let cli = Cli::parse_from(std::iter::once("mlnx-fw-manager").chain(args.iter().copied()));
    let mut out = Vec::new();
    let code = app.run(&cli, &mut out);
    (code, String::from_utf8(out).unwrap())
}

// single_spc3 is a single-ASIC Spectrum-3 system with no asic.conf.
fn single_spc3(current: &str, available: &str) -> (TestPlatform, Arc<ScriptedRunner>) {
    let platform = TestPlatform::new();
    platform.install_firmware(AsicType::Spc3);
    let runner = ScriptedRunner::new();
    runner.on("lspci", &["-Dn"], ok(&lspci_dn(&[(PCI, SPC3)])));
    script_spectrum(&runner, PCI, current, available);
    (platform, runner)
}

// multi_spectrum is an n-ASIC Spectrum-3 system declared in asic.conf.
fn multi_spectrum(n: usize, current: &str, available: &str) -> (TestPlatform, Arc<ScriptedRunner>) {
    let platform = TestPlatform::new();
    platform.install_firmware(AsicType::Spc3);
    let runner = ScriptedRunner::new();

    let pcis: Vec<String> = (0..n).map(|i| format!("0000:0{}:00.0", i + 1)).collect();
    let mut conf = format!("NUM_ASIC={n}\n");
    for (i, pci) in pcis.iter().enumerate() {
        conf.push_str(&format!("DEV_ID_ASIC_{i}={pci}\n"));
        script_spectrum(&runner, pci, current, available);
    }
    platform.write_asic_conf(&conf);

    let devices: Vec<(&str, &str)> = pcis.iter().map(|p| (p.as_str(), SPC3)).collect();
    runner.on("lspci", &["-Dn"], ok(&lspci_dn(&devices)));
    (platform, runner)
}

#[test]
fn test_single_asic_dry_run_up_to_date() {
    let (platform, runner) = single_spc3("FW1", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--dry-run"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "Firmware is up to date.\n");
    assert!(launcher.events().is_empty());
}

#[test]
fn test_single_asic_dry_run_with_delta() {
    let (platform, runner) = single_spc3("FW1", "FW2");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["-d"]);
    assert_eq!(code, FW_UPGRADE_IS_REQUIRED);
    assert_eq!(out, "Firmware upgrade is required.\n");
    assert_eq!(runner.count("mlxfwmanager", &["-u"]), 0);
}

#[test]
fn test_dry_run_construction_failure() {
    let platform = TestPlatform::new();
    let runner = ScriptedRunner::new();
    runner.on("lspci", &["-Dn"], ok(&lspci_dn(&[])));
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--dry-run"]);
    assert_eq!(code, EXIT_FAILURE);
    assert!(out.starts_with("Firmware check failed: "));
}

#[test]
fn test_spectrum_reactivation_upgrade() {
    let (platform, runner) = single_spc3("FW1", "FW2");
    runner.on_sequence("mlxfwmanager", &["-u"], vec![exit(2), exit(0)]);
    runner.on("flint", &["ir"], exit(0));
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &[]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "Firmware upgrade completed successfully.\n");
    assert_eq!(runner.count("mlxfwmanager", &["-u"]), 2);
    assert_eq!(runner.count("flint", &["ir"]), 1);
}

#[test]
fn test_upgrade_skipped_when_up_to_date() {
    let (platform, runner) = single_spc3("FW1", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &[]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "Firmware is up to date.\n");
    assert!(launcher.events().is_empty());
}

#[test]
fn test_bluefield_reset() {
    let platform = TestPlatform::new();
    platform.install_firmware(AsicType::Bf3);
    let pcis = ["0000:08:00.0", "0000:09:00.0"];
    platform.write_asic_conf(&format!(
        "NUM_ASIC=2\nDEV_ID_ASIC_0={}\nDEV_ID_ASIC_1={}\n",
        pcis[0], pcis[1]
    ));
    let runner = ScriptedRunner::new();
    runner.on("lspci", &["-Dn"], ok(&lspci_dn(&[(pcis[0], BF3), (pcis[1], BF3)])));
    for pci in pcis {
        script_bluefield(&runner, pci, "FW1", "FW2");
    }
    runner.on("mlxconfig", &["r"], exit(0));
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--reset"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "Firmware configuration reset completed successfully.\n");
    for pci in pcis {
        assert_eq!(runner.count("mlxconfig", &["-d", pci, "-y", "r"]), 1);
    }
    assert_eq!(runner.count("flint", &["burn"]), 0);
    assert_eq!(runner.count("mlxfwmanager", &["-u"]), 0);
    assert!(launcher.events().is_empty());
}

#[test]
fn test_reset_partial_failure_exits_zero() {
    let platform = TestPlatform::new();
    platform.install_firmware(AsicType::Bf3);
    let pcis = ["0000:08:00.0", "0000:09:00.0"];
    platform.write_asic_conf(&format!(
        "NUM_ASIC=2\nDEV_ID_ASIC_0={}\nDEV_ID_ASIC_1={}\n",
        pcis[0], pcis[1]
    ));
    let runner = ScriptedRunner::new();
    runner.on("lspci", &["-Dn"], ok(&lspci_dn(&[(pcis[0], BF3), (pcis[1], BF3)])));
    for pci in pcis {
        script_bluefield(&runner, pci, "FW1", "FW1");
    }
    runner.on("mlxconfig", &["r"], exit(0));
    runner.on("mlxconfig", &[pcis[1], "r"], exit(1));
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["-r"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(
        out,
        "Firmware configuration reset partially failed: Some BlueField ASIC resets failed (1/2)\n"
    );
}

#[test]
fn test_reset_on_spectrum_fails() {
    let (platform, runner) = single_spc3("FW1", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--reset"]);
    assert_eq!(code, EXIT_FAILURE);
    assert!(out.starts_with("Firmware reset failed: "));
    assert_eq!(runner.count("mlxconfig", &[]), 0);
}

#[test]
fn test_four_asic_partial_failure() {
    let (platform, runner) = multi_spectrum(4, "FW1", "FW2");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::Publish(UpgradeStatusType::Success));
    launcher.set(2, Behavior::Publish(UpgradeStatusType::Failed));

    let (code, out) = run(&platform, &runner, &launcher, &[]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(
        out,
        "Firmware upgrade partially failed: Some ASIC upgrades failed (1/4)\n"
    );
    let finished = launcher
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Finish(_)))
        .count();
    assert_eq!(finished, 4);
}

#[test]
fn test_all_asics_failed() {
    let (platform, runner) = multi_spectrum(2, "FW1", "FW2");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::Publish(UpgradeStatusType::Failed));

    let (code, out) = run(&platform, &runner, &launcher, &[]);
    assert_eq!(code, EXIT_FAILURE);
    assert_eq!(out, "Firmware upgrade failed: All ASIC upgrades failed\n");
}

#[test]
fn test_simx_short_circuit() {
    let (platform, runner) = single_spc3("FW1", "FW2");
    runner.on(
        "lspci",
        &["-vvv"],
        ok("00:00.0 Host bridge: Intel Corporation\n\tSubsystem: Mellanox SimX device\n"),
    );
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--upgrade"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "No FW upgrade for SimX platform\n");
    assert!(!platform.paths.lock_file.exists());
    assert!(launcher.events().is_empty());
    assert_eq!(runner.count("lspci", &["-Dn"]), 0);
}

#[test]
fn test_status_single_asic_flag() {
    let (platform, runner) = single_spc3("FW1", "FW2");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--status"]);
    assert_eq!(code, FW_UPGRADE_IS_REQUIRED);
    assert_eq!(
        out,
        "Firmware Status Report (ASIC 0):\n\
         ASIC 0: Upgrade needed\n\
         Summary: 0 up to date, 1 need upgrade, 0 errors\n"
    );
    assert!(launcher.events().is_empty());
}

#[test]
fn test_status_flag_rejected_on_multi_asic() {
    let (platform, runner) = multi_spectrum(2, "FW1", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--status"]);
    assert_eq!(code, EXIT_FAILURE);
    assert!(out.starts_with("Error: Multi-ASIC system detected (2 ASICs).\n"));
}

#[test]
fn test_status_all() {
    let (platform, runner) = multi_spectrum(2, "FW1", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--status", "all"]);
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(
        out,
        "Firmware Status Report (2 ASIC(s)):\n\
         ASIC 0: Up to date\n\
         ASIC 1: Up to date\n\
         Summary: 2 up to date, 0 need upgrade, 0 errors\n"
    );
}

#[test]
fn test_status_single_index_on_multi_asic() {
    let (platform, runner) = multi_spectrum(2, "FW1", "FW1");
    script_spectrum(&runner, "0000:02:00.0", "FW0", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--status", "1"]);
    assert_eq!(code, FW_UPGRADE_IS_REQUIRED);
    assert!(out.contains("ASIC 1: Upgrade needed\n"));
    assert!(!out.contains("ASIC 0:"));
}

#[test]
fn test_status_bad_asic_ids() {
    let (platform, runner) = multi_spectrum(2, "FW1", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let (code, out) = run(&platform, &runner, &launcher, &["--status", "abc"]);
    assert_eq!(code, EXIT_FAILURE);
    assert_eq!(out, "Error: Invalid ASIC ID 'abc'. Use a number or 'all'.\n");

    let (code, out) = run(&platform, &runner, &launcher, &["--status", "5"]);
    assert_eq!(code, EXIT_FAILURE);
    assert_eq!(out, "Error: ASIC 5 not found. System has 2 ASIC(s).\n");
}

#[test]
fn test_status_is_repeatable() {
    let (platform, runner) = multi_spectrum(2, "FW1", "FW1");
    script_spectrum(&runner, "0000:02:00.0", "FW0", "FW1");
    let launcher = FakeLauncher::new(runner.clone(), Behavior::RunManager);

    let first = run(&platform, &runner, &launcher, &["--status", "all"]);
    let second = run(&platform, &runner, &launcher, &["--status", "all"]);
    assert_eq!(first, second);
    assert_eq!(first.0, FW_UPGRADE_IS_REQUIRED);
    assert_eq!(runner.count("mlxfwmanager", &["-u"]), 0);
}
