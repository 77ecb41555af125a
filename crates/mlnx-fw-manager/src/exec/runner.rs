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

// src/exec/runner.rs
// CommandRunner is the one seam through which every external tool
// (lspci, mlxfwmanager, flint, mlxconfig, sonic-installer, mount) is
// executed. Production code uses SystemCommandRunner; tests swap in
// scripted fakes.

use std::io;
use std::process::Stdio;

use tracing::debug;

use crate::exec::command::{CommandOutput, CommandSpec};

// CommandRunner runs a command to completion and captures its output.
// An Err is only returned when the process could not be run at all;
// a non-zero exit is reported through CommandOutput.
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;
}

// SystemCommandRunner executes commands on the host. stdin is always
// null, so none of the vendor tools can block on an interactive prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        debug!(cmd = %spec, "Running command");

        let output = spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        let output = CommandOutput::from(output);
        debug!(
            cmd = %spec,
            exit_code = ?output.exit_code,
            "Command finished"
        );
        Ok(output)
    }
}
