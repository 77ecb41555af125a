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

use std::io;
use std::sync::Arc;

use clap::Parser;
use mlnx_fw_manager::cmd::args::Cli;
use mlnx_fw_manager::cmd::cmds::{App, EXIT_FAILURE, EXIT_SUCCESS};
use mlnx_fw_manager::cmd::logging::setup_logging;
use mlnx_fw_manager::coordinator::worker::{ProcessLauncher, run_worker};
use mlnx_fw_manager::exec::runner::SystemCommandRunner;
use mlnx_fw_manager::platform::paths::PlatformPaths;

fn main() {
    let cli = Cli::parse();

    // Syslog unless --nosyslog; console with --verbose or --nosyslog.
    // RUST_LOG in the environment overrides the level.
    setup_logging(cli.verbose, cli.nosyslog);

    let runner = Arc::new(SystemCommandRunner::new());

    if cli.worker {
        let exit_code = match run_worker(io::stdin().lock(), io::stdout().lock(), runner) {
            Ok(()) => EXIT_SUCCESS,
            Err(e) => {
                tracing::error!("Worker failed: {e}");
                EXIT_FAILURE
            }
        };
        std::process::exit(exit_code);
    }

    let launcher = match ProcessLauncher::current_exe() {
        Ok(launcher) => launcher.with_args(cli.worker_args()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let app = App::new(PlatformPaths::default(), runner, Arc::new(launcher));
    let exit_code = app.run(&cli, &mut io::stdout().lock());
    std::process::exit(exit_code);
}
