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

// src/coordinator/worker.rs
// Per-ASIC worker processes. The coordinator re-executes its own binary
// with --worker, hands it a WorkerJob as JSON on stdin, and reads back a
// single UpgradeStatus JSON line from its stdout. A reader thread per
// worker forwards that line into the coordinator's status queue.
//
// Launching sits behind WorkerLauncher / WorkerHandle so the
// coordinator's start/join/terminate/kill sequencing can be driven
// without real processes.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::exec::runner::CommandRunner;
use crate::firmware::error::{FirmwareError, FirmwareResult};
use crate::firmware::manager::{FirmwareManager, ManagerState};
use crate::firmware::status::{
    JsonLineSink, StatusSender, StatusSink, UpgradeStatus, UpgradeStatusType,
};

// WORKER_FLAG is the hidden CLI flag that turns the binary into a worker.
pub const WORKER_FLAG: &str = "--worker";

// WorkerJob is everything a worker needs to upgrade one ASIC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerJob {
    pub state: ManagerState,
}

impl WorkerJob {
    pub fn new(state: ManagerState) -> Self {
        Self { state }
    }

    pub fn asic_index(&self) -> usize {
        self.state.asic.index
    }
}

// WorkerHandle controls one started worker.
pub trait WorkerHandle: Send {
    fn asic_index(&self) -> usize;

    // join waits up to timeout for the worker to exit, returning true
    // if it did.
    fn join(&mut self, timeout: Duration) -> io::Result<bool>;

    // terminate asks the worker to stop (SIGTERM).
    fn terminate(&mut self) -> io::Result<()>;

    // kill force-kills the worker and reaps it.
    fn kill(&mut self) -> io::Result<()>;

    // finish waits until everything the worker published has reached
    // the status queue. Only called for workers that exited on their own.
    fn finish(&mut self);
}

// WorkerLauncher starts workers. Every started worker publishes into
// its own clone of the status queue sender.
pub trait WorkerLauncher: Send + Sync {
    fn start(&self, job: WorkerJob, sink: StatusSender) -> FirmwareResult<Box<dyn WorkerHandle>>;
}

// ProcessLauncher runs each worker as a child process of `program`.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    // args are passed before WORKER_FLAG (e.g. --verbose, --nosyslog).
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    // current_exe launches workers from the running binary.
    pub fn current_exe() -> FirmwareResult<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn start(&self, job: WorkerJob, sink: StatusSender) -> FirmwareResult<Box<dyn WorkerHandle>> {
        let asic_index = job.asic_index();
        let launch_error = |reason: String| FirmwareError::WorkerLaunch { asic_index, reason };
        let payload = serde_json::to_string(&job)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(WORKER_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| launch_error(e.to_string()))?;

        let written = match child.stdin.take() {
            // stdin is dropped at the end of the arm so the worker sees EOF.
            Some(mut stdin) => writeln!(stdin, "{payload}").map_err(|e| e.to_string()),
            None => Err("worker stdin unavailable".to_string()),
        };
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| "worker stdout unavailable".to_string());

        let reader = written.and(stdout).and_then(|stdout| {
            thread::Builder::new()
                .name(format!("asic{asic_index}-status"))
                .spawn(move || forward_status(asic_index, stdout, sink))
                .map_err(|e| e.to_string())
        });
        let reader = match reader {
            Ok(reader) => reader,
            Err(reason) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(launch_error(reason));
            }
        };

        info!(
            asic = asic_index,
            pid = child.id(),
            "Started firmware upgrade worker for ASIC {asic_index}"
        );
        Ok(Box::new(ProcessHandle {
            asic_index,
            child,
            reader: Some(reader),
        }))
    }
}

// forward_status relays every status line a worker prints into the
// queue. Lines that are not status records are logged and skipped.
fn forward_status(asic_index: usize, stdout: ChildStdout, sink: StatusSender) {
    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(asic = asic_index, "Error reading worker output: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match UpgradeStatus::from_json_line(&line) {
            Ok(status) => {
                if let Err(e) = sink.publish(status) {
                    warn!(asic = asic_index, "Error processing status queue: {e}");
                }
            }
            Err(e) => debug!(asic = asic_index, "Ignoring worker output '{line}': {e}"),
        }
    }
}

struct ProcessHandle {
    asic_index: usize,
    child: Child,
    reader: Option<JoinHandle<()>>,
}

impl WorkerHandle for ProcessHandle {
    fn asic_index(&self) -> usize {
        self.asic_index
    }

    fn join(&mut self, timeout: Duration) -> io::Result<bool> {
        Ok(self.child.wait_timeout(timeout)?.is_some())
    }

    fn terminate(&mut self) -> io::Result<()> {
        let pid = Pid::from_raw(self.child.id() as i32);
        kill(pid, Signal::SIGTERM).map_err(io::Error::from)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }

    fn finish(&mut self) {
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            warn!(asic = self.asic_index, "Status reader thread panicked");
        }
    }
}

// run_worker is the worker process body: read the job from input,
// run the upgrade, publish exactly one status record to output.
pub fn run_worker<R: Read, W: Write>(
    input: R,
    output: W,
    runner: Arc<dyn CommandRunner>,
) -> FirmwareResult<()> {
    let job: WorkerJob = serde_json::from_reader(input)?;
    let asic_index = job.asic_index();
    info!(
        asic = asic_index,
        pid = std::process::id(),
        device = %job.state.asic.pci_id,
        "Firmware upgrade worker started"
    );

    let sink = JsonLineSink::new(output);
    match FirmwareManager::from_state(job.state, runner) {
        Ok(manager) => manager.run(&sink),
        Err(e) => sink.publish(
            UpgradeStatus::new(
                asic_index,
                UpgradeStatusType::Error,
                format!("Unexpected error: {e}"),
            )
            .stamped(),
        ),
    }
}
