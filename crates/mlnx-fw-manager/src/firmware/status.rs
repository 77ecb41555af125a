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

// src/firmware/status.rs
// UpgradeStatus is the record each per-ASIC worker publishes exactly
// once. It is plain data so it can cross the process boundary as a
// single JSON line, and it lands in the coordinator's status queue.

use std::io::Write;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use serde::{Deserialize, Serialize};

use crate::firmware::error::{FirmwareError, FirmwareResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeStatusType {
    // Success covers both "upgraded" and "already up to date".
    Success,
    // Failed means a vendor tool returned non-zero.
    Failed,
    // Error means the worker itself hit an unexpected error.
    Error,
}

impl UpgradeStatusType {
    pub fn is_success(&self) -> bool {
        matches!(self, UpgradeStatusType::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeStatus {
    pub asic_index: usize,
    pub status: UpgradeStatusType,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub available_version: String,
    #[serde(default)]
    pub pci_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl UpgradeStatus {
    pub fn new(asic_index: usize, status: UpgradeStatusType, message: impl Into<String>) -> Self {
        Self {
            asic_index,
            status,
            message: message.into(),
            current_version: String::new(),
            available_version: String::new(),
            pci_id: None,
            timestamp: None,
        }
    }

    pub fn with_versions(mut self, current: &str, available: &str) -> Self {
        self.current_version = current.to_string();
        self.available_version = available.to_string();
        self
    }

    pub fn with_pci_id(mut self, pci_id: &str) -> Self {
        self.pci_id = Some(pci_id.to_string());
        self
    }

    // stamped sets the timestamp to now (RFC 3339, UTC).
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(chrono::Utc::now().to_rfc3339());
        self
    }

    pub fn to_json_line(&self) -> FirmwareResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_line(line: &str) -> FirmwareResult<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

// StatusSink is where a worker publishes its status record.
pub trait StatusSink {
    fn publish(&self, status: UpgradeStatus) -> FirmwareResult<()>;
}

// StatusSender is the producer half of the coordinator's status queue.
// Each worker gets its own clone.
#[derive(Debug, Clone)]
pub struct StatusSender(Sender<UpgradeStatus>);

// StatusReceiver is the single consumer half, owned by the coordinator.
#[derive(Debug)]
pub struct StatusReceiver(Receiver<UpgradeStatus>);

// status_queue creates a fresh multi-producer/single-consumer queue.
pub fn status_queue() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::channel();
    (StatusSender(tx), StatusReceiver(rx))
}

impl StatusSink for StatusSender {
    fn publish(&self, status: UpgradeStatus) -> FirmwareResult<()> {
        self.0.send(status).map_err(|e| {
            FirmwareError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("status queue closed: {e}"),
            ))
        })
    }
}

impl StatusReceiver {
    // drain takes every record currently queued without blocking.
    pub fn drain(&self) -> Vec<UpgradeStatus> {
        let mut records = Vec::new();
        loop {
            match self.0.try_recv() {
                Ok(status) => records.push(status),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        records
    }
}

// JsonLineSink writes each record as one JSON line. Worker processes
// publish through it on stdout.
pub struct JsonLineSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> StatusSink for JsonLineSink<W> {
    fn publish(&self, status: UpgradeStatus) -> FirmwareResult<()> {
        let line = status.to_json_line()?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
