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

// src/coordinator/report.rs
// UpgradeReport holds the per-ASIC outcome of a parallel upgrade, and
// folds it into the all-failed / partial / success result.

use std::collections::BTreeMap;

use crate::firmware::error::{FirmwareError, FirmwareResult, Operation};
use crate::firmware::status::UpgradeStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsicOutcome {
    // Reported is a worker that exited and posted its status record.
    Reported(UpgradeStatus),
    // TimedOut is a worker that exceeded the per-ASIC deadline; any
    // record it may have posted is not consulted.
    TimedOut,
    // Missing is a worker that exited without posting a record.
    Missing,
    // LaunchFailed is a worker that could not be started.
    LaunchFailed(String),
}

impl AsicOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AsicOutcome::Reported(status) if status.status.is_success())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    outcomes: BTreeMap<usize, AsicOutcome>,
}

impl UpgradeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, asic_index: usize, outcome: AsicOutcome) {
        self.outcomes.insert(asic_index, outcome);
    }

    pub fn outcome(&self, asic_index: usize) -> Option<&AsicOutcome> {
        self.outcomes.get(&asic_index)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (usize, &AsicOutcome)> {
        self.outcomes.iter().map(|(index, outcome)| (*index, outcome))
    }

    // statuses returns the status records that were actually consulted.
    pub fn statuses(&self) -> Vec<&UpgradeStatus> {
        self.outcomes
            .values()
            .filter_map(|outcome| match outcome {
                AsicOutcome::Reported(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.total() - self.success_count()
    }

    pub fn result(&self) -> FirmwareResult<()> {
        FirmwareError::aggregate(Operation::Upgrade, self.failure_count(), self.total())
    }
}
