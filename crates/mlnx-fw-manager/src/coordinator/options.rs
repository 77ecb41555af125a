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

// src/coordinator/options.rs
// CoordinatorOptions controls where firmware comes from and how the
// per-ASIC workers are run and bounded.

use std::time::Duration;

use crate::firmware::manager::ManagerOptions;
use crate::firmware::version::RetryPolicy;

// DEFAULT_WORKER_TIMEOUT bounds each per-ASIC worker's join.
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(600);

// DEFAULT_TERMINATE_GRACE is how long a terminated worker gets before
// it is force-killed.
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    // verbose turns on MFT debug variables for every vendor tool call.
    pub verbose: bool,

    // from_image selects the next-boot image as the firmware source
    // instead of the running image's /etc/mlnx.
    pub from_image: bool,

    // clear_semaphore is passed through to every worker.
    pub clear_semaphore: bool,

    pub worker_timeout: Duration,

    pub terminate_grace: Duration,

    // retry bounds the per-ASIC version query at construction time.
    pub retry: RetryPolicy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            from_image: false,
            clear_semaphore: false,
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
            terminate_grace: DEFAULT_TERMINATE_GRACE,
            retry: RetryPolicy::default(),
        }
    }
}

impl CoordinatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_from_image(mut self, from_image: bool) -> Self {
        self.from_image = from_image;
        self
    }

    pub fn with_clear_semaphore(mut self, clear_semaphore: bool) -> Self {
        self.clear_semaphore = clear_semaphore;
        self
    }

    pub fn with_worker_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    // Sets the version query retry policy. Tests use a zero delay.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            verbose: self.verbose,
            clear_semaphore: self.clear_semaphore,
            retry: self.retry,
        }
    }
}
