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

// src/cmd/logging.rs
// Logging setup. Events go to syslog by default and to stderr with
// --verbose or --nosyslog. stdout is never used for logs; it carries
// user-facing output and, in worker processes, the status record.
//
// The syslog sink is a tracing-subscriber MakeWriter over a syslog
// crate Logger (RFC 3164, facility user), tagged with the process id
// so interleaved worker output can be told apart.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use syslog::{Facility, Formatter3164, Logger, LoggerBackend};
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const SYSLOG_IDENT: &str = "mellanox-fw-manager";
pub const SYSLOG_SOCKET: &str = "/dev/log";

type SyslogLogger = Logger<LoggerBackend, Formatter3164>;

fn formatter() -> Formatter3164 {
    Formatter3164 {
        facility: Facility::LOG_USER,
        hostname: None,
        process: SYSLOG_IDENT.to_string(),
        pid: std::process::id(),
    }
}

#[derive(Clone)]
pub struct SyslogMakeWriter {
    // logger is None when the syslog socket could not be reached;
    // events are then dropped.
    logger: Option<Arc<Mutex<SyslogLogger>>>,
}

impl SyslogMakeWriter {
    pub fn connect(path: &Path) -> syslog::Result<Self> {
        let logger = syslog::unix_custom(formatter(), path)?;
        Ok(Self {
            logger: Some(Arc::new(Mutex::new(logger))),
        })
    }

    pub fn disconnected() -> Self {
        Self { logger: None }
    }

    fn writer_for(&self, level: Level) -> SyslogWriter {
        SyslogWriter {
            logger: self.logger.clone(),
            level,
            buf: Vec::new(),
        }
    }
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer_for(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.writer_for(*meta.level())
    }
}

// SyslogWriter buffers one formatted event and logs it when dropped,
// at the syslog severity matching the event level.
pub struct SyslogWriter {
    logger: Option<Arc<Mutex<SyslogLogger>>>,
    level: Level,
    buf: Vec<u8>,
}

impl Write for SyslogWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogWriter {
    fn drop(&mut self) {
        let Some(logger) = &self.logger else {
            return;
        };
        let message = String::from_utf8_lossy(&self.buf);
        let message = message.trim_end();
        if message.is_empty() {
            return;
        }

        let mut logger = logger.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = match self.level {
            Level::ERROR => logger.err(message),
            Level::WARN => logger.warning(message),
            Level::INFO => logger.info(message),
            _ => logger.debug(message),
        };
        // tracing can't be used from inside its own writer.
        if let Err(e) = sent {
            eprintln!("{SYSLOG_IDENT}: failed to send to syslog ({e}): {message}");
        }
    }
}

// setup_logging installs the global subscriber. RUST_LOG overrides the
// level chosen by --verbose.
pub fn setup_logging(verbose: bool, nosyslog: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let syslog_layer = (!nosyslog).then(|| {
        let writer = SyslogMakeWriter::connect(Path::new(SYSLOG_SOCKET)).unwrap_or_else(|e| {
            eprintln!("{SYSLOG_IDENT}: syslog unavailable ({e}), syslog output disabled");
            SyslogMakeWriter::disconnected()
        });
        fmt::layer()
            .with_writer(writer)
            .without_time()
            .with_ansi(false)
            .with_target(false)
    });

    let console_layer = (verbose || nosyslog).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(false)
    });

    // A subscriber may already be installed (e.g. in tests).
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(syslog_layer)
        .with(console_layer)
        .try_init();
}
