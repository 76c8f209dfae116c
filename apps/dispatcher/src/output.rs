// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The NDJSON record sink: serialises one [`OutputEvent`] per line to
//! standard output, serialised by a single mutex (`EMIT_MUTEX`) so
//! concurrently-writing live processors never interleave a line.

use anyhow::Result;
use meetcap_core::events::OutputEvent;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

pub struct OutputSink {
    stdout: Mutex<Stdout>,
}

impl OutputSink {
    #[must_use]
    pub fn new() -> Self {
        Self { stdout: Mutex::new(tokio::io::stdout()) }
    }

    /// Serialises and writes one record, followed by a newline, then flushes.
    pub async fn emit(&self, event: OutputEvent) -> Result<()> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::new()
    }
}
