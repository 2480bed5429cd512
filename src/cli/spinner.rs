// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Progress indicator on stderr for long-running operations

use super::display::StatusIcon;
use super::printer::{lock_writer, Printer, SharedWriter};
use crate::infrastructure::constants::{SPINNER_FRAMES, SPINNER_INTERVAL_MILLIS};
use colored::Colorize;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Animates `message` until stopped. Frames are drawn only when stderr is a
/// terminal; the final line is written either way. Dropping an unfinished
/// spinner finishes it as failed.
pub struct Spinner {
    err: SharedWriter,
    message: String,
    stopped: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
    animated: bool,
}

impl Spinner {
    pub fn start(printer: &Printer, message: impl Into<String>) -> Self {
        let message = message.into();
        let err = printer.stderr();
        let stopped = Arc::new(AtomicBool::new(false));
        let animated = printer.stderr_is_terminal();

        let stop_tx = if animated {
            let (tx, rx) = oneshot::channel();
            tokio::spawn(animate(err.clone(), message.clone(), stopped.clone(), rx));
            Some(tx)
        } else {
            None
        };

        Self {
            err,
            message,
            stopped,
            stop_tx,
            animated,
        }
    }

    pub fn stop(mut self) {
        self.finish(true);
    }

    pub fn stop_with_error(mut self) {
        self.finish(false);
    }

    fn finish(&mut self, success: bool) {
        let mut err = lock_writer(&self.err);
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        let mark = if success {
            StatusIcon::SUCCESS
        } else {
            StatusIcon::ERROR
        };
        let _ = if self.animated {
            let mark = if success { mark.green() } else { mark.red() };
            writeln!(err, "\r\x1b[2K{} {}", mark, self.message)
        } else {
            writeln!(err, "{} {}", mark, self.message)
        };
        let _ = err.flush();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish(false);
    }
}

async fn animate(
    err: SharedWriter,
    message: String,
    stopped: Arc<AtomicBool>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(SPINNER_INTERVAL_MILLIS));
    for frame in SPINNER_FRAMES.iter().cycle() {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let mut w = lock_writer(&err);
                // checked under the lock so no frame lands after the final line
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                let _ = write!(w, "\r{} {}", frame, message);
                let _ = w.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::testing::SharedBuffer;

    fn printer(terminal: bool) -> (Printer, SharedBuffer) {
        let err = SharedBuffer::new();
        let printer = Printer::new(
            Box::new(SharedBuffer::new()),
            Box::new(err.clone()),
            Box::new(std::io::empty()),
        )
        .with_terminals(false, terminal);
        (printer, err)
    }

    #[tokio::test]
    async fn test_plain_stop_writes_final_line_once() {
        let (printer, err) = printer(false);
        let spinner = Spinner::start(&printer, "Creating instance");
        spinner.stop();
        let text = err.contents();
        assert!(text.contains("✓ Creating instance"));
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_drop_marks_failure() {
        let (printer, err) = printer(false);
        {
            let _spinner = Spinner::start(&printer, "Deleting network");
        }
        assert!(err.contents().contains("✗ Deleting network"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_stops_after_finish() {
        let (printer, err) = printer(true);
        let spinner = Spinner::start(&printer, "Waiting");
        tokio::time::sleep(Duration::from_millis(350)).await;
        spinner.stop_with_error();
        let after_stop = err.contents();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(err.contents(), after_stop);
        assert!(after_stop.contains("| Waiting"));
        assert!(after_stop.contains("✗"));
        assert!(after_stop.trim_end().ends_with("Waiting"));
    }
}
