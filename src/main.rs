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

use stackit_cli::shared::exitcode;
use stackit_cli::{CancelToken, Runtime};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cancel = CancelToken::new();
    tokio::spawn(watch_signals(cancel.clone()));

    let mut runtime = match Runtime::from_process(cancel) {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let code = stackit_cli::run(&argv, &mut runtime).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// First signal cancels the running command, a second one exits immediately.
async fn watch_signals(cancel: CancelToken) {
    for _ in 0..2 {
        if !next_signal().await {
            return;
        }
        if cancel.is_cancelled() {
            std::process::exit(exitcode::INTERRUPTED);
        }
        cancel.cancel();
    }
}

#[cfg(unix)]
async fn next_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(_) => return tokio::signal::ctrl_c().await.is_ok(),
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.is_ok(),
        _ = term.recv() => true,
    }
}

#[cfg(not(unix))]
async fn next_signal() -> bool {
    tokio::signal::ctrl_c().await.is_ok()
}
