//! CLI entry point for omegadl.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;

/// Process exit outcome.
///
/// `Success` (0) when every chapter completed, `Partial` (1) when some did,
/// `Failure` (2) when none did, the run was interrupted, or startup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Partial,
    Failure,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_omegadl().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
