//! Entry point for the `lantern-lsp` binary.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use lantern_lsp::{StructuredHealthReporter, SystemConfigLoader, run};

fn main() -> ExitCode {
    let status = run(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        io::stdin().lock(),
        io::stdout().lock(),
        &mut io::stderr(),
    );
    ExitCode::from(status)
}
