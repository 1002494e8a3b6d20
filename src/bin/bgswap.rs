//! bgswap CLI tool
//!
//! Replaces product photo backgrounds and verifies the subject was preserved.

#[cfg(feature = "cli")]
use bgswap::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
