//! Example: build-pipeline changeset flow
//!
//! Sync a depot path, garbage-collect leftover empty changesets, then
//! run one edit through a named changeset and submit it.
//!
//! Run with: cargo run --example build_flow -- <p4-local-path>
//!
//! Connection settings come from the standard Perforce environment
//! variables (P4USER, P4CLIENT, P4PORT).

use p4::{P4Client, P4Config, SyncOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let repo_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("Usage: build_flow <p4-local-path>");
            std::process::exit(1);
        }
    };

    let mut config = P4Config::new(
        std::env::var("P4USER")?,
        std::env::var("P4CLIENT")?,
        std::env::var("P4PORT")?,
        "p4",
        std::env::current_dir()?,
    );
    config.verbose = true;

    let client = P4Client::new(config)?;

    println!("Getting latest of {repo_path}");
    client.sync(&repo_path, SyncOptions { force: true }).await?;
    println!("✓ Got latest");

    println!("Cleaning up empty changesets...");
    client.delete_empty_changesets().await?;

    let changeset = client.create_changeset("Build Test").await?;
    println!("✓ Created changeset {changeset}");

    client.check_out(&changeset, &repo_path).await?;
    println!("✓ Checked out {repo_path}");

    client.revert_unchanged(&repo_path).await?;
    client.submit(&changeset).await?;
    println!("✓ Submitted changeset {changeset}");

    Ok(())
}
