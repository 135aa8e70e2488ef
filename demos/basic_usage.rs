// demos/basic_usage.rs
// Run with: cargo run --example basic_usage
//
// Reads SFTP_HOST, SFTP_PORT, SFTP_USERNAME, SFTP_PASSWORD / SFTP_PRIVATE_KEY,
// SFTP_REMOTE_PATH and SFTP_CONNECTION_TIMEOUT from the environment.

use anyhow::Context;
use sftp_session::{ConnectionManager, Settings, utils};
use std::time::UNIX_EPOCH;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env().context("loading settings")?;
    let config = settings.session_config()?;
    let mut manager = ConnectionManager::new(config);

    let remote_file = utils::join(&settings.remote_path, "mock.file");
    let local_file = "mock.file";

    let result = run(&mut manager, &settings.remote_path, &remote_file, local_file).await;
    manager.close().await;
    result
}

async fn run(
    manager: &mut ConnectionManager,
    remote_path: &str,
    remote_file: &str,
    local_file: &str,
) -> anyhow::Result<()> {
    // 1. List files in the remote directory
    println!("Listing [{}] ...\n", remote_path);
    for file in manager.list_directory(remote_path).await? {
        if file.is_dir {
            println!("{:>19} {:>12} {}/", "", "PRE", file.name);
        } else {
            let modified = file
                .modified
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs().to_string())
                .unwrap_or_default();
            println!("{:>19} {:>12} {}", modified, file.size, file.name);
        }
    }

    // 2. Download the remote file
    println!("Downloading [{}] to [{}] ...", remote_file, local_file);
    let download = manager.download_to_file(remote_file, local_file).await?;
    println!("{} bytes copied", download.bytes_copied);

    // 3. Fetch file metadata
    let info = manager.stat_file(remote_file).await?;
    println!("{} ({} bytes)", info.name, info.size);

    // 4. Upload it back
    println!("Uploading [{}] to [{}] ...", local_file, remote_file);
    let upload = manager.upload_from_file(local_file, remote_file).await?;
    println!("{} bytes copied", upload.bytes_copied);

    Ok(())
}
