use clarityco::drive::{DriveClient, RemoteStore};
use clarityco::settings::Settings;

/// One-shot diagnostic for the remote store: connect with the configured
/// credentials and list the managed folder. Useful for checking a token
/// before starting the site.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::new()?;
    let mut client = DriveClient::new(&settings.drive);

    println!("connecting to folder '{}'...", settings.drive.folder_name);
    client.connect().await?;
    println!("connected.");

    let files = client.list_files().await?;
    if files.is_empty() {
        println!("folder is empty.");
    } else {
        println!("{} file(s):", files.len());
        for file in files {
            println!(
                "  {:40} {:30} {}",
                file.name,
                file.mime_type,
                file.modified_time.unwrap_or_default(),
            );
        }
    }

    Ok(())
}
