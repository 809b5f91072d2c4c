use std::env;
use std::path::PathBuf;
use waterdata::{SiteStatus, WaterData, WaterDataError};

#[tokio::main]
async fn main() -> Result<(), WaterDataError> {
    env_logger::init();
    let state_code = env::args().nth(1).unwrap_or_else(|| "08".to_string());

    let client = WaterData::with_cache_folder(PathBuf::from("cache"));
    match client
        .site_listing()
        .state_code(&state_code)
        .site_status(SiteStatus::Active)
        .call()
        .await
    {
        Some(sites) => {
            println!("{} sites in state {}", sites.height(), state_code);
            println!("{}", sites.head(Some(5)));
        }
        None => eprintln!("Failed to retrieve site listing, see the log for details"),
    }
    Ok(())
}
