use std::env;
use waterdata::{mean_value, Service, WaterData, WaterDataError, VALUE_COLUMN};

#[tokio::main]
async fn main() -> Result<(), WaterDataError> {
    env_logger::init();
    configure_polars_display();
    let site = env::args().nth(1).unwrap_or_else(|| "09163500".to_string());

    let client = WaterData::new()?;
    let frame = client
        .time_series_frame()
        .sites(&site)
        .service(Service::InstantaneousValues)
        .period("P7D")
        .call()
        .await?;

    println!("{}", frame.head(Some(10)));
    if let Some(mean) = mean_value(&frame, VALUE_COLUMN)? {
        println!("Mean over {} readings: {:.2}", frame.height(), mean);
    }
    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
