use anyhow::Result;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use register_sync::{
    FetchRegisterJob, HttpRegisterClient, LocationStore, LogReporter, NullScheduler,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("sync") | None => run_sync(),
        Some("list") => run_list(),
        Some(other) => {
            eprintln!("unknown command: {other}");
            eprintln!("usage: register-sync [sync|list]");
            std::process::exit(2);
        }
    }
}

fn db_path() -> PathBuf {
    env::var("REGISTER_SYNC_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("locations.db"))
}

fn open_client() -> Result<HttpRegisterClient> {
    let client = match env::var("REGISTER_BASE_URL") {
        Ok(base_url) => HttpRegisterClient::with_base_url(base_url)?,
        Err(_) => HttpRegisterClient::new()?,
    };
    Ok(client)
}

fn run_sync() -> Result<()> {
    let store = LocationStore::open(&db_path())?;
    let client = open_client()?;

    let job = FetchRegisterJob::new(&client, &LogReporter, &NullScheduler);
    let report = job.run(&store)?;

    println!("{}", report.summary());
    Ok(())
}

fn run_list() -> Result<()> {
    let store = LocationStore::open(&db_path())?;
    let locations = store.all_locations()?;

    for location in &locations {
        let span = match (location.start_date, location.end_date) {
            (Some(start), Some(end)) => format!(" ({start} to {end})"),
            (Some(start), None) => format!(" (since {start})"),
            (None, Some(end)) => format!(" (until {end})"),
            (None, None) => String::new(),
        };
        println!("{}  {}{}", location.code, location.name, span);
    }
    println!("{} locations", locations.len());

    Ok(())
}
