//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

#[tokio::main]
async fn main() {
    if let Err(err) = parcel_cli::run().await {
        eprintln!("parcels: {err}");
        std::process::exit(1);
    }
}
