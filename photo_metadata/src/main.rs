use clap::Parser;
use photo_metadata::tag_file;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Write GPS coordinates into the EXIF block of a JPEG image
#[derive(Parser)]
#[command(name = "gps_tagger")]
#[command(version)]
struct Cli {
    /// JPEG image to tag
    image: PathBuf,

    /// Latitude in decimal degrees (negative for south)
    #[arg(allow_negative_numbers = true)]
    latitude: f64,

    /// Longitude in decimal degrees (negative for west)
    #[arg(allow_negative_numbers = true)]
    longitude: f64,

    /// Output file, defaults to `modified_<name>` next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let written = tag_file(&cli.image, cli.latitude, cli.longitude, cli.output.as_deref())?;
    println!("{}", written.display());

    Ok(())
}
