use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use ks03_led_controller::*;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Radio address or platform id of the strip; takes priority over name matching
    #[arg(short, long)]
    address: Option<String>,

    /// Substring of the advertised name to match
    #[arg(short, long, default_value = "KS03")]
    name: String,

    /// Match by the revision's advertised service UUID instead of the name
    #[arg(long)]
    match_service: bool,

    /// Hardware revision, selects the GATT profile
    #[arg(short, long, value_enum, default_value_t = Revision::Afd)]
    revision: Revision,

    /// Scan window in seconds
    #[arg(long, default_value_t = 10)]
    scan_timeout: u64,

    /// Idle seconds before the session drops the radio connection
    #[arg(long, default_value_t = 10)]
    idle_timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum Revision {
    /// 0000afdX UUID family
    Afd,
    /// Short-form EEA0/EE01 UUID family
    Ee,
}

impl From<Revision> for HardwareRevision {
    fn from(revision: Revision) -> Self {
        match revision {
            Revision::Afd => HardwareRevision::Afd,
            Revision::Ee => HardwareRevision::Ee,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Demonstration of LED features
    Demo {
        /// Duration of each demo step in seconds
        #[arg(short, long, default_value_t = 5)]
        duration: u64,
    },
    /// Turn the strip on
    On,
    /// Turn the strip off
    Off,
    /// Set brightness
    Brightness {
        /// Brightness level (0-100)
        #[arg(short, long, default_value_t = 100)]
        level: u8,
    },
    /// Set hue
    Hue {
        /// Hue in degrees (0-360)
        #[arg(short, long, default_value_t = 0)]
        degrees: u16,
    },
    /// Set saturation
    Saturation {
        /// Saturation level (0-100)
        #[arg(short, long, default_value_t = 100)]
        percent: u8,
    },
    /// Set hue, saturation and brightness in one go
    Color {
        /// Hue in degrees (0-360)
        #[arg(long, default_value_t = 0)]
        hue: u16,
        /// Saturation level (0-100)
        #[arg(long, default_value_t = 100)]
        saturation: u8,
        /// Brightness level (0-100)
        #[arg(long, default_value_t = 100)]
        brightness: u8,
    },
    /// Print the cached power state
    Status,
}

#[tokio::main]
#[instrument]
async fn main() -> Result<()> {
    // Initialize tracing with pretty colors
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("ks03_led_controller=info")),
        )
        .compact()
        .init();

    // Initialize color-eyre for pretty error reporting
    color_eyre::install()?;

    let cli = Cli::parse();
    debug!("Parsed command line arguments");

    let revision: HardwareRevision = cli.revision.into();
    let filter = if let Some(address) = cli.address.clone() {
        DeviceFilter::Address(address)
    } else if cli.match_service {
        DeviceFilter::Service(revision.profile().service)
    } else {
        DeviceFilter::NameContains(cli.name.clone())
    };
    let identity = DeviceIdentity::new(cli.name.clone(), filter);

    let transport = match find_light(
        &identity,
        revision,
        Duration::from_secs(cli.scan_timeout),
    )
    .await
    {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to find device: {}", e);
            return Err(e.into());
        }
    };

    let light = BleLight::with_idle_timeout(
        transport,
        identity,
        Duration::from_secs(cli.idle_timeout),
    );

    match cli.command.unwrap_or(Commands::Demo { duration: 5 }) {
        Commands::Demo { duration } => {
            run_demo(&light, duration).await?;
        }
        Commands::On => {
            light.set_power(true).await?;
        }
        Commands::Off => {
            light.set_power(false).await?;
        }
        Commands::Brightness { level } => {
            // The strip must be on for brightness changes to be visible
            light.set_power(true).await?;
            light.set_brightness(level).await?;
        }
        Commands::Hue { degrees } => {
            light.set_power(true).await?;
            light.set_hue(degrees).await?;
        }
        Commands::Saturation { percent } => {
            light.set_power(true).await?;
            light.set_saturation(percent).await?;
        }
        Commands::Color {
            hue,
            saturation,
            brightness,
        } => {
            light.set_power(true).await?;
            light.set_hue(hue).await?;
            light.set_saturation(saturation).await?;
            light.set_brightness(brightness).await?;
        }
        Commands::Status => match light.get_power().await {
            Ok(power) => println!("{}", if power { "ON" } else { "OFF" }),
            Err(e) => {
                error!("Cannot report power state: {}", e);
                return Err(e.into());
            }
        },
    }

    Ok(())
}

/// Sleep for specified number of seconds
async fn sleep(seconds: u64) {
    tokio::time::sleep(Duration::from_secs(seconds)).await;
}

/// Run a demonstration of various strip features
#[instrument(skip(light))]
async fn run_demo(light: &BleLight, duration: u64) -> Result<()> {
    info!("Running LED strip demo with {}s intervals", duration);

    info!("Turning LEDs on");
    light.set_power(true).await?;
    sleep(duration).await;

    info!("Setting color to red");
    light.set_saturation(100).await?;
    light.set_hue(0).await?;
    sleep(duration).await;

    info!("Setting color to green");
    light.set_hue(120).await?;
    sleep(duration).await;

    info!("Setting color to blue");
    light.set_hue(240).await?;
    sleep(duration).await;

    info!("Setting brightness to 50%");
    light.set_brightness(50).await?;
    sleep(duration).await;

    info!("Setting brightness to 100%");
    light.set_brightness(100).await?;
    sleep(duration).await;

    info!("Back to static white");
    light.set_saturation(0).await?;
    sleep(1).await;

    info!("Turning LEDs off to end demo");
    light.set_power(false).await?;

    info!("Demo completed!");
    Ok(())
}
