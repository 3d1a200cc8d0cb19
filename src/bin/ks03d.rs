//! Line-oriented control daemon.
//!
//! A host automation platform spawns this process and drives one strip over
//! stdin/stdout: one `command[:args]` per line, one `OK`/`ERR ...` per line
//! back. The session handles lazy connect and idle disconnect underneath,
//! so the radio link only exists while commands are flowing.

use ks03_led_controller::*;
use std::{env, io};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ks03_led_controller=warn")),
        )
        .compact()
        .init();

    // Get a target id/mac address from command line arguments.
    // If not provided, exit.
    let usage = "Usage: ks03d <id/mac address> [afd|ee]";
    let args: Vec<_> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{usage}");
        std::process::exit(1);
    }
    if args[1] == "-h" || args[1] == "--help" {
        eprintln!("{usage}");
        std::process::exit(0);
    }

    let revision = match args.get(2).map(String::as_str) {
        None | Some("afd") => HardwareRevision::Afd,
        Some("ee") => HardwareRevision::Ee,
        Some(other) => {
            eprintln!("ERR Unknown hardware revision: {other}");
            std::process::exit(1);
        }
    };

    // Find the strip by address and wrap it in a session.
    let identity = DeviceIdentity::new(args[1].clone(), DeviceFilter::Address(args[1].clone()));
    let transport = find_light(&identity, revision, Duration::from_secs(10)).await?;
    let light = BleLight::new(transport, identity);

    // Inform about successful initialization
    println!("OK");

    // Mainloop: wait for user input, line by line
    loop {
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break, // stdin closed, host is gone
            Ok(_) => {}
            Err(e) => {
                eprintln!("ERR Failed to read command: {e}");
                break;
            }
        }

        let mut cmd = input.trim().split(':');
        let result = match cmd.next() {
            Some("power_on") => light.set_power(true).await.map(|()| "OK".to_string()),
            Some("power_off") => light.set_power(false).await.map(|()| "OK".to_string()),
            Some("set_brightness") => match cmd.next().map(str::trim).map(str::parse::<u8>) {
                Some(Ok(level)) if level <= 100u8 => {
                    light.set_brightness(level).await.map(|()| "OK".to_string())
                }
                Some(Ok(_)) => {
                    eprintln!("ERR Brightness must be between 0 and 100");
                    continue;
                }
                _ => {
                    eprintln!("ERR Invalid brightness. Use set_brightness:<0-100>");
                    continue;
                }
            },
            Some("set_hue") => match cmd.next().map(str::trim).map(str::parse::<u16>) {
                Some(Ok(degrees)) => light.set_hue(degrees).await.map(|()| "OK".to_string()),
                _ => {
                    eprintln!("ERR Invalid hue. Use set_hue:<degrees>");
                    continue;
                }
            },
            Some("set_saturation") => match cmd.next().map(str::trim).map(str::parse::<u8>) {
                Some(Ok(percent)) if percent <= 100u8 => {
                    light.set_saturation(percent).await.map(|()| "OK".to_string())
                }
                Some(Ok(_)) => {
                    eprintln!("ERR Saturation must be between 0 and 100");
                    continue;
                }
                _ => {
                    eprintln!("ERR Invalid saturation. Use set_saturation:<0-100>");
                    continue;
                }
            },
            Some("get_power") => light
                .get_power()
                .await
                .map(|on| format!("OK {}", if on { "ON" } else { "OFF" })),
            Some("identify") => {
                light.identify();
                Ok("OK".to_string())
            }
            Some("") | None => {
                eprintln!("ERR No command given");
                continue;
            }
            Some(other) => {
                eprintln!("ERR Unknown command: {other}");
                continue;
            }
        };

        match result {
            Ok(reply) => println!("{reply}"),
            Err(e) => eprintln!("ERR {e}"),
        }
    }

    Ok(())
}
