//! Camera check: reports which configured devices open and capture a frame.
//!
//! Devices may be passed as arguments; otherwise the configured list is used.

use anyhow::Context;
use api::{init_logging, AppConfig};
use camera_capture::{probe, FrameSource};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let devices = if args.is_empty() {
        config.camera.devices.clone()
    } else {
        args
    };

    println!("Testing camera access...");
    let (working, reports) = probe(&config.camera.capture_config(), &devices);

    for report in &reports {
        match (report.opened, report.frame_size) {
            (true, Some((width, height))) => {
                println!("{}: opened, captures {}x{} frames", report.device, width, height)
            }
            (true, None) => println!(
                "{}: opened but cannot capture frames ({})",
                report.device,
                report.error.as_deref().unwrap_or("no frame")
            ),
            (false, _) => println!(
                "{}: failed to open ({})",
                report.device,
                report.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    match working {
        Some(source) => {
            println!("Use {} in [camera] devices", source.device());
            Ok(())
        }
        None => {
            println!("No working camera found.");
            println!("Make sure no other application holds the device and that the user can read /dev/video*.");
            anyhow::bail!("no usable camera among {}", devices.join(", "))
        }
    }
}
