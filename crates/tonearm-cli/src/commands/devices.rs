//! Audio output device listing.

use clap::{Args, Subcommand};
use tonearm_io::{AudioBackend, CpalBackend};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all output devices
    List,

    /// Show default output device information
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let backend = CpalBackend::new();

    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = backend.list_devices()?;

            if devices.is_empty() {
                println!("No audio output devices found.");
                return Ok(());
            }

            println!("Output Devices");
            println!("==============\n");
            for (idx, device) in devices.iter().enumerate() {
                let default = if device.is_default { " (default)" } else { "" };
                println!(
                    "  [{}] {} ({} Hz){}",
                    idx, device.name, device.default_sample_rate, default
                );
            }
            println!();
            println!("Total: {} output(s)", devices.len());
            println!();
            println!("Tip: Use a partial device name with --output:");
            println!("  tonearm play --output \"USB\" track.flac");
        }
        DevicesCommand::Info => match backend.default_output_device()? {
            Some(device) => {
                println!("Default Output Device");
                println!("=====================\n");
                println!("  Name:        {}", device.name);
                println!("  Sample Rate: {} Hz", device.default_sample_rate);
                println!("  Backend:     {}", backend.name());
            }
            None => println!("No default output device."),
        },
    }

    Ok(())
}
