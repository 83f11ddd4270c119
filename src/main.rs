// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{crate_version, Parser, Subcommand};
use drumtrig::config::Config;
use drumtrig::engine::Engine;
use drumtrig::playsync::CancelHandle;
use drumtrig::samples::Kit;
use drumtrig::{audio, serial};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays drum samples for codes arriving on a serial port."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start listening on the configured serial port and play hits until interrupted.
    Start {
        /// The path to the trigger config.
        config_path: String,
    },
    /// Loads and decodes every sample in the configured kit.
    Verify {
        /// The path to the trigger config.
        config_path: String,
    },
    /// Lists the available serial ports.
    Ports {},
    /// Lists the available audio output devices.
    Devices {},
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Start { config_path } => {
            let config = Config::load(&PathBuf::from(config_path))?;
            let port = config.serial().port().to_string();

            // Listen for the interrupt before startup so it can't kill the process
            // halfway through loading.
            let shutdown = CancelHandle::new();
            let interrupt = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let result = tokio::signal::ctrl_c().await;
                    println!("\nExiting...");
                    shutdown.cancel();
                    result
                })
            };
            tokio::task::yield_now().await;

            println!("Loading samples...");
            let mut engine = {
                let shutdown = shutdown.clone();
                tokio::task::spawn_blocking(move || {
                    Engine::start(&config, io::stdout(), &shutdown)
                })
                .await??
            };
            if !shutdown.is_cancelled() {
                println!("Listening on {}...", port);
            }

            tokio::task::spawn_blocking(move || {
                engine.run(&shutdown);
                engine.close();
            })
            .await?;
            interrupt.await??;
            println!("Serial port closed. Goodbye.");
        }
        Commands::Verify { config_path } => {
            let config = Config::load(&PathBuf::from(config_path))?;
            let kit = Kit::load(
                config.kit(),
                &config.samples_dir(),
                config.audio().sample_rate(),
            )?;

            let base_code = config.dispatch().base_code();
            println!("Kit (slots: {}):", kit.len());
            for slot in kit.iter() {
                let code = base_code as usize + slot.index();
                println!(
                    "- {} => {} ({} ch, {:.2}s, volume {})",
                    printable(code as u8),
                    slot.name(),
                    slot.sample().channel_count(),
                    slot.sample().duration().as_secs_f64(),
                    slot.volume()
                );
            }
        }
        Commands::Ports {} => {
            let ports = serial::list_ports()?;

            if ports.is_empty() {
                println!("No serial ports found.");
                return Ok(());
            }

            println!("Ports:");
            for port in ports {
                println!("- {}", port);
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}

fn printable(code: u8) -> String {
    if code.is_ascii_graphic() {
        format!("'{}'", code as char)
    } else {
        format!("0x{:02x}", code)
    }
}
