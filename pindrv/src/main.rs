//! # pindrv Binary
//!
//! GPIO pin-bank output driver daemon. Probes the configured device
//! (acquires its output lines, registers the device entry), then serves
//! write commands until shutdown.
//!
//! # Usage
//!
//! ```bash
//! # Run against real hardware
//! pindrv --config config/device.toml
//!
//! # Run with the simulation backend (no hardware required)
//! pindrv --config config/device.toml --simulate
//!
//! # Verbose logging
//! pindrv --config config/device.toml -v
//!
//! # Drive the device from a shell
//! echo 1 > /run/pindrv/rpi_led
//! ```

use clap::Parser;
use pindrv::backend::cdev::CdevBank;
use pindrv::backend::simulation::SimulationBank;
use pindrv::controller::DeviceController;
use pindrv::device::FifoRegistrar;
use pindrv_common::config::DeviceConfig;
use pindrv_common::gpio::GpioBank;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// pindrv - GPIO pin-bank output driver
#[derive(Parser, Debug)]
#[command(name = "pindrv")]
#[command(version)]
#[command(about = "Exposes a set of GPIO output lines as a writable device entry")]
#[command(long_about = None)]
struct Args {
    /// Path to the device configuration file
    #[arg(short, long, default_value = "/etc/pindrv/device.toml")]
    config: PathBuf,

    /// Use the simulation backend instead of real hardware
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Driver startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(&args);

    info!("pindrv v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = DeviceConfig::load(&args.config)?;

    let mut bank: Box<dyn GpioBank> = if args.simulate {
        info!("Simulation backend selected");
        Box::new(SimulationBank::new())
    } else {
        Box::new(CdevBank::open(&config.chip)?)
    };

    let registrar = Box::new(FifoRegistrar::new(config.device_dir.clone()));
    let mut controller = DeviceController::new(&config, registrar);

    // Probe: acquire pins, then register the entry. Any failure has
    // already been rolled back inside probe.
    controller.probe(bank.as_mut())?;

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running_handler.store(false, Ordering::SeqCst);
    })?;

    let entry_path = controller
        .entry_path()
        .expect("registered controller has an entry path")
        .to_path_buf();
    info!("Serving write commands on {:?}", entry_path);

    serve(&controller, &entry_path, &running);

    controller.remove();
    info!("pindrv shutdown complete");
    Ok(())
}

/// Read write commands from the device entry and dispatch them to the
/// controller until shutdown is requested.
///
/// Opening a FIFO for reading blocks until a writer appears; end-of-file
/// means all writers closed, so the entry is reopened for the next one.
fn serve(controller: &DeviceController, entry_path: &Path, running: &AtomicBool) {
    let mut buf = [0u8; 64];

    while running.load(Ordering::SeqCst) {
        let mut entry = match File::open(entry_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Failed to open device entry {:?}: {}", entry_path, e);
                break;
            }
        };
        controller.open();

        loop {
            match entry.read(&mut buf) {
                Ok(0) => {
                    controller.close();
                    break;
                }
                Ok(n) => match controller.handle_write(&buf[..n], 0) {
                    Ok(consumed) => debug!("Write accepted ({} bytes)", consumed),
                    Err(e) => warn!("Write rejected: {}", e),
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Device entry read failed: {}", e);
                    controller.close();
                    break;
                }
            }

            if !running.load(Ordering::SeqCst) {
                break;
            }
        }
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
