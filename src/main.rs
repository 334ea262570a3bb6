//! Headless Beatlight runner: loopback capture into a logging light device

use beatlight::{
    AppConfig, ColorMode, DefaultOutputEndpoint, LogDevice, LoopbackCapture, Visualizer,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "beatlight", about = "Drive an indicator light from live system audio")]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed color, or "automatic" to follow the music
    #[arg(long)]
    color: Option<ColorMode>,

    /// Run nightlight mode instead of the visualizer
    #[arg(long)]
    nightlight: bool,

    /// Number of logged lights
    #[arg(long, default_value_t = 1)]
    devices: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let mut visualizer = Visualizer::new(
        config,
        Box::new(LoopbackCapture::new()),
        Box::new(DefaultOutputEndpoint),
        Box::new(LogDevice::new(cli.devices)),
    );

    if let Some(mode) = cli.color {
        visualizer.set_manual_color(mode);
    }

    if cli.nightlight {
        visualizer.start_nightlight()?;
    } else {
        visualizer.start()?;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        std::thread::Builder::new()
            .name("stdin-watch".to_string())
            .spawn(move || {
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    // No terminal attached: run until killed
                    Ok(0) | Err(_) => loop {
                        std::thread::park();
                    },
                    Ok(_) => running.store(false, Ordering::Release),
                }
            })?;
    }

    log::info!("Press Enter to quit");
    while running.load(Ordering::Acquire) {
        if !cli.nightlight && !visualizer.is_running() {
            log::error!("Analysis thread exited unexpectedly, restarting");
            visualizer.reset()?;
        }
        std::thread::sleep(Duration::from_millis(250));
    }

    visualizer.stop_nightlight();
    visualizer.stop();
    Ok(())
}
