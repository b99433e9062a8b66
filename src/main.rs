use anyhow::{Context, Result};
use clap::Parser;
use galaxy_gst::cli::{normalize_args, Args};
use galaxy_gst::{Config, DolphinProcess, Recorder, RecorderEvent};
use tokio::sync::mpsc;
use tracing::{debug, error, info, Level};

const BANNER: &str = "\
Welcome to galaxygst! To find out how to set up the GST recorder in a galaxy, please refer to the
README file. To cancel the tool's execution, press CTRL+C any time. To stop recording, press 2 on
the first player's Wiimote!
------------------------------------------------------------------------------";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse_from(normalize_args(std::env::args()));

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = Config::load(args.config.as_deref())?;
    let recorder_config = cfg.recorder_config(args.output_folder_path.clone(), args.address);

    info!("galaxygst v{}", env!("CARGO_PKG_VERSION"));
    info!("Output folder: {}", args.output_folder_path.display());
    info!("GstRecorderInfo* address: 0x{:08X}", args.address);
    println!("{}", BANNER);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    // Console observer: one status line per event
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                RecorderEvent::StateChanged { .. } => debug!("{}", event),
                event => println!("{}", event),
            }
        }
    });

    let mut recorder = Recorder::new(DolphinProcess::new(), recorder_config, event_tx);
    let result = recorder
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    // Closing the channel lets the printer drain and finish
    drop(recorder);
    printer.await.context("Console printer panicked")?;

    match result {
        Ok(()) => {
            println!("Execution canceled.");
            Ok(())
        }
        Err(e) => Err(e).context("An error occurred"),
    }
}
