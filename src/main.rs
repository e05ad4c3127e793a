//! mocap-rs - Command-line entry point
//!
//! Inspects and converts C3D motion-capture files:
//! - `info` prints the acquisition summary and its events
//! - `convert` rewrites a file with another byte order or storage format
//! - `dump-metadata` prints the parameter tree as JSON

use anyhow::Context;
use clap::{Parser, Subcommand};
use mocap_rs::{
    config::{default_config_path, Config, LoggingConfig},
    io::{byte_order_as_str, storage_format_as_str, FileIOHandle},
    shared, AcquisitionFileReader, AcquisitionFileWriter, ByteOrder, C3DFileIO, ProcessObject,
    StorageFormat,
};
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and convert C3D motion-capture files")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "MOCAP_RS_CONFIG")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print frequencies, counts, frame range and events
    Info { file: PathBuf },

    /// Read a file and write it back with the configured codec settings
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// VAX_LittleEndian, IEEE_LittleEndian or IEEE_BigEndian
        #[arg(long)]
        byte_order: Option<ByteOrder>,

        /// Integer or Float
        #[arg(long)]
        format: Option<StorageFormat>,
    },

    /// Print the metadata tree as JSON
    DumpMetadata { file: PathBuf },
}

fn init_logging(config: &LoggingConfig, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let (file_layer, guard) = match log_file.or(config.file.as_deref()) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {:?}", path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn open_reader(file: &Path) -> Rc<RefCell<AcquisitionFileReader>> {
    let reader = shared(AcquisitionFileReader::new());
    reader.borrow_mut().set_filename(file);
    reader
}

fn info(file: &Path) -> anyhow::Result<()> {
    let reader = open_reader(file);
    let output = reader
        .borrow_mut()
        .output()
        .with_context(|| format!("failed to read {:?}", file))?;
    let acq = output.acquisition()?;

    println!("File:             {}", file.display());
    if let Some(io) = reader.borrow().acquisition_io() {
        let io = io.borrow();
        println!("Byte order:       {}", byte_order_as_str(&*io));
        println!("Storage format:   {}", storage_format_as_str(&*io));
    }
    println!(
        "Frames:           {} ({} to {})",
        acq.point_frame_number(),
        acq.first_frame(),
        acq.last_frame()
    );
    println!("Duration:         {:.3} s", acq.duration());
    println!("Point frequency:  {} Hz", acq.point_frequency());
    println!("Points:           {}", acq.point_number());
    println!(
        "Analog frequency: {} Hz (ratio {})",
        acq.analog_frequency(),
        acq.analog_ratio()
    );
    println!("Analogs:          {}", acq.analog_number());
    println!("Events:           {}", acq.event_number());
    for event in acq.events().iter() {
        let frame = event
            .frame()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<16} {:<8} {:>8.3} s  frame {}",
            event.label(),
            event.context().as_str(),
            event.time(),
            frame
        );
    }
    Ok(())
}

fn convert(
    config: &Config,
    input: &Path,
    output: &Path,
    byte_order: Option<ByteOrder>,
    format: Option<StorageFormat>,
) -> anyhow::Result<()> {
    let mut codec_config = config.codec.clone();
    if let Some(order) = byte_order {
        codec_config.byte_order = order;
    }
    if let Some(format) = format {
        codec_config.data_format = format;
    }
    let mut codec = C3DFileIO::new();
    codec_config.apply(&mut codec);
    let codec: FileIOHandle = Rc::new(RefCell::new(codec));

    let reader = open_reader(input);
    let mut writer = AcquisitionFileWriter::new();
    writer.set_input(reader.clone(), 0)?;
    writer.set_acquisition_io(Some(codec));
    writer.set_filename(output);
    writer
        .update()
        .with_context(|| format!("failed to convert {:?} into {:?}", input, output))?;

    tracing::info!(
        "Converted {:?} into {:?} ({} / {})",
        input,
        output,
        codec_config.byte_order,
        codec_config.data_format
    );
    Ok(())
}

fn dump_metadata(file: &Path) -> anyhow::Result<()> {
    let reader = open_reader(file);
    let output = reader
        .borrow_mut()
        .output()
        .with_context(|| format!("failed to read {:?}", file))?;
    let json = serde_json::to_string_pretty(output.metadata()?)?;
    println!("{}", json);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let loaded = match &config_path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    };
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };

    let _guard = init_logging(&config.logging, cli.log_file.as_deref())?;
    if let Err(e) = loaded {
        tracing::warn!("Failed to load config, using defaults: {}", e);
    }
    tracing::debug!("Configuration: {:?}", config_path);

    match &cli.command {
        Command::Info { file } => info(file),
        Command::Convert {
            input,
            output,
            byte_order,
            format,
        } => convert(&config, input, output, *byte_order, *format),
        Command::DumpMetadata { file } => dump_metadata(file),
    }
}
