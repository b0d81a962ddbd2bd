//! icystrip CLI: strip ICY metadata from a stream capture or a live URL

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use icystrip::config::cli::COPY_BUFFER_SIZE;
use icystrip::config::network::{CONNECT_TIMEOUT_SECS, ICY_METADATA_HEADER, USER_AGENT};
use icystrip::stream::{
    IcyDemuxer, IcyHeaders, IcyMetadata, MetadataListener, NowPlaying, ReadOutcome, StopReason,
};
use icystrip::DemuxError;

#[derive(Parser)]
#[command(
    name = "icystrip",
    about = "Strip ICY metadata from a stream capture or live URL",
    version
)]
struct Cli {
    /// Stream URL, capture file, or `-` for stdin
    input: String,

    /// Audio bytes between metadata blocks. Required for captures; overrides
    /// the server's icy-metaint for URLs
    #[arg(long)]
    metaint: Option<usize>,

    /// Write audio to this file (`-` for stdout) instead of discarding it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after this many audio bytes
    #[arg(long)]
    max_bytes: Option<u64>,

    /// Do not ask the server to interleave metadata
    #[arg(long)]
    no_metadata: bool,
}

/// Prints now-playing changes to stderr
#[derive(Default)]
struct PrintListener {
    last_title: Option<String>,
}

impl MetadataListener for PrintListener {
    fn on_metadata(&mut self, metadata: &IcyMetadata) {
        for (key, value) in metadata.iter() {
            debug!(key = key.as_str(), value = value.as_str(), "Metadata tag");
        }

        let Some(title) = metadata.stream_title() else {
            return;
        };
        if self.last_title.as_deref() == Some(title) {
            return;
        }
        self.last_title = Some(title.to_string());

        match NowPlaying::from_title(title) {
            NowPlaying {
                artist: Some(artist),
                title: Some(title),
            } => eprintln!("Now playing: {artist} - {title}"),
            NowPlaying {
                title: Some(title), ..
            } => eprintln!("Now playing: {title}"),
            _ => {}
        }
    }

    fn on_stream_started(&mut self) {
        info!("Stream started");
    }

    fn on_stream_stopped(&mut self, reason: StopReason) {
        info!(?reason, "Stream stopped");
    }

    fn on_error(&mut self, error: &DemuxError) {
        warn!(%error, "Stream error");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) if path.as_os_str() == "-" => Box::new(io::stdout().lock()),
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::sink()),
    };

    let result = if is_url(&cli.input) {
        run_url(&cli, &mut sink)
    } else {
        run_local(&cli, &mut sink)
    };

    match result {
        Ok(bytes) => {
            sink.flush()?;
            info!(audio_bytes = bytes, "Done");
            Ok(())
        }
        Err(e) => {
            match e.downcast_ref::<DemuxError>() {
                Some(d) if d.is_truncation() => {
                    eprintln!("Error: connection dropped inside a metadata block: {e}")
                }
                _ => eprintln!("Error: {e}"),
            }
            let _ = sink.flush();
            process::exit(1);
        }
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Demux a capture file or stdin
fn run_local(cli: &Cli, sink: &mut dyn Write) -> Result<u64, Box<dyn Error>> {
    let metaint = cli.metaint.unwrap_or(0);
    if metaint == 0 {
        warn!("No --metaint given, copying input unchanged");
    }

    let bytes = if cli.input == "-" {
        demux(io::stdin().lock(), metaint, sink, cli.max_bytes)?
    } else {
        demux(File::open(&cli.input)?, metaint, sink, cli.max_bytes)?
    };
    Ok(bytes)
}

/// Connect to a live stream and demux its response body
fn run_url(cli: &Cli, sink: &mut dyn Write) -> Result<u64, Box<dyn Error>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        // live streams have no end
        .timeout(None::<Duration>)
        .build()?;

    let mut request = client.get(&cli.input);
    if !cli.no_metadata {
        let (name, value) = ICY_METADATA_HEADER;
        request = request.header(name, value);
    }

    eprintln!("Connecting to {}...", cli.input);
    let mut response = request.send()?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()).into());
    }

    let headers =
        IcyHeaders::from_lookup(|name| response.headers().get(name).and_then(|v| v.to_str().ok()));
    info!(
        station = headers.station_name.as_deref(),
        genre = headers.genre.as_deref(),
        content_type = headers.content_type.as_deref(),
        bitrate = headers.bitrate,
        metaint = headers.metaint,
        "Connected"
    );

    let metaint = match (cli.no_metadata, cli.metaint) {
        (true, _) => 0,
        (false, Some(forced)) => forced,
        (false, None) => headers.metaint,
    };

    Ok(demux(&mut response, metaint, sink, cli.max_bytes)?)
}

fn demux<R: Read>(
    source: R,
    metaint: usize,
    sink: &mut dyn Write,
    max_bytes: Option<u64>,
) -> Result<u64, DemuxError> {
    let mut demuxer = IcyDemuxer::open(source, metaint, PrintListener::default())?;
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let want = match max_bytes {
            Some(max) if total >= max => break,
            Some(max) => buf
                .len()
                .min(usize::try_from(max - total).unwrap_or(usize::MAX)),
            None => buf.len(),
        };

        match demuxer.read_audio(&mut buf[..want])? {
            ReadOutcome::Audio(n) => {
                sink.write_all(&buf[..n])?;
                total += n as u64;
            }
            ReadOutcome::EndOfStream => break,
        }
    }

    let stats = demuxer.stats();
    debug!(
        audio_bytes = stats.audio_bytes,
        metadata_bytes = stats.metadata_bytes,
        blocks = stats.blocks,
        empty_blocks = stats.empty_blocks,
        "Demux finished"
    );
    demuxer.close();
    Ok(total)
}
