use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tiktok_downloader::downloader::models::default_output_dir;
use tiktok_downloader::downloader::validator;
use tiktok_downloader::{logging, DownloadRequest, Downloader, EngineConfig, EngineKind, MetadataResolver, ProgressReporter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Download TikTok videos with a choice of engines.")]
struct Cli {
    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[arg(long, global = true, value_name = "URL", help = "HTTP or SOCKS5 proxy (overrides TIKTOK_DL_PROXY)")]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download one video
    Download {
        url: String,
        #[arg(short, long, value_name = "DIR", help = "Output directory (default: Downloads)")]
        output: Option<PathBuf>,
        #[arg(short, long, default_value_t = EngineKind::default().to_string(), help = "Engine: yt-dlp or tiktok-api")]
        engine: String,
        #[arg(short, long, default_value = "best", help = "Quality hint (always resolved to best)")]
        quality: String,
        #[arg(short = 'n', long = "name", help = "Custom file name, without extension")]
        name: Option<String>,
    },
    /// Resolve and print video metadata as JSON
    Info {
        #[arg(value_name = "URL_OR_ID")]
        url_or_id: String,
    },
    /// Check a URL against known TikTok shapes, optionally with an engine
    Validate {
        url: String,
        #[arg(short, long)]
        engine: Option<String>,
    },
    /// List available engines
    Engines,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let mut config = EngineConfig::from_env();
    if cli.proxy.is_some() {
        config = config.with_proxy(cli.proxy);
    }

    match cli.command {
        Command::Download {
            url,
            output,
            engine,
            quality,
            name,
        } => {
            let kind = match engine.parse::<EngineKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::from(2);
                }
            };
            let request = DownloadRequest::new(validator::normalize(&url), output.unwrap_or_else(default_output_dir))
                .with_quality(quality)
                .with_custom_filename(name);

            let reporter = ProgressReporter::silent()
                .on_progress(|p| {
                    eprint!("\r{:5.1}%", p.percent);
                    let _ = std::io::stderr().flush();
                })
                .on_status(|s| {
                    if !s.starts_with("Downloading...") {
                        eprintln!("\n{}", s);
                    }
                });

            let downloader = Downloader::new(&config);
            let outcome = downloader.download(kind, &request, &reporter).await;
            println!("{}", outcome.message);
            if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Info { url_or_id } => {
            let input = if url_or_id.chars().all(|c| c.is_ascii_digit()) {
                url_or_id
            } else {
                validator::normalize(&url_or_id)
            };
            match MetadataResolver::new(&config).resolve(&input).await {
                Some(metadata) => match serde_json::to_string_pretty(&metadata) {
                    Ok(json) => {
                        println!("{}", json);
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("Could not serialize metadata: {}", e);
                        ExitCode::FAILURE
                    }
                },
                None => {
                    eprintln!("Could not retrieve video information");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Validate { url, engine } => {
            let url = validator::normalize(&url);
            let check = validator::validate(&url);
            println!("{}", check.message);
            if let Some(id) = validator::extract_video_id(&url) {
                println!("Video ID: {}", id);
            }
            if !check.valid {
                return ExitCode::FAILURE;
            }

            if let Some(name) = engine {
                let downloader = Downloader::new(&config);
                let Some(engine) = downloader.engine_by_name(&name) else {
                    eprintln!("Unknown engine '{}'", name);
                    return ExitCode::from(2);
                };
                let engine_check = engine.validate_url(&url).await;
                println!("[{}] {}", engine.name(), engine_check.message);
                if !engine_check.valid {
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Command::Engines => {
            let downloader = Downloader::new(&config);
            for descriptor in downloader.descriptors() {
                let marker = if descriptor.recommended { " (recommended)" } else { "" };
                println!("{}{}: {}", descriptor.name, marker, descriptor.description);
                for advantage in descriptor.advantages {
                    println!("  - {}", advantage);
                }
            }
            ExitCode::SUCCESS
        }
    }
}
