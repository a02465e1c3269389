use clap::{Parser, Subcommand};
use log::info;
use media_tagger_core::{logging, Config, MediaTagger};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "media-tagger")]
#[command(about = "Automatically tag a media library with an image classifier")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one tagging pass over the library
    Run {
        /// Root directories to scan; falls back to the configured roots
        directories: Vec<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Classifier endpoint, overriding the configured one
        #[arg(long)]
        api_url: Option<String>,

        /// Worker-pool width for image uploads
        #[arg(long)]
        threads: Option<usize>,

        /// Directory for rolling log files
        #[arg(long, default_value = "logs")]
        log_dir: String,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "media-tagger.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            directories,
            config,
            api_url,
            threads,
            log_dir,
        } => {
            // File logging keeps the console clear for the progress bars;
            // fall back to stderr logging when the log directory is unusable.
            if let Err(e) = logging::init_logger(&log_dir) {
                eprintln!("Warning: file logging unavailable: {}", e);
                env_logger::init();
            }

            let mut config = if let Some(config_path) = config {
                Config::from_file(&config_path)?
            } else {
                Config::default()
            };

            // Override config with command line arguments
            if let Some(api_url) = api_url {
                config.api_url = api_url;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }

            let roots = if directories.is_empty() {
                config.search_roots.clone()
            } else {
                directories
            };

            let tagger = MediaTagger::new(config)?;

            info!("Starting tagging pass...");
            let summary = tagger.run(&roots)?;
            info!("Tagging pass complete");

            println!(
                "Images: {} tagged, {} failed. Videos: {} tagged, {} failed.",
                summary.images_ok,
                summary.images_failed,
                summary.videos_ok,
                summary.videos_failed
            );
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
