use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vintagecam::admission::MemoryGate;
use vintagecam::config::{self, AppConfig};
use vintagecam::imaging::{
    AspectRatio, CropRegion, FilmStock, GrainSize, ProcessOptions, RenderSettings, RustBackend,
};
use vintagecam::output;
use vintagecam::store::{DiskStore, FallbackStore, MetadataStore, RedisStore, StoreError};
use vintagecam::studio::Studio;

#[derive(Parser)]
#[command(name = "vintagecam")]
#[command(about = "Give photos a vintage film look")]
#[command(long_about = "\
Give photos a vintage film look

Upload a JPEG or PNG, then process it with a film stock, a crop and optional
grain and vignette. Every upload and result gets an id; records expire after
24 hours but files stay on disk and are found again by id.

Film stocks:
  classic_chrome   muted color, hard shadows, slightly cool
  pro_neg_hi       soft portrait negative, gentle warmth
  velvia           saturated slide film, deep blues and greens
  classic_neg      faded negative, warm shift, lifted blacks
  portra_400       warm skin tones, wide latitude
  kodachrome       punchy reds, crisp detail

Aspect ratios: 1:1, 4:3, 16:9, 3:2, 4:5

Run 'vintagecam gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults when absent)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Develop options shared by `process` and `batch`. Unset flags fall back to
/// the `[defaults]` section of the config.
#[derive(clap::Args, Clone)]
struct DevelopArgs {
    /// Aspect ratio to crop to (1:1, 4:3, 16:9, 3:2, 4:5)
    #[arg(long)]
    ratio: Option<String>,

    /// Film stock (classic_chrome, pro_neg_hi, velvia, classic_neg, portra_400, kodachrome)
    #[arg(long)]
    stock: Option<String>,

    /// Custom crop as x,y,width,height in source pixels (overrides --ratio)
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRegion>,

    /// Add film grain
    #[arg(long)]
    grain: bool,

    /// Grain strength in 0.0–1.0
    #[arg(long)]
    grain_intensity: Option<f32>,

    /// Grain size (fine, medium, coarse)
    #[arg(long)]
    grain_size: Option<String>,

    /// Add a vignette
    #[arg(long)]
    vignette: bool,

    /// Vignette strength in 0.0–1.0
    #[arg(long)]
    vignette_intensity: Option<f32>,

    /// Fixed grain seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

impl DevelopArgs {
    fn options(&self, config: &AppConfig) -> ProcessOptions {
        let mut options = config.defaults.base_options();
        if let Some(ratio) = &self.ratio {
            options.aspect_ratio = AspectRatio::parse(ratio);
        }
        if let Some(stock) = &self.stock {
            options.film_stock = FilmStock::parse(stock);
        }
        options.crop_data = self.crop;
        options.add_grain = self.grain;
        if let Some(intensity) = self.grain_intensity {
            options.grain_intensity = intensity;
        }
        if let Some(size) = &self.grain_size {
            options.grain_size = GrainSize::parse(size);
        }
        options.add_vignette = self.vignette;
        if let Some(intensity) = self.vignette_intensity {
            options.vignette_intensity = intensity;
        }
        options
    }
}

fn parse_crop(s: &str) -> Result<CropRegion, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid crop '{s}': {e}"))?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(CropRegion {
            x,
            y,
            width,
            height,
        }),
        _ => Err(format!("invalid crop '{s}': expected x,y,width,height")),
    }
}

#[derive(Subcommand)]
enum Command {
    /// Store a JPEG or PNG and print its id
    Upload { file: PathBuf },
    /// Develop an uploaded image
    Process {
        /// Id printed by `upload`
        id: String,
        #[command(flatten)]
        develop: DevelopArgs,
    },
    /// Show where a processed result lives and its download name
    Show { id: String },
    /// Show where an uploaded original lives
    Preview { id: String },
    /// Develop every JPEG/PNG in a directory
    Batch {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        develop: DevelopArgs,
    },
    /// Check the storage backend and memory
    Status,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "vintagecam=debug" } else { "vintagecam=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_store(config: &AppConfig) -> Arc<FallbackStore> {
    let store = Arc::new(FallbackStore::new(DiskStore::new(
        config.storage.metadata_dir.clone(),
    )));
    if config.network.enabled {
        let url = config.network.redis_url.clone();
        let connect = async move {
            let redis = RedisStore::connect(&url).await?;
            Ok::<Arc<dyn MetadataStore>, StoreError>(Arc::new(redis))
        };
        store.connect_network(connect, config.connect_timeout()).await;
    }
    store
}

/// Load config, connect storage and assemble the studio.
async fn open_studio(
    config_path: &Path,
    seed: Option<u64>,
) -> Result<Studio<RustBackend>, Box<dyn std::error::Error>> {
    let mut config = config::load_config(config_path)?;
    config.apply_env(|key| std::env::var(key).ok());

    let store = open_store(&config).await;
    let gate = Arc::new(MemoryGate::new(config.admission.memory_threshold));
    let settings = RenderSettings {
        seed,
        ..config.render_settings()
    };
    Ok(Studio::new(config, store, RustBackend::new(), gate).with_settings(settings))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Upload { file } => {
            let studio = open_studio(&cli.config, None).await?;
            let record = studio.upload(&file).await?;
            output::print_upload(&record);
        }
        Command::Process { id, develop } => {
            let studio = open_studio(&cli.config, develop.seed).await?;
            let options = develop.options(studio.config());
            let record = studio.process(&id, &options).await?;
            let download = studio.download(&record.id).await.ok();
            output::print_processed(&record, download.as_ref());
        }
        Command::Show { id } => {
            let studio = open_studio(&cli.config, None).await?;
            let record = studio.find_processed(&id).await?;
            let download = studio.download(&id).await?;
            output::print_processed(&record, Some(&download));
        }
        Command::Preview { id } => {
            let studio = open_studio(&cli.config, None).await?;
            let file = studio.preview(&id).await?;
            output::print_served(&file);
        }
        Command::Batch {
            input,
            output: output_dir,
            develop,
        } => {
            let studio = open_studio(&cli.config, develop.seed).await?;
            let options = develop.options(studio.config());
            let summary = studio.batch(&input, &output_dir, &options)?;
            output::print_batch(&summary);
        }
        Command::Status => {
            let studio = open_studio(&cli.config, None).await?;
            let report = studio.status().await;
            output::print_status(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
