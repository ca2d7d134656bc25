use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use photo_classifier::{
    config::{Config, ModelConfig, ResizeFilter},
    image::ResultFormatter,
    models::ModelManager,
    prediction::{PredictionOptions, PredictionPipeline},
    web::serve,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-classifier")]
#[command(about = "Classify photos with a bundled ONNX image classifier")]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP prediction service
    Serve {
        /// Server bind address
        #[arg(long, default_value = "0.0.0.0:5005")]
        bind: String,

        /// Number of worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Enable development mode
        #[arg(long)]
        dev: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Classify a single image file and print the result
    Predict {
        /// Image file to classify
        #[arg(long)]
        image: PathBuf,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,

        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Model file path
    #[arg(long, default_value = "models/classifier.onnx")]
    model: PathBuf,

    /// Label file path, one label per line
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Model input width
    #[arg(long, default_value_t = 224)]
    input_width: u32,

    /// Model input height
    #[arg(long, default_value_t = 224)]
    input_height: u32,

    /// Number of output classes
    #[arg(long)]
    num_classes: Option<usize>,

    /// Number of predictions to return
    #[arg(long, default_value_t = 1)]
    top_k: usize,

    /// Resize filter
    #[arg(long, value_enum, default_value_t = ResizeFilter::Bilinear)]
    filter: ResizeFilter,

    /// ONNX Runtime graph optimization level (0-3)
    #[arg(long, default_value_t = 3)]
    optimization_level: i32,
}

impl From<ModelArgs> for ModelConfig {
    fn from(args: ModelArgs) -> Self {
        Self {
            model_path: args.model,
            labels_path: args.labels,
            input_width: args.input_width,
            input_height: args.input_height,
            num_classes: args.num_classes,
            top_k: args.top_k,
            resize_filter: args.filter,
        }
    }
}

fn build_config(
    bind: String,
    model: ModelArgs,
    workers: Option<usize>,
    dev: bool,
) -> Result<Config> {
    let optimization_level = model.optimization_level;
    let mut config = Config::new(bind, model.into(), workers, dev)?;
    config.onnx_config.optimization_level = optimization_level;
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            workers,
            dev,
            model,
        } => {
            let config = build_config(bind, model, workers, dev)?;
            tracing::info!("Starting photo classifier service...");
            tracing::info!("Bind address: {}", config.bind_addr);
            tracing::info!("Model: {}", config.model_config.model_path.display());

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.workers)
                .enable_all()
                .build()?;
            runtime.block_on(serve(config))?;
        }
        Command::Predict {
            image,
            format,
            model,
        } => {
            let config = build_config("127.0.0.1:0".to_string(), model, Some(1), false)?;
            let options = PredictionOptions {
                top_k: Some(config.model_config.top_k),
                output_format: Some(format),
            };
            ModelManager::init(config)?;

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(PredictionPipeline::process_path(image, options, None));
            photo_classifier::models::shutdown()?;

            println!("{}", ResultFormatter::render(&result?)?);
        }
    }

    Ok(())
}
