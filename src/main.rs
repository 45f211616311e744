//! Fruit classifier CLI
//!
//! Sequences the pipeline: dataset loading, network construction, training
//! with per-epoch validation, evaluation, per-file prediction reports, and
//! export to the edge inference format.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use fruit_classifier::backend::{backend_name, default_device, DefaultBackend, TrainBackend};
use fruit_classifier::training::{evaluate_model, TrainConfig, Trainer};
use fruit_classifier::utils::logging::{init_logging, LogConfig};
use fruit_classifier::{
    export_model, ActivationKind, FruitClassifier, FruitDataset, FruitImageDataset, ModelConfig,
    Predictor, CLASS_NAMES,
};

/// Fruit image classification with Burn
///
/// Trains a small CNN on directory-structured fruit photos, evaluates it,
/// and exports it for mobile inference.
#[derive(Parser, Debug)]
#[command(name = "fruit_classifier")]
#[command(version, about = "Fruit image classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier
    Train {
        /// Dataset root containing train/, validation/ and test/ subdirectories
        #[arg(short, long, default_value = "data/fruits")]
        data_dir: String,

        /// Number of training epochs
        #[arg(short, long, default_value = "10")]
        epochs: usize,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Image edge length in pixels (images are resized to a square)
        #[arg(long, default_value = "32")]
        image_size: usize,

        /// Adam learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Activation function (relu, gelu, silu)
        #[arg(long, default_value = "relu")]
        activation: String,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output directory for model checkpoints
        #[arg(short, long, default_value = "output/models")]
        output_dir: String,

        /// Also export the trained model to this path in the edge format
        #[arg(long)]
        export: Option<String>,
    },

    /// Evaluate a trained model on the test set
    Evaluate {
        /// Dataset root
        #[arg(short, long, default_value = "data/fruits")]
        data_dir: String,

        /// Path to a trained model checkpoint
        #[arg(short, long)]
        model: String,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Image edge length in pixels
        #[arg(long, default_value = "32")]
        image_size: usize,
    },

    /// Classify test images and print predictions
    Predict {
        /// Dataset root
        #[arg(short, long, default_value = "data/fruits")]
        data_dir: String,

        /// Path to a trained model checkpoint
        #[arg(short, long)]
        model: String,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Image edge length in pixels
        #[arg(long, default_value = "32")]
        image_size: usize,

        /// Print per-file predictions for one class (apple, banana, orange
        /// or all)
        #[arg(short, long)]
        group: Option<String>,

        /// Print the raw output scores for the first batch
        #[arg(long, default_value = "false")]
        logits: bool,

        /// Render the classified batch to this PNG path
        #[arg(long)]
        render: Option<String>,
    },

    /// Export a trained checkpoint to the edge inference format
    Export {
        /// Path to a trained model checkpoint
        #[arg(short, long)]
        model: String,

        /// Output path for the exported record
        #[arg(short, long, default_value = "output/fruit_model")]
        output: String,

        /// Image edge length the checkpoint was trained with
        #[arg(long, default_value = "32")]
        image_size: usize,
    },

    /// Show dataset statistics
    Stats {
        /// Dataset root
        #[arg(short, long, default_value = "data/fruits")]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            data_dir,
            epochs,
            batch_size,
            image_size,
            learning_rate,
            activation,
            seed,
            output_dir,
            export,
        } => cmd_train(
            &data_dir,
            epochs,
            batch_size,
            image_size,
            learning_rate,
            &activation,
            seed,
            &output_dir,
            export.as_deref(),
        ),

        Commands::Evaluate {
            data_dir,
            model,
            batch_size,
            image_size,
        } => cmd_evaluate(&data_dir, &model, batch_size, image_size),

        Commands::Predict {
            data_dir,
            model,
            batch_size,
            image_size,
            group,
            logits,
            render,
        } => cmd_predict(
            &data_dir,
            &model,
            batch_size,
            image_size,
            group.as_deref(),
            logits,
            render.as_deref(),
        ),

        Commands::Export {
            model,
            output,
            image_size,
        } => cmd_export(&model, &output, image_size),

        Commands::Stats { data_dir } => cmd_stats(&data_dir),
    }
}

fn print_banner() {
    println!(
        "{}",
        "Fruit Classifier (apple / banana / orange) powered by Burn".green()
    );
    println!();
}

fn parse_activation(name: &str) -> Result<ActivationKind> {
    match name.to_lowercase().as_str() {
        "relu" => Ok(ActivationKind::Relu),
        "gelu" => Ok(ActivationKind::Gelu),
        "silu" => Ok(ActivationKind::Silu),
        other => anyhow::bail!("unknown activation '{}' (expected relu, gelu or silu)", other),
    }
}

/// Build a model config from CLI flags and validate it
fn model_config(image_size: usize, batch_size: usize, activation: ActivationKind) -> Result<ModelConfig> {
    let config = ModelConfig {
        image_height: image_size,
        image_width: image_size,
        batch_size,
        activation,
        ..Default::default()
    };
    config.validate()?;
    Ok(config)
}

/// Load a checkpoint into a freshly built model on the default backend
fn load_checkpoint(config: &ModelConfig, path: &Path) -> Result<FruitClassifier<DefaultBackend>> {
    use burn::module::Module;
    use burn::record::CompactRecorder;

    if !path.exists() && !path.with_extension("mpk").exists() {
        anyhow::bail!("Model checkpoint not found: {:?}", path);
    }

    let device = default_device();
    let recorder = CompactRecorder::new();
    FruitClassifier::<DefaultBackend>::new(config, &device)
        .load_file(path, &recorder, &device)
        .map_err(|e| anyhow::anyhow!("Failed to load model: {:?}", e))
}

fn cmd_train(
    data_dir: &str,
    epochs: usize,
    batch_size: usize,
    image_size: usize,
    learning_rate: f64,
    activation: &str,
    seed: u64,
    output_dir: &str,
    export: Option<&str>,
) -> Result<()> {
    let config = model_config(image_size, batch_size, parse_activation(activation)?)?;
    let train_config = TrainConfig {
        epochs,
        learning_rate,
        seed,
    };

    println!("{}", "Training configuration:".cyan().bold());
    println!("  Data directory: {}", data_dir);
    println!("  Image size:     {}x{}", image_size, image_size);
    println!("  Batch size:     {}", batch_size);
    println!("  Epochs:         {}", epochs);
    println!("  Learning rate:  {}", learning_rate);
    println!("  Backend:        {}", backend_name());
    println!();

    // Dataset preparation
    let root = Path::new(data_dir);
    let train = FruitDataset::scan(root.join("train"), config.image_size())?;
    let valid = FruitDataset::scan(root.join("validation"), config.image_size())?;
    train.expect_classes(&CLASS_NAMES)?;
    valid.expect_classes(&CLASS_NAMES)?;
    train.stats().print();

    let train_set = FruitImageDataset::from_loader(&train);
    let valid_set = FruitImageDataset::from_loader(&valid);

    // Network construction and compilation
    let device = default_device();
    let model = FruitClassifier::<TrainBackend>::new(&config, &device);
    let mut trainer = Trainer::new(model, config.clone(), train_config, device);

    // Training
    println!("{}", "Starting training...".green().bold());
    println!();
    trainer.fit(&train_set, &valid_set)?;

    // Checkpoint, with the model config saved alongside it
    let checkpoint = trainer.save_checkpoint(Path::new(output_dir))?;
    config.save(&checkpoint.with_extension("json"))?;
    println!("{} {:?}", "Saved checkpoint:".cyan(), checkpoint);

    // Optional edge export
    if let Some(export_path) = export {
        use burn::module::AutodiffModule;
        let exported = export_model(&trainer.model.valid(), Path::new(export_path))?;
        println!("{} {:?}", "Exported edge model:".cyan(), exported);
    }

    // Final evaluation on the test set when present
    let test_dir = root.join("test");
    if test_dir.exists() {
        let test = FruitDataset::scan(test_dir, config.image_size())?;
        let report = trainer.evaluate(&FruitImageDataset::from_loader(&test));
        println!(
            "{} loss = {:.4}, accuracy = {:.2}% ({} samples)",
            "Test set:".cyan().bold(),
            report.loss,
            report.accuracy * 100.0,
            report.samples
        );
    }

    println!();
    println!("{}", "Training complete!".green().bold());
    Ok(())
}

fn cmd_evaluate(data_dir: &str, model: &str, batch_size: usize, image_size: usize) -> Result<()> {
    let config = model_config(image_size, batch_size, ActivationKind::Relu)?;
    let model = load_checkpoint(&config, Path::new(model))?;

    let test = FruitDataset::scan(Path::new(data_dir).join("test"), config.image_size())?;
    test.expect_classes(&CLASS_NAMES)?;
    info!("Evaluating on {} test samples", test.len());

    let device = default_device();
    let report = evaluate_model(
        &model,
        &FruitImageDataset::from_loader(&test),
        &device,
        &config,
    );

    println!("{}", "Evaluation:".cyan().bold());
    println!("  Loss:     {:.4}", report.loss);
    println!("  Accuracy: {:.2}%", report.accuracy * 100.0);
    println!("  Samples:  {}", report.samples);
    Ok(())
}

fn cmd_predict(
    data_dir: &str,
    model: &str,
    batch_size: usize,
    image_size: usize,
    group: Option<&str>,
    logits: bool,
    render: Option<&str>,
) -> Result<()> {
    let config = model_config(image_size, batch_size, ActivationKind::Relu)?;
    let model = load_checkpoint(&config, Path::new(model))?;
    let device = default_device();
    let predictor = Predictor::new(model, config.clone(), device);

    let test_dir = Path::new(data_dir).join("test");
    let test = FruitDataset::scan(&test_dir, config.image_size())?;

    match group {
        None => {
            predictor.display_classification(&test, render.map(Path::new))?;
            if logits {
                println!();
                predictor.show_logits(&test)?;
            }
        }
        Some("all") => {
            predictor.print_apple_predictions(&test_dir)?;
            predictor.print_banana_predictions(&test_dir)?;
            predictor.print_orange_predictions(&test_dir)?;
        }
        Some(class) => predictor.print_class_predictions(&test_dir, class)?,
    }

    Ok(())
}

fn cmd_export(model: &str, output: &str, image_size: usize) -> Result<()> {
    let config = model_config(image_size, fruit_classifier::DEFAULT_BATCH_SIZE, ActivationKind::Relu)?;
    let model = load_checkpoint(&config, Path::new(model))?;

    let exported = export_model(&model, Path::new(output))?;
    println!("{} {:?}", "Exported edge model:".cyan().bold(), exported);
    Ok(())
}

fn cmd_stats(data_dir: &str) -> Result<()> {
    let root = Path::new(data_dir);
    if !root.exists() {
        anyhow::bail!("Dataset directory not found: {:?}", root);
    }

    for split in ["train", "validation", "test"] {
        let dir: PathBuf = root.join(split);
        if !dir.exists() {
            println!("{} {} (missing)", "Split:".yellow(), split);
            continue;
        }

        println!("{} {}", "Split:".cyan().bold(), split);
        let dataset = FruitDataset::scan(&dir, (32, 32))?;
        dataset.stats().print();
        println!();
    }

    Ok(())
}
