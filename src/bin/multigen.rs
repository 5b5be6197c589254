//! CLI for MultiGen - batch image editing with generative AI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use multigen::{
    BatchController, BatchEvent, EmbeddedImage, GeminiClient, GeminiImageModel, PromptList,
    SuggestionController, MAX_PROMPTS,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multigen")]
#[command(about = "Edit one reference image with many prompts via a generative AI API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch: one generated image per prompt
    Edit(EditArgs),

    /// Expand a description into a list of candidate prompts
    Prompts(PromptsArgs),

    /// Check that the API credentials work
    Check(CheckArgs),
}

#[derive(Args)]
struct EditArgs {
    /// Reference image file
    #[arg(short, long)]
    reference: PathBuf,

    /// File with one prompt per line ('-' reads stdin)
    #[arg(short, long)]
    prompts: Option<PathBuf>,

    /// A single prompt; repeat for more
    #[arg(long = "prompt", value_name = "TEXT")]
    prompt: Vec<String>,

    /// Output directory for generated images
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Image model to use
    #[arg(long, value_enum, default_value = "flash")]
    model: ModelArg,

    /// API key (falls back to GOOGLE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Args)]
struct PromptsArgs {
    /// What the prompts should be about
    description: String,

    /// API key (falls back to GOOGLE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// Image model to check
    #[arg(long, value_enum, default_value = "flash")]
    model: ModelArg,

    /// API key (falls back to GOOGLE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// Gemini 2.5 Flash Image
    Flash,
    /// Gemini 3 Pro Image
    Pro,
}

impl From<ModelArg> for GeminiImageModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Flash => GeminiImageModel::FlashImage,
            ModelArg::Pro => GeminiImageModel::ProImage,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Edit(args) => run_edit(args, cli.json).await,
        Commands::Prompts(args) => run_prompts(args, cli.json).await,
        Commands::Check(args) => run_check(args, cli.json).await,
    }
}

fn build_client(api_key: Option<String>, model: ModelArg) -> multigen::Result<GeminiClient> {
    let mut builder = GeminiClient::builder().image_model(model.into());
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    builder.build()
}

fn read_prompt_text(args: &EditArgs) -> anyhow::Result<String> {
    match (&args.prompts, args.prompt.is_empty()) {
        (Some(_), false) => anyhow::bail!("use either --prompts or --prompt, not both"),
        (Some(path), true) => {
            if path.as_os_str() == "-" {
                use std::io::Read;
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                Ok(text)
            } else {
                Ok(std::fs::read_to_string(path)?)
            }
        }
        (None, false) => Ok(args.prompt.join("\n")),
        (None, true) => anyhow::bail!("provide prompts with --prompts <file> or --prompt <text>"),
    }
}

async fn run_edit(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let raw = read_prompt_text(&args)?;
    let prompts = PromptList::parse(&raw, MAX_PROMPTS)?;
    if prompts.is_empty() {
        anyhow::bail!("no prompts given (blank lines are ignored)");
    }

    let reference = EmbeddedImage::from_path(&args.reference)?;
    let client = build_client(args.api_key.clone(), args.model)?;
    std::fs::create_dir_all(&args.output)?;

    // Save each item as it streams in rather than waiting for the batch
    let out_dir = args.output.clone();
    let sink = move |event: BatchEvent| match event {
        BatchEvent::Started { progress } => {
            eprintln!("generating {} image(s)...", progress.total);
        }
        BatchEvent::ItemCompleted { item } => {
            let path = out_dir.join(item.file_name());
            match item.image.save(&path) {
                Ok(()) => eprintln!("  saved {}", path.display()),
                Err(e) => eprintln!("  failed to save {}: {e}", path.display()),
            }
        }
        BatchEvent::ItemFailed { prompt, error } => {
            eprintln!("  failed \"{prompt}\": {error}");
        }
        BatchEvent::Progress(progress) => {
            eprintln!("  {}/{} done", progress.completed, progress.total);
        }
        BatchEvent::Finished { .. } => {}
    };

    let mut controller = BatchController::new();
    let summary = controller.run(&client, &reference, &prompts, &sink).await;

    if json_output {
        let items: Vec<_> = controller
            .items()
            .iter()
            .map(|item| {
                serde_json::json!({
                    "id": item.id,
                    "prompt": item.source_prompt,
                    "file": args.output.join(item.file_name()).display().to_string(),
                    "created_at": item.created_at.to_rfc3339(),
                })
            })
            .collect();
        let failures: Vec<_> = controller
            .failures()
            .iter()
            .map(|f| serde_json::json!({"prompt": f.prompt, "error": f.error}))
            .collect();
        let result = serde_json::json!({
            "type": "batch",
            "succeeded": summary.succeeded,
            "failed": summary.failed,
            "items": items,
            "failures": failures,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated {} image(s), {} failed, saved to {}",
            summary.succeeded,
            summary.failed,
            args.output.display()
        );
    }

    Ok(())
}

async fn run_prompts(args: PromptsArgs, json_output: bool) -> anyhow::Result<()> {
    // Only the fixed text model is used for expansion; the image model
    // choice is irrelevant here
    let client = build_client(args.api_key, ModelArg::Flash)?;

    let mut suggestions = SuggestionController::new();
    let prompts = suggestions
        .create(&client, &args.description)
        .await
        .map_err(|e| anyhow::anyhow!("prompt creation failed ({e}), please try again"))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&prompts)?);
    } else if prompts.is_empty() {
        println!("No prompts returned, try a more specific description");
    } else {
        for (i, prompt) in prompts.iter().enumerate() {
            println!("{:2}. {prompt}", i + 1);
        }
    }

    Ok(())
}

async fn run_check(args: CheckArgs, json_output: bool) -> anyhow::Result<()> {
    let model: GeminiImageModel = args.model.into();
    let client = build_client(args.api_key, args.model)?;
    client.health_check().await?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ok": true,
                "model": model.as_str(),
            }))?
        );
    } else {
        println!("Credentials OK (model {})", model.as_str());
    }

    Ok(())
}
