use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use comfy_webui::comfyui::JobStatus;
use comfy_webui::workflow::params::{DEFAULT_NEGATIVE, DEFAULT_PROMPT};
use comfy_webui::{AppError, ComfyUIClient, Config, GenerationParams, WorkflowBuilder};

#[derive(Parser, Debug)]
#[command(name = "comfyctl", about = "CLI for the ComfyUI image generator", version)]
struct Cli {
    /// Override COMFYUI_URL
    #[arg(global = true, long)]
    comfyui_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the SDXL workflow and queue it
    Generate {
        /// Positive prompt text
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,
        /// Negative prompt text
        #[arg(long, default_value = DEFAULT_NEGATIVE)]
        negative: String,
        #[arg(long, default_value_t = 1024)]
        width: u32,
        #[arg(long, default_value_t = 1024)]
        height: u32,
        #[arg(long, default_value_t = 20)]
        steps: u32,
        /// CFG scale
        #[arg(long, default_value_t = 7.5)]
        cfg: f64,
        /// Seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
        /// Poll history until the image is ready
        #[arg(long)]
        wait: bool,
        /// Seconds between polls when waiting
        #[arg(long, default_value_t = 1)]
        poll_secs: u64,
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
        /// Download the finished image here (implies --wait)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Print the constructed graph before sending
        #[arg(short, long)]
        verbose: bool,
    },
    /// Check whether a prompt has finished
    Status {
        prompt_id: String,
    },
    /// Image operations
    Image {
        #[command(subcommand)]
        cmd: ImageCmd,
    },
    /// Check that ComfyUI is reachable
    Health,
}

#[derive(Subcommand, Debug)]
enum ImageCmd {
    /// Download an image by filename
    Get {
        /// Filename reported by ComfyUI (e.g. by `status`)
        filename: String,
        /// Output path (defaults to ./<filename>)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::from_env();
    if let Some(url) = cli.comfyui_url {
        conf.comfyui_url = url;
    }
    let client = ComfyUIClient::new(conf.comfyui_url.clone());

    match cli.command {
        Commands::Generate {
            prompt,
            negative,
            width,
            height,
            steps,
            cfg,
            seed,
            wait,
            poll_secs,
            timeout_secs,
            out,
            verbose,
        } => {
            let params = GenerationParams {
                prompt,
                negative,
                width,
                height,
                steps,
                cfg,
                seed,
            };
            let builder = WorkflowBuilder::from_config(&conf).await?;
            let workflow = builder.build(&params)?;

            if verbose {
                eprintln!(
                    "[verbose] Graph sent to ComfyUI:\n{}",
                    serde_json::to_string_pretty(&workflow.graph)?
                );
            }

            let queued = client.queue_prompt(&workflow.graph).await?;
            let prompt_id = queued
                .prompt_id
                .ok_or_else(|| AppError::ComfyUI("Failed to queue prompt".to_string()))?;
            println!("queued {} (seed {})", prompt_id, workflow.seed);

            if !wait && out.is_none() {
                return Ok(());
            }

            let filename = wait_for_image(
                &client,
                &prompt_id,
                Duration::from_secs(poll_secs.max(1)),
                Duration::from_secs(timeout_secs),
            )
            .await?;
            println!("complete {}", filename);

            if let Some(path) = out {
                save_image(&client, &filename, path).await?;
            }
            Ok(())
        }
        Commands::Status { prompt_id } => {
            match client.job_status(&prompt_id).await? {
                JobStatus::Processing => println!("processing"),
                JobStatus::Complete { filename } => println!("complete {}", filename),
            }
            Ok(())
        }
        Commands::Image { cmd } => match cmd {
            ImageCmd::Get { filename, out } => {
                let path = out.unwrap_or_else(|| PathBuf::from(&filename));
                save_image(&client, &filename, path).await
            }
        },
        Commands::Health => {
            if client.ping(conf.health_timeout).await {
                println!("ComfyUI at {} is connected", client.base_url());
                Ok(())
            } else {
                eprintln!("ComfyUI at {} is disconnected", client.base_url());
                std::process::exit(1);
            }
        }
    }
}

async fn wait_for_image(
    client: &ComfyUIClient,
    prompt_id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<String, AppError> {
    let started = Instant::now();
    loop {
        if let JobStatus::Complete { filename } = client.job_status(prompt_id).await? {
            return Ok(filename);
        }
        if started.elapsed() >= timeout {
            return Err(AppError::ComfyUI(format!(
                "Timed out after {}s waiting for {}",
                timeout.as_secs(),
                prompt_id
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

async fn save_image(
    client: &ComfyUIClient,
    filename: &str,
    path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = client.get_image(filename).await?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &bytes).await?;
    println!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
