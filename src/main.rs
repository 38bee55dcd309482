use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use mealscan::analyzer::{AnalysisRequest, AnalyzerConfig, ImageAnalyzer};
use mealscan::api_connection::GeminiClient;
use mealscan::cli::{parse_args, Command};
use mealscan::recipe_store::CsvRecipeStore;

const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}

/// Analyzer settings come from the environment here, at the edge; the core
/// only ever sees the explicit config struct.
fn analyzer_config_from_env() -> AnalyzerConfig {
    let defaults = AnalyzerConfig::default();
    AnalyzerConfig {
        timeout: env_u64("ANALYSIS_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
        max_attempts: env_u64("ANALYSIS_MAX_ATTEMPTS")
            .map(|v| v as u32)
            .unwrap_or(defaults.max_attempts),
        backoff_base: env_u64("ANALYSIS_BACKOFF_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.backoff_base),
        hidden_in_nutrition: defaults.hidden_in_nutrition,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mealscan=info".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli_args = parse_args();

    let client = GeminiClient::from_env(API_KEY_ENV_VAR)
        .with_context(|| format!("Failed to configure the Gemini client ({})", API_KEY_ENV_VAR))?;
    let mut analyzer = ImageAnalyzer::new(Arc::new(client), analyzer_config_from_env());

    match cli_args.command {
        Command::Analyze {
            image_file,
            user_id,
            prompt,
            recipes_csv,
        } => {
            if let Some(csv_path) = recipes_csv {
                let store = CsvRecipeStore::load(Path::new(&csv_path))
                    .with_context(|| format!("Failed to load recipe table '{}'", csv_path))?;
                println!("Loaded recipe table with {} dishes.", store.len());
                analyzer = analyzer.with_recipe_store(Arc::new(store));
            }

            let image = fs::read(&image_file)
                .await
                .with_context(|| format!("Failed to read image file '{}'", image_file))?;
            println!("Analyzing image '{}'...", image_file);

            let result = analyzer
                .analyze(AnalysisRequest {
                    image,
                    user_id: user_id.clone(),
                    custom_prompt: prompt,
                })
                .await
                .map_err(|e| anyhow::anyhow!("Image rejected: {}", e))?;

            println!(
                "Analysis finished in {:.2}s.\n",
                result.elapsed_time
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&result.to_response(&user_id))?
            );
        }
        Command::Recalculate { ingredients_file } => {
            let ingredients_text = fs::read_to_string(&ingredients_file)
                .await
                .with_context(|| {
                    format!("Failed to read ingredients file '{}'", ingredients_file)
                })?;
            println!("Recalculating nutrition...");

            let nutrition = analyzer
                .recalculate_nutrition(&ingredients_text)
                .await
                .map_err(|e| anyhow::anyhow!("Recalculation rejected: {}", e))?;

            println!("\n{}", nutrition);
        }
    }

    Ok(())
}
