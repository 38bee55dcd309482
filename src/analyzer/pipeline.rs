use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};

use super::{fallback, prompts};
use crate::api_connection::ModelClient;
use crate::image_input::{self, ImageInputError, PreparedImage};
use crate::recipe_store::{nutrient_records_from_entry, RecipeStore};
use crate::response_parser::{
    ensure_required_nutrients, parse_lines, render_lines, split_sections, Record,
};

/// One inbound analysis job. The analyzer owns it for the duration of the
/// call; the caller owns the produced `AnalysisResult`.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub user_id: String,
    pub custom_prompt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Wall-clock budget for the whole multi-call pipeline.
    pub timeout: Duration,
    /// Attempts per stage before its fallback block is substituted.
    pub max_attempts: u32,
    /// First retry delay; doubles on each subsequent retry.
    pub backoff_base: Duration,
    /// Whether hidden ingredients feed the nutrition estimate.
    pub hidden_in_nutrition: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            hidden_in_nutrition: true,
        }
    }
}

/// The only error kind that crosses the analyzer's public boundary. Raised
/// before any outbound model call; everything later degrades to fallback
/// content instead of failing.
#[derive(Debug)]
pub enum InputError {
    InvalidImage(ImageInputError),
    EmptyIngredientText,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::InvalidImage(err) => write!(f, "{}", err),
            InputError::EmptyIngredientText => {
                write!(f, "Ingredient text is empty; nothing to recalculate")
            }
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InputError::InvalidImage(err) => Some(err),
            InputError::EmptyIngredientText => None,
        }
    }
}

impl From<ImageInputError> for InputError {
    fn from(err: ImageInputError) -> Self {
        InputError::InvalidImage(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub dish_name: String,
    pub visible_ingredients: Vec<Record>,
    pub hidden_ingredients: Vec<Record>,
    pub nutrients: Vec<Record>,
    pub elapsed_time: f64,
    pub status: AnalysisStatus,
    pub error: Option<String>,
}

impl AnalysisResult {
    /// The response shape the mobile clients consume: record sequences
    /// rendered back to newline-joined pipe lines.
    pub fn to_response(&self, user_id: &str) -> AnalysisResponse {
        AnalysisResponse {
            dish_prediction: self.dish_name.clone(),
            image_description: render_lines(&self.visible_ingredients),
            hidden_ingredients: render_lines(&self.hidden_ingredients),
            nutrition_info: render_lines(&self.nutrients),
            analysis_time: self.elapsed_time,
            user_id: user_id.to_string(),
            error: self.error.clone(),
        }
    }

    /// Complete result built entirely from the fallback blocks; used when
    /// the pipeline budget expires. Schema-valid, never partial.
    fn failure(reason: String, elapsed: f64) -> Self {
        let split = split_sections(fallback::DESCRIPTION_FALLBACK);
        Self {
            dish_name: split.dish_name,
            visible_ingredients: parse_lines(&split.visible).records,
            hidden_ingredients: parse_lines(fallback::HIDDEN_FALLBACK).records,
            nutrients: ensure_required_nutrients(parse_lines(fallback::NUTRITION_FALLBACK).records),
            elapsed_time: elapsed,
            status: AnalysisStatus::Failure,
            error: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub dish_prediction: String,
    pub image_description: String,
    pub hidden_ingredients: String,
    pub nutrition_info: String,
    pub analysis_time: f64,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn valid_description(text: &str) -> bool {
    let split = split_sections(text);
    !split.dish_name.is_empty() && !parse_lines(&split.visible).records.is_empty()
}

fn valid_ingredient_lines(text: &str) -> bool {
    !parse_lines(text).records.is_empty()
}

const MIN_NUTRITION_LINES: usize = 3;

fn valid_nutrition(text: &str) -> bool {
    parse_lines(text).records.len() >= MIN_NUTRITION_LINES
}

/// Drives the describe -> hidden-ingredients -> nutrition pipeline against
/// an injected model client and turns the text into one `AnalysisResult`.
pub struct ImageAnalyzer {
    client: Arc<dyn ModelClient>,
    recipes: Option<Arc<dyn RecipeStore>>,
    config: AnalyzerConfig,
}

impl ImageAnalyzer {
    pub fn new(client: Arc<dyn ModelClient>, config: AnalyzerConfig) -> Self {
        Self {
            client,
            recipes: None,
            config,
        }
    }

    /// Attaches a recipe table consulted before the nutrition model call.
    pub fn with_recipe_store(mut self, recipes: Arc<dyn RecipeStore>) -> Self {
        self.recipes = Some(recipes);
        self
    }

    /// Full image analysis. Invalid images are rejected before any model
    /// call; every later failure mode degrades to fallback content, and a
    /// pipeline timeout yields a complete failure-status result.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, InputError> {
        let started = Instant::now();
        let prepared = image_input::validate_and_prepare(&request.image)?;
        tracing::info!(user_id = %request.user_id, "starting image analysis");

        let outcome = timeout(
            self.config.timeout,
            self.run_stages(&prepared, request.custom_prompt.as_deref(), started),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(user_id = %request.user_id, "analysis pipeline timed out");
                AnalysisResult::failure(
                    format!(
                        "Analysis timed out after {} seconds",
                        self.config.timeout.as_secs()
                    ),
                    started.elapsed().as_secs_f64(),
                )
            }
        };
        tracing::info!(
            user_id = %request.user_id,
            dish = %result.dish_name,
            elapsed = result.elapsed_time,
            "image analysis finished"
        );
        Ok(result)
    }

    async fn run_stages(
        &self,
        image: &PreparedImage,
        custom_prompt: Option<&str>,
        started: Instant,
    ) -> AnalysisResult {
        let description = self
            .call_with_fallback(
                "description",
                &prompts::description_prompt(custom_prompt),
                Some(image),
                valid_description,
                fallback::DESCRIPTION_FALLBACK,
            )
            .await;

        let split = split_sections(&description);
        let dish_name = split.dish_name;
        let visible = parse_lines(&split.visible).records;
        let visible_text = render_lines(&visible);

        let hidden_text = self
            .call_with_fallback(
                "hidden_ingredients",
                &prompts::hidden_prompt(&dish_name, &visible_text),
                None,
                valid_ingredient_lines,
                fallback::HIDDEN_FALLBACK,
            )
            .await;
        let hidden = parse_lines(&hidden_text).records;

        let nutrients = self
            .nutrition_records(&dish_name, &visible_text, &hidden)
            .await;

        AnalysisResult {
            dish_name,
            visible_ingredients: visible,
            hidden_ingredients: hidden,
            nutrients,
            elapsed_time: started.elapsed().as_secs_f64(),
            status: AnalysisStatus::Success,
            error: None,
        }
    }

    async fn nutrition_records(
        &self,
        dish_name: &str,
        visible_text: &str,
        hidden: &[Record],
    ) -> Vec<Record> {
        if let Some(store) = &self.recipes {
            if let Some(entry) = store.find_dish(dish_name) {
                tracing::info!(dish = dish_name, "nutrition served from recipe table");
                return ensure_required_nutrients(nutrient_records_from_entry(entry));
            }
        }

        let hidden_text = if self.config.hidden_in_nutrition && !hidden.is_empty() {
            Some(render_lines(hidden))
        } else {
            None
        };
        let nutrition_text = self
            .call_with_fallback(
                "nutrition",
                &prompts::nutrition_prompt(dish_name, visible_text, hidden_text.as_deref()),
                None,
                valid_nutrition,
                fallback::NUTRITION_FALLBACK,
            )
            .await;
        ensure_required_nutrients(parse_lines(&nutrition_text).records)
    }

    /// Nutrition from an edited ingredient-line block, no image involved.
    /// Same retry/fallback policy as the pipeline stages.
    pub async fn recalculate_nutrition(
        &self,
        ingredients_text: &str,
    ) -> Result<String, InputError> {
        if ingredients_text.trim().is_empty() {
            return Err(InputError::EmptyIngredientText);
        }

        let outcome = timeout(self.config.timeout, async {
            let nutrition_text = self
                .call_with_fallback(
                    "recalculation",
                    &prompts::recalculation_prompt(ingredients_text),
                    None,
                    valid_nutrition,
                    fallback::NUTRITION_FALLBACK,
                )
                .await;
            ensure_required_nutrients(parse_lines(&nutrition_text).records)
        })
        .await;

        let records = outcome.unwrap_or_else(|_| {
            tracing::warn!("nutrition recalculation timed out");
            ensure_required_nutrients(parse_lines(fallback::NUTRITION_FALLBACK).records)
        });
        Ok(render_lines(&records))
    }

    /// The one retry loop every call site shares: a transport error, an
    /// empty payload, and a structurally invalid response all count as
    /// failed attempts; retries back off exponentially, and exhausting the
    /// budget substitutes the stage's static fallback block.
    async fn call_with_fallback(
        &self,
        stage: &'static str,
        prompt: &str,
        image: Option<&PreparedImage>,
        validate: impl Fn(&str) -> bool,
        fallback_text: &'static str,
    ) -> String {
        let mut backoff = self.config.backoff_base;
        for attempt in 1..=self.config.max_attempts {
            match self.client.generate(prompt, image).await {
                Ok(text) if validate(&text) => return text,
                Ok(_) => {
                    tracing::warn!(stage, attempt, "response failed structural validation");
                }
                Err(err) => {
                    tracing::warn!(stage, attempt, error = %err, "model call failed");
                }
            }
            if attempt < self.config.max_attempts {
                sleep(backoff).await;
                backoff *= 2;
            }
        }
        tracing::warn!(stage, "retry budget exhausted, substituting fallback block");
        fallback_text.to_string()
    }
}
