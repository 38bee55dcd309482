use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

use crate::response_parser::Record;

// Expected column headers of the recipe nutrition table.
const NAME_COL: &str = "Name";
const CALORIES_COL: &str = "Calories";
const FAT_COL: &str = "FatContent";
const SAT_FAT_COL: &str = "SaturatedFatContent";
const CHOLESTEROL_COL: &str = "CholesterolContent";
const SODIUM_COL: &str = "SodiumContent";
const CARB_COL: &str = "CarbohydrateContent";
const FIBER_COL: &str = "FiberContent";
const SUGAR_COL: &str = "SugarContent";
const PROTEIN_COL: &str = "ProteinContent";

/// One row of the static recipe table: a dish and its per-serving
/// nutrition values. Missing cells stay `None`.
#[derive(Debug, Clone)]
pub struct RecipeEntry {
    pub name: String,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub saturated_fat_g: Option<f64>,
    pub cholesterol_mg: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub carbohydrate_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
}

/// Lookup capability for known dishes; lets the nutrition stage skip the
/// model entirely when the dish is already in the table.
pub trait RecipeStore: Send + Sync {
    fn find_dish(&self, dish_name: &str) -> Option<&RecipeEntry>;
}

#[derive(Debug)]
pub struct CsvRecipeStore {
    entries: Vec<RecipeEntry>,
    by_name: HashMap<String, usize>,
}

fn parse_optional_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

impl CsvRecipeStore {
    pub fn load(csv_path: &Path) -> Result<Self> {
        if !csv_path.exists() {
            return Err(anyhow::anyhow!(
                "Recipe CSV file not found at: {:?}",
                csv_path
            ));
        }

        let file = std::fs::File::open(csv_path)
            .with_context(|| format!("Failed to open recipe CSV file at {:?}", csv_path))?;
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", name))
        };

        let name_idx = column(NAME_COL)?;
        let calories_idx = column(CALORIES_COL)?;
        let fat_idx = column(FAT_COL)?;
        let sat_fat_idx = column(SAT_FAT_COL)?;
        let cholesterol_idx = column(CHOLESTEROL_COL)?;
        let sodium_idx = column(SODIUM_COL)?;
        let carb_idx = column(CARB_COL)?;
        let fiber_idx = column(FIBER_COL)?;
        let sugar_idx = column(SUGAR_COL)?;
        let protein_idx = column(PROTEIN_COL)?;

        let mut entries = Vec::new();
        let mut by_name = HashMap::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record =
                result.with_context(|| format!("Failed to read record at row index {}", row_index))?;

            let name = record
                .get(name_idx)
                .ok_or_else(|| anyhow::anyhow!("Missing name at row {}", row_index))?
                .trim()
                .to_string();
            if name.is_empty() {
                continue;
            }

            let cell = |idx: usize| record.get(idx).and_then(parse_optional_f64);
            let entry = RecipeEntry {
                name: name.clone(),
                calories: cell(calories_idx),
                protein_g: cell(protein_idx),
                fat_g: cell(fat_idx),
                saturated_fat_g: cell(sat_fat_idx),
                cholesterol_mg: cell(cholesterol_idx),
                sodium_mg: cell(sodium_idx),
                carbohydrate_g: cell(carb_idx),
                fiber_g: cell(fiber_idx),
                sugar_g: cell(sugar_idx),
            };
            // Later rows with the same name shadow earlier ones.
            by_name.insert(name.to_lowercase(), entries.len());
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(anyhow::anyhow!(
                "No valid recipe data loaded from {:?}",
                csv_path
            ));
        }

        Ok(Self { entries, by_name })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecipeStore for CsvRecipeStore {
    fn find_dish(&self, dish_name: &str) -> Option<&RecipeEntry> {
        self.by_name
            .get(&dish_name.trim().to_lowercase())
            .map(|&idx| &self.entries[idx])
    }
}

/// Converts a table row into nutrient records in the canonical vocabulary.
/// Only columns with a value are emitted; the caller completes the rest.
pub fn nutrient_records_from_entry(entry: &RecipeEntry) -> Vec<Record> {
    let reasoning = format!("Recipe table value for '{}'", entry.name);
    let columns: [(&str, &str, Option<f64>); 9] = [
        ("Calories", "kcal", entry.calories),
        ("Protein", "g", entry.protein_g),
        ("Fat", "g", entry.fat_g),
        ("Carbohydrates", "g", entry.carbohydrate_g),
        ("Fiber", "g", entry.fiber_g),
        ("Sugar", "g", entry.sugar_g),
        ("Sodium", "mg", entry.sodium_mg),
        ("Saturated Fat", "g", entry.saturated_fat_g),
        ("Cholesterol", "mg", entry.cholesterol_mg),
    ];
    columns
        .iter()
        .filter_map(|(name, unit, value)| {
            value.map(|v| Record::new(*name, v, *unit, reasoning.clone()))
        })
        .collect()
}
