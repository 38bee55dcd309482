//! Static fallback blocks substituted when a stage exhausts its retry
//! budget. Each block is well-formed for the downstream parser, so the
//! pipeline always hands the caller a complete result.

/// Replacement description-stage output. Carries the section header so the
/// normal extraction path applies to it unchanged.
pub const DESCRIPTION_FALLBACK: &str = "\
Dish: Unidentified dish
Visible ingredients:
Mixed ingredients | 0 | g | Image analysis unavailable";

/// Replacement hidden-ingredient output: the staples almost any prepared
/// dish involves.
pub const HIDDEN_FALLBACK: &str = "\
Cooking oil | 2 | tbsp | Used for cooking dishes
Salt | 1 | tsp | Basic seasoning for dishes";

/// Replacement nutrition output covering the full required vocabulary.
pub const NUTRITION_FALLBACK: &str = "\
Calories | 0 | kcal | Analysis failed
Protein | 0 | g | Analysis failed
Fat | 0 | g | Analysis failed
Carbohydrates | 0 | g | Analysis failed
Fiber | 0 | g | Analysis failed
Sugar | 0 | g | Analysis failed
Sodium | 0 | mg | Analysis failed";
