//! Prompt templates for the three pipeline stages plus recalculation.
//!
//! Every prompt pins the same line contract: one item per line,
//! `Name | Quantity | Unit | Reasoning`, strictly numeric quantities.

pub const LINE_FORMAT_RULES: &str = "\
Format each line exactly as: Name | Quantity | Unit | Reasoning\n\
Quantity must be a numeric value only, with '.' as the decimal point.\n\
Avoid vague ranges or approximations like 'a few' or 'some'.";

/// Stage 1: name the dish and list what is actually visible.
pub fn description_prompt(custom_prompt: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a food analyst. Look at this image and identify the food shown.\n\
         Output exactly this structure:\n\
         Dish: <dish name, or a comma-separated list if several items are shown>\n\
         Visible ingredients:\n\
         <one line per visible ingredient>\n\n\
         {}\n\
         VISIBLE means you can actually see it: vegetables, proteins, grains,\n\
         garnishes, bread, salad components.\n\
         DO NOT include cooking oils, salt, spices, or marinades (these are hidden).\n\
         Skip any background or utensils.\n\n\
         Example:\n\
         Dish: Chicken curry with basmati rice\n\
         Visible ingredients:\n\
         Chicken pieces | 150 | g | Main curry dish\n\
         Basmati rice | 200 | g | Side dish",
        LINE_FORMAT_RULES
    );
    if let Some(custom) = custom_prompt {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            prompt.push_str("\n\nAdditional instructions from the user:\n");
            prompt.push_str(trimmed);
        }
    }
    prompt
}

/// Stage 2: infer what went into the dish but cannot be seen.
pub fn hidden_prompt(dish_name: &str, visible_ingredients: &str) -> String {
    format!(
        "You are a recipe analyst identifying hidden, non-visible ingredients.\n\n\
         DISH: {}\n\
         VISIBLE INGREDIENTS (what can be seen in the image):\n{}\n\n\
         List only the likely hidden ingredients used in traditional or common\n\
         recipes for this dish: cooking oils or fats, basic seasonings, cooking\n\
         liquids, marinades, binding agents, mixed-in spices and herbs.\n\
         Avoid optional or garnish ingredients.\n\n\
         {}\n\
         Example:\n\
         Cooking oil | 3 | tbsp | Used for frying the curry base\n\
         Salt | 2 | tsp | Seasoning mixed into the sauce",
        dish_name, visible_ingredients, LINE_FORMAT_RULES
    )
}

/// Stage 3: estimate the nutritional breakdown of the whole meal.
pub fn nutrition_prompt(
    dish_name: &str,
    visible_ingredients: &str,
    hidden_ingredients: Option<&str>,
) -> String {
    let mut ingredient_block = format!(
        "DISH: {}\n\nVISIBLE INGREDIENTS:\n{}",
        dish_name, visible_ingredients
    );
    if let Some(hidden) = hidden_ingredients {
        if !hidden.trim().is_empty() {
            ingredient_block.push_str("\n\nHIDDEN INGREDIENTS:\n");
            ingredient_block.push_str(hidden);
        }
    }
    format!(
        "You are a nutritionist calculating the total nutrition of a meal.\n\n\
         {}\n\n\
         Calculate the TOTAL nutritional breakdown for the entire meal as served.\n\
         Output one nutrient per line.\n\
         {}\n\
         Include these nutrients: Calories, Protein, Fat, Carbohydrates, Fiber, Sugar, Sodium.\n\n\
         Example:\n\
         Calories | 720 | kcal | Estimated from rice and chicken\n\
         Protein | 32 | g | Chicken contributes the majority",
        ingredient_block, LINE_FORMAT_RULES
    )
}

/// Recalculation: nutrition from an edited ingredient list, no image.
pub fn recalculation_prompt(ingredients_text: &str) -> String {
    format!(
        "You are a nutritionist.\n\
         Calculate the exact nutritional values for these ingredients:\n\n{}\n\n\
         Output one nutrient per line.\n\
         {}\n\
         Include at least: Calories, Protein, Fat, Carbohydrates, Fiber, Sugar, Sodium.\n\
         Base calculations on the specific quantities provided.\n\
         Be strict with the format.",
        ingredients_text, LINE_FORMAT_RULES
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_prompt_merges_custom_instructions() {
        let base = description_prompt(None);
        assert!(!base.contains("Additional instructions"));

        let merged = description_prompt(Some("Focus on the left plate only."));
        assert!(merged.starts_with(&base));
        assert!(merged.contains("Focus on the left plate only."));

        // Whitespace-only custom prompts are ignored.
        assert_eq!(description_prompt(Some("   ")), base);
    }

    #[test]
    fn test_nutrition_prompt_hidden_policy() {
        let with = nutrition_prompt("Curry", "Rice | 200 | g | side", Some("Oil | 1 | tbsp | frying"));
        assert!(with.contains("HIDDEN INGREDIENTS:"));
        assert!(with.contains("Oil | 1 | tbsp | frying"));

        let without = nutrition_prompt("Curry", "Rice | 200 | g | side", None);
        assert!(!without.contains("HIDDEN INGREDIENTS:"));
    }

    #[test]
    fn test_hidden_prompt_includes_dish_and_visible() {
        let prompt = hidden_prompt("Ramen", "Noodles | 180 | g | in broth");
        assert!(prompt.contains("DISH: Ramen"));
        assert!(prompt.contains("Noodles | 180 | g | in broth"));
    }
}
