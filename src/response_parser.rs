use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One parsed `Name | Quantity | Unit | Reasoning` line. Used for both
/// ingredient rows and nutrient rows, which share the same wire shape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub reasoning: String,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            reasoning: reasoning.into(),
        }
    }

    /// Renders the record back to the exact wire line format: four fields
    /// separated by `" | "`, quantity with a `.` decimal point and no
    /// decimal point at all for whole numbers.
    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.name,
            format_quantity(self.quantity),
            self.unit,
            self.reasoning
        )
    }
}

/// Whole quantities print as integers ("200", not "200.0") so round-trips
/// through the line format are stable.
pub fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 && quantity.abs() < 1e15 {
        format!("{}", quantity as i64)
    } else {
        format!("{}", quantity)
    }
}

pub fn render_lines(records: &[Record]) -> String {
    records
        .iter()
        .map(Record::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line; not counted as a skip.
    Empty,
    /// Line split into the wrong number of `|` columns.
    ColumnCount(usize),
    /// Quantity column did not parse as an integer or decimal.
    NonNumericQuantity(String),
}

/// Parses a single pipe-delimited line. Exactly four columns are required;
/// the quantity column is parsed as a float when it contains a decimal
/// separator and as an integer otherwise.
pub fn parse_line(line: &str) -> Result<Record, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let parts: Vec<&str> = trimmed.split('|').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(ParseError::ColumnCount(parts.len()));
    }
    let quantity = parse_quantity(parts[1])
        .ok_or_else(|| ParseError::NonNumericQuantity(parts[1].to_string()))?;
    Ok(Record {
        name: parts[0].to_string(),
        quantity,
        unit: parts[2].to_string(),
        reasoning: parts[3].to_string(),
    })
}

fn parse_quantity(raw: &str) -> Option<f64> {
    if raw.contains('.') {
        raw.parse::<f64>().ok().filter(|v| v.is_finite())
    } else {
        raw.parse::<i64>().ok().map(|v| v as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub records: Vec<Record>,
    /// Non-empty lines that failed the column-count or numeric-quantity
    /// check. Malformed model output is dropped, never fatal.
    pub skipped: usize,
}

/// Parses every line of a text block, keeping qualifying rows in source
/// order and counting the rejects.
pub fn parse_lines(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for line in text.lines() {
        match parse_line(line) {
            Ok(record) => outcome.records.push(record),
            Err(ParseError::Empty) => {}
            Err(_) => outcome.skipped += 1,
        }
    }
    if outcome.skipped > 0 {
        tracing::debug!(
            skipped = outcome.skipped,
            kept = outcome.records.len(),
            "dropped unparseable lines"
        );
    }
    outcome
}

/// Capture state while scanning a sectioned response. Entered only via
/// header-line detection; end of input stops accumulation wherever the
/// scan last was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    None,
    Visible,
    Hidden,
    Nutrition,
}

const SECTION_HEADERS: &[(&str, Section)] = &[
    ("visible ingredient", Section::Visible),
    ("hidden ingredient", Section::Hidden),
    ("nutrition", Section::Nutrition),
    ("nutrient", Section::Nutrition),
];

const DISH_LABELS: &[&str] = &[
    "dish name:",
    "dish names:",
    "food items:",
    "dishes:",
    "items:",
    "dish:",
    "food:",
    "name:",
];

fn match_section_header(line: &str) -> Option<Section> {
    // Data rows contain pipes; headers are short labels.
    if line.contains('|') {
        return None;
    }
    let lowered = line.to_lowercase();
    SECTION_HEADERS
        .iter()
        .find(|(marker, _)| lowered.contains(marker))
        .map(|(_, section)| *section)
}

fn strip_dish_label(line: &str) -> Option<&str> {
    let lowered = line.to_lowercase();
    DISH_LABELS
        .iter()
        .find(|label| lowered.starts_with(*label))
        .map(|label| line[label.len()..].trim())
}

/// Single dishes are capitalized; comma/"and"-joined lists come back from
/// the model already formatted and are left alone.
fn tidy_dish_name(raw: &str) -> String {
    let cleaned = raw
        .trim_start_matches(['#', '*', '-', ' '])
        .trim_end_matches(['#', '*', ' '])
        .trim();
    if cleaned.contains(',') || cleaned.contains(" and ") {
        return cleaned.to_string();
    }
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionSplit {
    pub dish_name: String,
    pub visible: String,
    pub hidden: String,
    pub nutrition: String,
}

/// Splits sectioned free text into the dish name and the three capture
/// buckets. Header lines switch the active bucket (case-insensitive
/// substring match); lines before any header are ignored for bucket
/// purposes, except that the very first non-empty line is the dish-name
/// candidate. An explicit label such as `Dish:` wins over the positional
/// candidate.
pub fn split_sections(text: &str) -> SectionSplit {
    let mut split = SectionSplit::default();
    let mut state = Section::None;
    let mut labeled_dish = false;
    let mut seen_first_line = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(section) = match_section_header(trimmed) {
            state = section;
            continue;
        }
        if !labeled_dish {
            if let Some(stripped) = strip_dish_label(trimmed) {
                split.dish_name = tidy_dish_name(stripped);
                labeled_dish = true;
                seen_first_line = true;
                continue;
            }
        }
        if !seen_first_line {
            split.dish_name = tidy_dish_name(trimmed);
            seen_first_line = true;
            continue;
        }
        let bucket = match state {
            Section::None => continue,
            Section::Visible => &mut split.visible,
            Section::Hidden => &mut split.hidden,
            Section::Nutrition => &mut split.nutrition,
        };
        if !bucket.is_empty() {
            bucket.push('\n');
        }
        bucket.push_str(trimmed);
    }

    split
}

/// Required nutrient vocabulary with canonical units; every analysis must
/// report each of these exactly once.
pub const REQUIRED_NUTRIENTS: &[(&str, &str)] = &[
    ("Calories", "kcal"),
    ("Protein", "g"),
    ("Fat", "g"),
    ("Carbohydrates", "g"),
    ("Fiber", "g"),
    ("Sugar", "g"),
    ("Sodium", "mg"),
];

pub const SENTINEL_REASONING: &str = "Estimated - not determined from analysis";

/// Completes a parsed nutrient list: duplicate names collapse to the last
/// occurrence (first-seen position is kept), and any required nutrient the
/// model under-delivered is synthesized with a sentinel zero value. The
/// output always covers the required vocabulary, so its cardinality is >= 7.
pub fn ensure_required_nutrients(records: Vec<Record>) -> Vec<Record> {
    let mut ordered: Vec<Record> = Vec::with_capacity(records.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record.name.to_lowercase();
        match by_name.get(&key) {
            Some(&idx) => ordered[idx] = record,
            None => {
                by_name.insert(key, ordered.len());
                ordered.push(record);
            }
        }
    }

    for (name, unit) in REQUIRED_NUTRIENTS {
        if !by_name.contains_key(&name.to_lowercase()) {
            ordered.push(Record::new(*name, 0.0, *unit, SENTINEL_REASONING));
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_well_formed() {
        let record = parse_line("Rice | 200 | g | visible in bowl").unwrap();
        assert_eq!(record.name, "Rice");
        assert_eq!(record.quantity, 200.0);
        assert_eq!(record.unit, "g");
        assert_eq!(record.reasoning, "visible in bowl");
    }

    #[test]
    fn test_parse_line_decimal_quantity() {
        let record = parse_line("Olive oil | 2.5 | tbsp | estimated for dressing").unwrap();
        assert_eq!(record.quantity, 2.5);
    }

    #[test]
    fn test_parse_line_wrong_column_count() {
        assert_eq!(
            parse_line("BadLine without pipes"),
            Err(ParseError::ColumnCount(1))
        );
        assert_eq!(
            parse_line("Rice | 200 | g"),
            Err(ParseError::ColumnCount(3))
        );
        assert_eq!(
            parse_line("Rice | 200 | g | reason | extra"),
            Err(ParseError::ColumnCount(5))
        );
    }

    #[test]
    fn test_parse_line_non_numeric_quantity() {
        assert_eq!(
            parse_line("Salt | abc | g | seasoning"),
            Err(ParseError::NonNumericQuantity("abc".to_string()))
        );
        // Ranges are not numeric values.
        assert_eq!(
            parse_line("Salt | 1-2 | tsp | seasoning"),
            Err(ParseError::NonNumericQuantity("1-2".to_string()))
        );
    }

    #[test]
    fn test_parse_lines_drops_malformed() {
        let text = "Rice | 200 | g | visible in bowl\nBadLine without pipes\nSalt | abc | g | seasoning";
        let outcome = parse_lines(text);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(
            outcome.records[0],
            Record::new("Rice", 200.0, "g", "visible in bowl")
        );
    }

    #[test]
    fn test_parse_lines_blank_lines_not_counted_as_skips() {
        let outcome = parse_lines("\nRice | 200 | g | in bowl\n\n");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn test_record_round_trip() {
        let records = vec![
            Record::new("Rice", 200.0, "g", "visible in bowl"),
            Record::new("Olive oil", 1.5, "tbsp", "dressing"),
        ];
        let rendered = render_lines(&records);
        assert_eq!(
            rendered,
            "Rice | 200 | g | visible in bowl\nOlive oil | 1.5 | tbsp | dressing"
        );
        let reparsed = parse_lines(&rendered);
        assert_eq!(reparsed.records, records);
        assert_eq!(reparsed.skipped, 0);
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(200.0), "200");
        assert_eq!(format_quantity(2.5), "2.5");
        assert_eq!(format_quantity(0.0), "0");
    }

    #[test]
    fn test_split_sections_with_headers() {
        let text = "Dish: chicken curry\n\
                    Visible ingredients:\n\
                    Chicken pieces | 150 | g | main protein\n\
                    Rice | 200 | g | side\n\
                    Hidden ingredients:\n\
                    Cooking oil | 2 | tbsp | frying\n\
                    Nutrition:\n\
                    Calories | 650 | kcal | curry plus rice";
        let split = split_sections(text);
        assert_eq!(split.dish_name, "Chicken curry");
        assert_eq!(
            split.visible,
            "Chicken pieces | 150 | g | main protein\nRice | 200 | g | side"
        );
        assert_eq!(split.hidden, "Cooking oil | 2 | tbsp | frying");
        assert_eq!(split.nutrition, "Calories | 650 | kcal | curry plus rice");
    }

    #[test]
    fn test_split_sections_first_line_is_dish_candidate() {
        let split = split_sections("margherita pizza\nVisible ingredients:\nMozzarella | 100 | g | topping");
        assert_eq!(split.dish_name, "Margherita pizza");
        assert_eq!(split.visible, "Mozzarella | 100 | g | topping");
    }

    #[test]
    fn test_split_sections_multi_dish_name_kept_as_is() {
        let split = split_sections("Dishes: chicken curry, basmati rice and naan\n");
        assert_eq!(split.dish_name, "chicken curry, basmati rice and naan");
    }

    #[test]
    fn test_split_sections_pre_header_rows_ignored_for_buckets() {
        // The first line becomes the dish candidate; later rows before any
        // header belong to no bucket.
        let text = "Pasta\nTomato | 50 | g | stray row\nHidden ingredients:\nSalt | 1 | tsp | seasoning";
        let split = split_sections(text);
        assert_eq!(split.dish_name, "Pasta");
        assert_eq!(split.visible, "");
        assert_eq!(split.hidden, "Salt | 1 | tsp | seasoning");
    }

    #[test]
    fn test_split_sections_header_case_insensitive() {
        let split = split_sections("Soup\nVISIBLE INGREDIENTS\nLeek | 30 | g | floating");
        assert_eq!(split.visible, "Leek | 30 | g | floating");
    }

    #[test]
    fn test_split_sections_markdown_noise_on_dish_line() {
        let split = split_sections("** Beef stew **\n");
        assert_eq!(split.dish_name, "Beef stew");
    }

    #[test]
    fn test_split_sections_empty_input() {
        assert_eq!(split_sections(""), SectionSplit::default());
        assert_eq!(split_sections("\n\n  \n"), SectionSplit::default());
    }

    #[test]
    fn test_ensure_required_nutrients_completes_missing() {
        let input = vec![Record::new("Calories", 300.0, "kcal", "estimate")];
        let output = ensure_required_nutrients(input);
        assert_eq!(output.len(), 7);
        assert_eq!(output[0], Record::new("Calories", 300.0, "kcal", "estimate"));
        for (name, unit) in &REQUIRED_NUTRIENTS[1..] {
            let synthesized = output
                .iter()
                .find(|r| r.name == *name)
                .unwrap_or_else(|| panic!("missing {}", name));
            assert_eq!(synthesized.quantity, 0.0);
            assert_eq!(synthesized.unit, *unit);
            assert_eq!(synthesized.reasoning, SENTINEL_REASONING);
        }
    }

    #[test]
    fn test_ensure_required_nutrients_empty_input_all_synthesized() {
        let output = ensure_required_nutrients(Vec::new());
        assert_eq!(output.len(), 7);
        assert!(output.iter().all(|r| r.reasoning == SENTINEL_REASONING));
    }

    #[test]
    fn test_ensure_required_nutrients_duplicate_last_wins() {
        let input = vec![
            Record::new("Calories", 300.0, "kcal", "first estimate"),
            Record::new("Protein", 20.0, "g", "from chicken"),
            Record::new("calories", 450.0, "kcal", "revised estimate"),
        ];
        let output = ensure_required_nutrients(input);
        assert_eq!(output.len(), 7);
        // Last occurrence wins but keeps the first-seen position.
        assert_eq!(output[0], Record::new("calories", 450.0, "kcal", "revised estimate"));
        assert_eq!(output[1].name, "Protein");
    }

    #[test]
    fn test_ensure_required_nutrients_preserves_extras() {
        let input = vec![
            Record::new("Saturated Fat", 4.0, "g", "from butter"),
            Record::new("Cholesterol", 60.0, "mg", "from eggs"),
        ];
        let output = ensure_required_nutrients(input);
        assert_eq!(output.len(), 9); // 2 extras + 7 required
        assert_eq!(output[0].name, "Saturated Fat");
    }

    #[test]
    fn test_ensure_required_nutrients_idempotent() {
        let input = vec![
            Record::new("Calories", 300.0, "kcal", "estimate"),
            Record::new("Sodium", 400.0, "mg", "from salt"),
        ];
        let once = ensure_required_nutrients(input);
        let reparsed = parse_lines(&render_lines(&once));
        assert_eq!(reparsed.skipped, 0);
        let twice = ensure_required_nutrients(reparsed.records);
        let names = |records: &[Record]| {
            let mut v: Vec<String> = records.iter().map(|r| r.name.to_lowercase()).collect();
            v.sort();
            v
        };
        assert_eq!(names(&once), names(&twice));
        assert_eq!(twice.len(), once.len());
    }
}
