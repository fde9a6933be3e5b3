//! Heuristic mapping from export rows to [`ProductRecord`]s.
//!
//! Storefront exports carry the same facts in several loosely maintained
//! columns: the product title encodes brand, door style, cabinet type and
//! dimensions; the short description sometimes repeats the dimensions in an
//! explicit `Width: 12 Height: 30 Door: 2` form; tags may carry a door marker.
//! Every canonical field is resolved by trying its candidate sources in a fixed
//! priority order and falling back to a default.
//!
//! # Resolution order
//!
//! | Field        | Candidates (first usable wins)                                   | Default      |
//! |--------------|------------------------------------------------------------------|--------------|
//! | brand        | title pattern                                                    | config brand |
//! | door style   | tag marker, `Door: n` → "n Door", title style words              | `Shaker`     |
//! | width/height | description `Width:`/`Height:`, title `9W X 30H` suffix          | 0            |
//! | doors        | description `Door: n`                                            | 1            |
//! | retail price | `Regular price`, `Sale price`                                    | 0            |
//! | weight       | `Weight (lbs)`, description `Weight:`                            | 0            |
//! | species      | `Meta: species`                                                  | config       |
//!
//! The mapper never fails on bad content. The only rejection is a row without
//! a SKU, which yields `None`.

use crate::config::MapperConfig;
use crate::import::parser::RawRow;
use crate::import::record::ProductRecord;
use regex::Regex;
use std::sync::OnceLock;

pub const NAME_COLUMN: &str = "Name";
pub const SHORT_DESCRIPTION_COLUMN: &str = "Short description";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const TAGS_COLUMN: &str = "Tags";
pub const CATEGORIES_COLUMN: &str = "Categories";
pub const IMAGES_COLUMN: &str = "Images";
pub const PUBLISHED_COLUMN: &str = "Published";
pub const WEIGHT_COLUMN: &str = "Weight (lbs)";
/// Price columns in priority order.
pub const PRICE_COLUMNS: [&str; 2] = ["Regular price", "Sale price"];

pub const META_ASSEMBLY_FEE: &str = "assembly_fee";
pub const META_ASSEMBLY_COST: &str = "assembly_cost";
pub const META_SPECIES: &str = "species";

/// Literal the export uses for a published product.
pub const PUBLISHED_SENTINEL: &str = "1";
pub const DEFAULT_DOOR_STYLE: &str = "Shaker";
pub const DEFAULT_DOORS: u32 = 1;

static TITLE_REGEX: OnceLock<Regex> = OnceLock::new();
static TITLE_DIMENSIONS_REGEX: OnceLock<Regex> = OnceLock::new();
static DOUBLE_DOOR_REGEX: OnceLock<Regex> = OnceLock::new();
static SINGLE_DOOR_REGEX: OnceLock<Regex> = OnceLock::new();
static DOOR_COUNT_REGEX: OnceLock<Regex> = OnceLock::new();
static WIDTH_REGEX: OnceLock<Regex> = OnceLock::new();
static HEIGHT_REGEX: OnceLock<Regex> = OnceLock::new();
static WEIGHT_REGEX: OnceLock<Regex> = OnceLock::new();

/// `<brand> <style words> <category> Cabinet ...`
fn title_regex() -> &'static Regex {
    TITLE_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(?P<brand>\S+)\s+(?P<style>.+?)\s+(?P<category>\S+)\s+(?i:cabinet)\b")
            .expect("Invalid title regex")
    })
}

/// `9W X 30H`, `12.5 w x 34.5 h`
fn title_dimensions_regex() -> &'static Regex {
    TITLE_DIMENSIONS_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*W\s*X\s*(\d+(?:\.\d+)?)\s*H\b")
            .expect("Invalid title dimensions regex")
    })
}

fn double_door_regex() -> &'static Regex {
    DOUBLE_DOOR_REGEX
        .get_or_init(|| Regex::new(r"(?i)\bdouble[\s-]?door").expect("Invalid double door regex"))
}

fn single_door_regex() -> &'static Regex {
    SINGLE_DOOR_REGEX
        .get_or_init(|| Regex::new(r"(?i)\bsingle[\s-]?door").expect("Invalid single door regex"))
}

fn door_count_regex() -> &'static Regex {
    DOOR_COUNT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bdoors?:\s*(\d+(?:\.\d+)?)").expect("Invalid door count regex")
    })
}

fn width_regex() -> &'static Regex {
    WIDTH_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bwidth:\s*(\d+(?:\.\d+)?)").expect("Invalid width regex")
    })
}

fn height_regex() -> &'static Regex {
    HEIGHT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bheight:\s*(\d+(?:\.\d+)?)").expect("Invalid height regex")
    })
}

fn weight_regex() -> &'static Regex {
    WEIGHT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bweight:\s*(\d+(?:\.\d+)?)").expect("Invalid weight regex")
    })
}

/// Labelled numeric entries recognised in descriptive text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionField {
    Width,
    Height,
    Weight,
}

impl DescriptionField {
    fn regex(self) -> &'static Regex {
        match self {
            DescriptionField::Width => width_regex(),
            DescriptionField::Height => height_regex(),
            DescriptionField::Weight => weight_regex(),
        }
    }
}

/// Brand, style and category words taken from a structured title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleParts {
    pub brand: String,
    pub style: String,
    pub category: String,
}

/// Match the structured title pattern. `None` for free-form titles.
pub fn parse_title(title: &str) -> Option<TitleParts> {
    let caps = title_regex().captures(title)?;
    Some(TitleParts {
        brand: caps.name("brand")?.as_str().to_string(),
        style: caps.name("style")?.as_str().trim().to_string(),
        category: caps.name("category")?.as_str().to_string(),
    })
}

/// `(width, height)` from a compact `<n>W X <n>H` title suffix.
pub fn title_dimensions(title: &str) -> Option<(f64, f64)> {
    let caps = title_dimensions_regex().captures(title)?;
    let width = parse_number(caps.get(1)?.as_str())?;
    let height = parse_number(caps.get(2)?.as_str())?;
    Some((width, height))
}

/// Value of an explicit `Width:`, `Height:` or `Weight:` entry in descriptive text.
pub fn description_number(text: &str, field: DescriptionField) -> Option<f64> {
    field
        .regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_number(m.as_str()))
}

/// Door count from an explicit `Door: <integer>` entry.
pub fn description_doors(text: &str) -> Option<u32> {
    door_count_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Explicit door label forced by a tag marker.
pub fn tag_door_style(tags: &str) -> Option<&'static str> {
    if double_door_regex().is_match(tags) {
        Some("Double Door")
    } else if single_door_regex().is_match(tags) {
        Some("Single Door")
    } else {
        None
    }
}

/// Lenient number parse: trims, drops currency symbols and thousands separators.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// First trimmed entry of a comma separated image list.
pub fn first_image(images: &str) -> String {
    images
        .split(',')
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or("")
        .to_string()
}

fn meta_column(key: &str) -> String {
    format!("Meta: {key}")
}

fn meta_number(row: &RawRow, key: &str) -> Option<f64> {
    parse_number(row.get(&meta_column(key)))
}

/// Maps [`RawRow`]s to [`ProductRecord`]s with a fixed set of process defaults.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    config: MapperConfig,
}

impl FieldMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Derive `(primary, secondary)` SKUs from the source SKU.
    ///
    /// The source prefix is replaced by each target prefix; a SKU without the
    /// source prefix gets the target prefixes prepended to the whole value.
    pub fn derive_skus(&self, source_sku: &str) -> (String, String) {
        let source = source_sku.trim();
        let stem = source
            .strip_prefix(self.config.source_sku_prefix.as_str())
            .unwrap_or(source);
        (
            format!("{}{}", self.config.primary_sku_prefix, stem),
            format!("{}{}", self.config.secondary_sku_prefix, stem),
        )
    }

    /// Map one row, or `None` when it has no SKU.
    pub fn map_row(&self, row: &RawRow) -> Option<ProductRecord> {
        let sku = row.sku()?;
        let (primary_sku, secondary_sku) = self.derive_skus(sku);

        let title = row.get(NAME_COLUMN);
        let description = row
            .non_empty(SHORT_DESCRIPTION_COLUMN)
            .or_else(|| row.non_empty(DESCRIPTION_COLUMN))
            .unwrap_or("");
        let tags = row.get(TAGS_COLUMN);

        let title_parts = parse_title(title);
        let title_dims = title_dimensions(title);
        let explicit_doors = description_doors(description);

        let door_style = tag_door_style(tags)
            .map(str::to_string)
            .or_else(|| explicit_doors.map(|count| format!("{count} Door")))
            .or_else(|| title_parts.as_ref().map(|parts| parts.style.clone()))
            .unwrap_or_else(|| DEFAULT_DOOR_STYLE.to_string());

        let width = description_number(description, DescriptionField::Width)
            .or(title_dims.map(|(width, _)| width))
            .unwrap_or(0.0);
        let height = description_number(description, DescriptionField::Height)
            .or(title_dims.map(|(_, height)| height))
            .unwrap_or(0.0);

        let retail_price = PRICE_COLUMNS
            .iter()
            .find_map(|column| parse_number(row.get(column)))
            .unwrap_or(0.0);

        let weight = parse_number(row.get(WEIGHT_COLUMN))
            .or_else(|| description_number(description, DescriptionField::Weight))
            .unwrap_or(0.0);

        let species = row
            .non_empty(&meta_column(META_SPECIES))
            .map(str::to_string)
            .unwrap_or_else(|| self.config.default_species.clone());

        let low_confidence = title_parts.is_none();
        if low_confidence {
            log::trace!(
                "line {}: title `{}` does not match the structured pattern, using defaults",
                row.line(),
                title
            );
        }
        let (brand, cabinet_type) = match title_parts {
            Some(parts) => (parts.brand, parts.category),
            None => (self.config.fallback_brand.clone(), String::new()),
        };

        Some(ProductRecord {
            primary_sku,
            secondary_sku,
            brand,
            door_style,
            cabinet_type,
            discount: self.config.discount,
            cost_factor: self.config.cost_factor,
            assembly_fee: meta_number(row, META_ASSEMBLY_FEE).unwrap_or(0.0),
            assembly_cost: meta_number(row, META_ASSEMBLY_COST).unwrap_or(0.0),
            retail_price,
            discount_price: 0.0,
            height,
            width,
            weight,
            doors: explicit_doors.unwrap_or(DEFAULT_DOORS),
            species,
            image_path: first_image(row.get(IMAGES_COLUMN)),
            categories: row.get(CATEGORIES_COLUMN).to_string(),
            tags: tags.to_string(),
            publish: row.get(PUBLISHED_COLUMN).trim() == PUBLISHED_SENTINEL,
            low_confidence,
        })
    }

    /// Map every row in order, dropping rows without a SKU.
    pub fn map_rows(&self, rows: &[RawRow]) -> Vec<ProductRecord> {
        rows.iter().filter_map(|row| self.map_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MapperConfig {
        MapperConfig {
            discount: 0.0,
            cost_factor: 1.0,
            default_species: "Birch".to_string(),
            fallback_brand: "Generic".to_string(),
            source_sku_prefix: "AZ-".to_string(),
            primary_sku_prefix: "W-".to_string(),
            secondary_sku_prefix: "V-".to_string(),
        }
    }

    fn mapper() -> FieldMapper {
        FieldMapper::new(config())
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow::from_pairs(2, pairs.iter().copied())
    }

    #[test]
    fn maps_structured_title() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-123"),
                ("Name", "Acme Shaker Wall Cabinet 9W X 30H"),
            ]))
            .unwrap();

        assert_eq!(record.primary_sku, "W-123");
        assert_eq!(record.secondary_sku, "V-123");
        assert_eq!(record.brand, "Acme");
        assert_eq!(record.cabinet_type, "Wall");
        assert_eq!(record.width, 9.0);
        assert_eq!(record.height, 30.0);
        assert_eq!(record.door_style, "Shaker");
        assert_eq!(record.doors, 1);
        assert!(!record.low_confidence);
    }

    #[test]
    fn multi_word_styles_are_kept() {
        let parts = parse_title("Acme White Shaker Base Cabinet 12W X 34.5H").unwrap();
        assert_eq!(parts.brand, "Acme");
        assert_eq!(parts.style, "White Shaker");
        assert_eq!(parts.category, "Base");
        assert_eq!(
            title_dimensions("Acme White Shaker Base Cabinet 12W X 34.5H"),
            Some((12.0, 34.5))
        );
    }

    #[test]
    fn row_without_sku_is_rejected() {
        let mapper = mapper();
        assert!(mapper.map_row(&row(&[("SKU", ""), ("Name", "Acme Shaker Wall Cabinet")])).is_none());
        assert!(mapper.map_row(&row(&[("Name", "No SKU column")])).is_none());

        let rows = vec![row(&[("SKU", "   ")]), row(&[("SKU", "AZ-1")])];
        assert_eq!(mapper.map_rows(&rows).len(), 1);
    }

    #[test]
    fn explicit_description_overrides_title() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-55"),
                ("Name", "Acme Shaker Wall Cabinet 9W X 30H"),
                ("Short description", "Width: 12 Height: 33 Door: 2"),
            ]))
            .unwrap();

        assert_eq!(record.width, 12.0);
        assert_eq!(record.height, 33.0);
        assert_eq!(record.doors, 2);
        assert_eq!(record.door_style, "2 Door");
    }

    #[test]
    fn explicit_fields_override_independently() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-56"),
                ("Name", "Acme Shaker Wall Cabinet 9W X 30H"),
                ("Short description", "Height: 36"),
            ]))
            .unwrap();

        assert_eq!(record.width, 9.0);
        assert_eq!(record.height, 36.0);
    }

    #[test]
    fn description_falls_back_to_long_description() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-57"),
                ("Short description", ""),
                ("Description", "Width: 15"),
            ]))
            .unwrap();
        assert_eq!(record.width, 15.0);
    }

    #[test]
    fn tag_marker_wins_over_door_count() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-9"),
                ("Name", "Acme Shaker Wall Cabinet 30W X 30H"),
                ("Tags", "Wall, Double-Door"),
                ("Short description", "Door: 2"),
            ]))
            .unwrap();
        assert_eq!(record.door_style, "Double Door");

        assert_eq!(tag_door_style("single door, base"), Some("Single Door"));
        assert_eq!(tag_door_style("wall"), None);
    }

    #[test]
    fn non_numeric_door_defaults_to_one() {
        assert_eq!(description_doors("Door: two"), None);
        assert_eq!(description_doors("Door: 2.5"), None);
        assert_eq!(description_doors("Doors: 3"), Some(3));

        let record = mapper()
            .map_row(&row(&[("SKU", "AZ-10"), ("Short description", "Door: many")]))
            .unwrap();
        assert_eq!(record.doors, 1);
        assert_eq!(record.door_style, DEFAULT_DOOR_STYLE);
    }

    #[test]
    fn unmatched_title_uses_fallbacks() {
        let record = mapper()
            .map_row(&row(&[("SKU", "AZ-11"), ("Name", "Filler strip")]))
            .unwrap();

        assert_eq!(record.brand, "Generic");
        assert_eq!(record.door_style, DEFAULT_DOOR_STYLE);
        assert_eq!(record.cabinet_type, "");
        assert_eq!(record.width, 0.0);
        assert!(record.low_confidence);
    }

    #[test]
    fn retail_price_precedence() {
        let mapper = mapper();
        let regular = mapper
            .map_row(&row(&[("SKU", "AZ-1"), ("Regular price", "199.99"), ("Sale price", "150")]))
            .unwrap();
        assert_eq!(regular.retail_price, 199.99);

        let sale_only = mapper
            .map_row(&row(&[("SKU", "AZ-2"), ("Regular price", "call us"), ("Sale price", "$1,150")]))
            .unwrap();
        assert_eq!(sale_only.retail_price, 1150.0);

        let neither = mapper.map_row(&row(&[("SKU", "AZ-3")])).unwrap();
        assert_eq!(neither.retail_price, 0.0);
        assert_eq!(neither.discount_price, 0.0);
    }

    #[test]
    fn weight_and_meta_fields() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-4"),
                ("Weight (lbs)", "42.5"),
                ("Meta: assembly_fee", "35"),
                ("Meta: assembly_cost", "n/a"),
                ("Meta: species", "Maple"),
            ]))
            .unwrap();

        assert_eq!(record.weight, 42.5);
        assert_eq!(record.assembly_fee, 35.0);
        assert_eq!(record.assembly_cost, 0.0);
        assert_eq!(record.species, "Maple");

        let fallback = mapper()
            .map_row(&row(&[("SKU", "AZ-5"), ("Short description", "Weight: 18")]))
            .unwrap();
        assert_eq!(fallback.weight, 18.0);
        assert_eq!(fallback.species, "Birch");
    }

    #[test]
    fn images_publish_and_pass_through() {
        let record = mapper()
            .map_row(&row(&[
                ("SKU", "AZ-6"),
                ("Images", " https://cdn/a.jpg , https://cdn/b.jpg"),
                ("Published", "1"),
                ("Categories", "Kitchen > Wall"),
                ("Tags", "wall"),
            ]))
            .unwrap();

        assert_eq!(record.image_path, "https://cdn/a.jpg");
        assert!(record.publish);
        assert_eq!(record.categories, "Kitchen > Wall");
        assert_eq!(record.tags, "wall");

        let hidden = mapper()
            .map_row(&row(&[("SKU", "AZ-7"), ("Published", "-1")]))
            .unwrap();
        assert!(!hidden.publish);
        assert_eq!(hidden.image_path, "");
    }

    #[test]
    fn skus_share_one_stem() {
        let mapper = mapper();
        for source in ["AZ-123", "  AZ-9-X ", "B-77", "AZ-"] {
            let (primary, secondary) = mapper.derive_skus(source);
            assert_eq!(primary.strip_prefix("W-"), secondary.strip_prefix("V-"));
        }
        assert_eq!(mapper.derive_skus("B-77"), ("W-B-77".to_string(), "V-B-77".to_string()));
    }

    #[test]
    fn mapping_is_deterministic() {
        let mapper = mapper();
        let input = row(&[
            ("SKU", "AZ-8"),
            ("Name", "Acme Raised Panel Tall Cabinet 18W X 84H"),
            ("Tags", "pantry"),
            ("Short description", "Door: 4"),
        ]);
        assert_eq!(mapper.map_row(&input), mapper.map_row(&input));
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number("$1,299.50"), Some(1299.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn labelled_description_numbers() {
        let text = "Width: 15 HEIGHT: 34.5 weight:22 Doors: 2";
        assert_eq!(description_number(text, DescriptionField::Width), Some(15.0));
        assert_eq!(description_number(text, DescriptionField::Height), Some(34.5));
        assert_eq!(description_number(text, DescriptionField::Weight), Some(22.0));
        assert_eq!(description_number("Overall width 15", DescriptionField::Width), None);
        assert_eq!(description_number("Width: n/a", DescriptionField::Width), None);
    }
}
