//! Field extraction from rendered wiki page HTML.
//!
//! Pages carry a loosely structured `<table class="infobox">` of header/value
//! rows. Every field degrades to `None` independently; nothing here fails.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static INFOBOX: LazyLock<Selector> = LazyLock::new(|| selector("table.infobox"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static VALUE_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));

const VALUE_SEPARATOR: &str = ", ";

/// Item-specific view of the two catalog fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFields {
    pub ingredients: Option<String>,
    pub obtaining_method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterFields {
    pub perks: Option<String>,
    pub description: Option<String>,
}

/// Catalog-neutral extractor output consumed by the ingest pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub field_a: Option<String>,
    pub field_b: Option<String>,
}

impl From<ItemFields> for EntryFields {
    fn from(fields: ItemFields) -> Self {
        Self {
            field_a: fields.ingredients,
            field_b: fields.obtaining_method,
        }
    }
}

impl From<CharacterFields> for EntryFields {
    fn from(fields: CharacterFields) -> Self {
        Self {
            field_a: fields.perks,
            field_b: fields.description,
        }
    }
}

pub fn extract_item_fields(html: &str) -> ItemFields {
    let document = Html::parse_document(html);
    let mut fields = ItemFields::default();

    for (header, value) in infobox_rows(&document) {
        if header.contains("ingredient") {
            fields.ingredients = Some(value);
        } else if header.contains("obtain") || header.contains("gather") {
            fields.obtaining_method = Some(value);
        }
    }

    fields
}

pub fn extract_character_fields(html: &str) -> CharacterFields {
    let document = Html::parse_document(html);
    let mut fields = CharacterFields::default();

    for (header, value) in infobox_rows(&document) {
        if header.contains("perk") || header.contains("ability") {
            fields.perks = Some(value);
        }
    }

    fields.description = document
        .select(&PARAGRAPH)
        .next()
        .map(|paragraph| paragraph.text().collect::<String>().trim().to_string());

    fields
}

pub fn extract_item_entry(html: &str) -> EntryFields {
    extract_item_fields(html).into()
}

pub fn extract_character_entry(html: &str) -> EntryFields {
    extract_character_fields(html).into()
}

/// `(normalized header, joined value)` for each row of the first infobox
/// that has both a header cell and a value cell, in document order.
fn infobox_rows(document: &Html) -> Vec<(String, String)> {
    let Some(infobox) = document.select(&INFOBOX).next() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for row in infobox.select(&ROW) {
        let header = row.select(&HEADER_CELL).next();
        let value = row.select(&VALUE_CELL).next();
        if let (Some(header), Some(value)) = (header, value) {
            let header_text = header.text().collect::<String>().trim().to_lowercase();
            rows.push((header_text, joined_text(value)));
        }
    }
    rows
}

fn joined_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(VALUE_SEPARATOR)
}

fn selector(css: &str) -> Selector {
    // Static selectors only; a parse failure is a programming error.
    Selector::parse(css).unwrap_or_else(|error| panic!("invalid selector {css}: {error}"))
}

#[cfg(test)]
mod tests {
    use super::{
        EntryFields, extract_character_entry, extract_character_fields, extract_item_fields,
    };

    const ITEM_PAGE: &str = r#"
        <html>
        <body>
            <table class="infobox">
                <tr>
                    <th>Ingredients</th>
                    <td>Wood, Stone, Gold</td>
                </tr>
                <tr>
                    <th>Obtained From</th>
                    <td>Crafting, Mining</td>
                </tr>
            </table>
        </body>
        </html>
    "#;

    #[test]
    fn item_infobox_rows_are_classified_by_header() {
        let fields = extract_item_fields(ITEM_PAGE);
        assert_eq!(fields.ingredients.as_deref(), Some("Wood, Stone, Gold"));
        assert_eq!(fields.obtaining_method.as_deref(), Some("Crafting, Mining"));
    }

    #[test]
    fn value_children_are_joined_with_comma_separator() {
        let html = r#"
            <table class="wikitable infobox">
                <tr><th> INGREDIENTS </th><td>
                    <a href="/Twigs">Twigs</a>
                    <a href="/Flint">Flint</a>
                    <span>x2</span>
                </td></tr>
            </table>
        "#;
        let fields = extract_item_fields(html);
        assert_eq!(fields.ingredients.as_deref(), Some("Twigs, Flint, x2"));
        assert_eq!(fields.obtaining_method, None);
    }

    #[test]
    fn gather_header_maps_to_obtaining_method() {
        let html = r#"<table class="infobox"><tr><th>Gathered from</th><td>Berry Bush</td></tr></table>"#;
        let fields = extract_item_fields(html);
        assert_eq!(fields.obtaining_method.as_deref(), Some("Berry Bush"));
    }

    #[test]
    fn missing_infobox_yields_absent_fields() {
        let html = r#"<table class="navbox"><tr><th>Ingredients</th><td>Silk</td></tr></table>"#;
        let fields = extract_item_fields(html);
        assert_eq!(fields.ingredients, None);
        assert_eq!(fields.obtaining_method, None);

        let fields = extract_item_fields("");
        assert_eq!(fields.ingredients, None);
    }

    #[test]
    fn rows_without_both_cells_are_ignored() {
        let html = r#"
            <table class="infobox">
                <tr><th>Ingredients</th></tr>
                <tr><td>Orphan value</td></tr>
            </table>
        "#;
        let fields = extract_item_fields(html);
        assert_eq!(fields.ingredients, None);
    }

    #[test]
    fn last_matching_row_wins() {
        let html = r#"
            <table class="infobox">
                <tr><th>Ingredients</th><td>Cut Grass</td></tr>
                <tr><th>Ingredients (Shipwrecked)</th><td>Palm Leaf</td></tr>
            </table>
        "#;
        let fields = extract_item_fields(html);
        assert_eq!(fields.ingredients.as_deref(), Some("Palm Leaf"));
    }

    #[test]
    fn only_the_first_infobox_is_read() {
        let html = r#"
            <table class="infobox"><tr><th>Perks</th><td>Strong</td></tr></table>
            <table class="infobox"><tr><th>Perks</th><td>Weak</td></tr></table>
        "#;
        let fields = extract_character_fields(html);
        assert_eq!(fields.perks.as_deref(), Some("Strong"));
    }

    #[test]
    fn character_perks_and_first_paragraph_description() {
        let html = r#"
            <table class="infobox">
                <tr><th>Special Ability</th><td><ul><li>Mighty</li><li>Hungry</li></ul></td></tr>
            </table>
            <p>  Wolfgang is a <b>strong</b> character.  </p>
            <p>Second paragraph.</p>
        "#;
        let fields = extract_character_fields(html);
        assert_eq!(fields.perks.as_deref(), Some("Mighty, Hungry"));
        assert_eq!(
            fields.description.as_deref(),
            Some("Wolfgang is a strong character.")
        );
    }

    #[test]
    fn description_is_absent_without_paragraph() {
        let html = r#"<table class="infobox"><tr><th>Perks</th><td>Sanity aura</td></tr></table>"#;
        let fields = extract_character_fields(html);
        assert_eq!(fields.perks.as_deref(), Some("Sanity aura"));
        assert_eq!(fields.description, None);
    }

    #[test]
    fn blank_first_paragraph_gives_empty_description() {
        let fields = extract_character_fields("<p>   </p><p>Second</p>");
        assert_eq!(fields.description.as_deref(), Some(""));
    }

    #[test]
    fn description_is_read_without_infobox() {
        let fields = extract_character_fields("<div><p>Only text.</p></div>");
        assert_eq!(fields.perks, None);
        assert_eq!(fields.description.as_deref(), Some("Only text."));
    }

    #[test]
    fn entry_conversion_maps_character_fields_in_order() {
        let entry = extract_character_entry(
            r#"<table class="infobox"><tr><th>Perk</th><td>Fire starter</td></tr></table><p>Willow.</p>"#,
        );
        assert_eq!(
            entry,
            EntryFields {
                field_a: Some("Fire starter".to_string()),
                field_b: Some("Willow.".to_string()),
            }
        );
    }
}
