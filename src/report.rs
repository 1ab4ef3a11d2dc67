use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use genpdf::elements::{Break, FrameCellDecorator, PageBreak, Paragraph, TableLayout};
use genpdf::style::{Color, Style};
use genpdf::{fonts, Alignment, Document, Element, SimplePageDecorator};
use serde::Deserialize;
use serde_json::Value;

pub const TABLE_HEADER: [&str; 5] = ["Person ID", "Entry", "Exit", "Direction", "Speed"];

const REPORT_TITLE: &str = "Video Analysis Report";
const FONT_FAMILY: &str = "LiberationSans";
const HEADER_COLOR: Color = Color::Rgb(26, 115, 232);

/// Per-person attributes consumed by the table section. Direction and speed
/// may be absent and may arrive as strings or numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonRow {
    pub person_id: i64,
    pub entry_frame: i64,
    pub exit_frame: i64,
    #[serde(default)]
    pub dominant_direction: Option<Value>,
    #[serde(default)]
    pub avg_speed: Option<Value>,
}

fn cell_text(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Builds the table body in render order: one row per person, ordered by
/// numeric person id, every value coerced to text. Pure, so identical inputs
/// always produce identical rows.
pub fn table_rows(people: &HashMap<String, PersonRow>) -> Vec<[String; 5]> {
    let mut rows: Vec<&PersonRow> = people.values().collect();
    rows.sort_unstable_by_key(|row| row.person_id);
    rows.into_iter()
        .map(|info| {
            [
                info.person_id.to_string(),
                info.entry_frame.to_string(),
                info.exit_frame.to_string(),
                cell_text(&info.dominant_direction),
                cell_text(&info.avg_speed),
            ]
        })
        .collect()
}

fn heading(text: &str) -> impl Element {
    Paragraph::new(text).styled(Style::new().bold().with_font_size(14))
}

/// Renders the paginated report: title, prose summary (one paragraph per input
/// line), a forced page break, then the per-person table. Styling is a fixed
/// presentation choice; overflow pagination is left to the underlying
/// renderer.
pub fn render_report(
    summary_text: &str,
    people: &HashMap<String, PersonRow>,
    font_dir: &Path,
    output: &Path,
) -> Result<()> {
    let font_family = fonts::from_files(font_dir, FONT_FAMILY, None)
        .with_context(|| format!("failed to load {FONT_FAMILY} from {}", font_dir.display()))?;

    let mut doc = Document::new(font_family);
    doc.set_title(REPORT_TITLE);
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    doc.push(
        Paragraph::new(REPORT_TITLE)
            .aligned(Alignment::Center)
            .styled(Style::new().bold().with_font_size(18)),
    );
    doc.push(Break::new(2));

    doc.push(heading("Summary"));
    doc.push(Break::new(1));
    for line in summary_text.lines() {
        doc.push(Paragraph::new(line));
        doc.push(Break::new(1));
    }

    doc.push(PageBreak::new());

    doc.push(heading("Person-wise Table"));
    doc.push(Break::new(1));

    let mut table = TableLayout::new(vec![7, 7, 7, 9, 9]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, true));

    let header_style = Style::new().bold().with_font_size(9).with_color(HEADER_COLOR);
    let mut header = table.row();
    for cell in TABLE_HEADER {
        header.push_element(
            Paragraph::new(cell)
                .aligned(Alignment::Center)
                .styled(header_style),
        );
    }
    header.push().context("failed to lay out the table header")?;

    let body_style = Style::new().with_font_size(9);
    for cells in table_rows(people) {
        let mut row = table.row();
        for cell in cells {
            row.push_element(
                Paragraph::new(cell)
                    .aligned(Alignment::Center)
                    .styled(body_style),
            );
        }
        row.push().context("failed to lay out a table row")?;
    }
    doc.push(table);

    doc.render_to_file(output)
        .with_context(|| format!("failed to write {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: i64, entry: i64, exit: i64) -> PersonRow {
        PersonRow {
            person_id: id,
            entry_frame: entry,
            exit_frame: exit,
            dominant_direction: None,
            avg_speed: None,
        }
    }

    #[test]
    fn missing_attributes_render_as_unknown() {
        let mut people = HashMap::new();
        people.insert("1".to_string(), person(1, 0, 10));

        let rows = table_rows(&people);
        assert_eq!(rows, vec![["1", "0", "10", "unknown", "unknown"].map(String::from)]);
    }

    #[test]
    fn rows_are_ordered_by_numeric_person_id() {
        let mut people = HashMap::new();
        people.insert("10".to_string(), person(10, 5, 9));
        people.insert("2".to_string(), person(2, 1, 3));

        let ids: Vec<String> = table_rows(&people).into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec!["2", "10"]);
    }

    #[test]
    fn attribute_values_are_coerced_to_text() {
        let raw = r#"{
            "4": {
                "person_id": 4,
                "entry_frame": 12,
                "exit_frame": 88,
                "dominant_direction": "left",
                "avg_speed": 2.5
            }
        }"#;
        let people: HashMap<String, PersonRow> = serde_json::from_str(raw).unwrap();

        let rows = table_rows(&people);
        assert_eq!(rows[0][3], "left");
        assert_eq!(rows[0][4], "2.5");
    }

    #[test]
    fn row_building_is_idempotent() {
        let mut people = HashMap::new();
        people.insert("1".to_string(), person(1, 0, 10));
        people.insert("2".to_string(), person(2, 4, 20));

        assert_eq!(table_rows(&people), table_rows(&people));
    }
}
