//! Extraction of catalog sections from the front-page markup.
//!
//! The page is not well-formed enough to be worth a full HTML parser: each
//! section is introduced by an `<img alt="the guilds">` style heading that is
//! followed by a table whose `odd`/`even` rows hold `name | location` cells,
//! and a `<div class="next_change">` carries the countdown text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

lazy_static! {
    static ref IMG_ALT: Regex =
        Regex::new(r#"(?is)<img\b[^>]*?\balt\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#)
            .expect("img pattern");
    static ref TABLE: Regex = Regex::new(r"(?is)<table\b.*?</table\s*>").expect("table pattern");
    static ref TABLE_ROW: Regex =
        Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr\s*>").expect("row pattern");
    static ref ODD_EVEN: Regex =
        Regex::new(r#"(?i)\bclass\s*=\s*["'][^"']*\b(?:odd|even)\b"#).expect("class pattern");
    static ref TABLE_CELL: Regex =
        Regex::new(r"(?is)<td\b[^>]*>(.*?)</td\s*>").expect("cell pattern");
    static ref DIV: Regex = Regex::new(r"(?is)<div\b([^>]*)>(.*?)</div\s*>").expect("div pattern");
    static ref NEXT_CHANGE: Regex =
        Regex::new(r#"(?i)\bclass\s*=\s*["'][^"']*\bnext_change\b"#).expect("next_change pattern");
    static ref COUNTDOWN_TEXT: Regex =
        Regex::new(r"\d+\s+days?,\s+\d+h\s+\d+m\s+\d+s").expect("countdown pattern");
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").expect("tag pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace pattern");
}

const LOCATION_PREFIX: &str = "SE of ";
const LOCATION_SEPARATOR: &str = " and ";

/// A catalog section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Guilds,
    Shops,
}

impl Section {
    /// Alt text of the heading image that introduces the section's table.
    pub fn heading_alt(&self) -> &'static str {
        match self {
            Section::Guilds => "the guilds",
            Section::Shops => "the shops",
        }
    }

    /// Word that identifies the section's "next change" countdown.
    pub fn countdown_label(&self) -> &'static str {
        match self {
            Section::Guilds => "Guilds",
            Section::Shops => "Shops",
        }
    }

    pub fn all() -> [Section; 2] {
        [Section::Guilds, Section::Shops]
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.countdown_label())
    }
}

/// One `name | "<column> and <row>"` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub name: String,
    pub column: String,
    pub row: String,
}

/// A row whose location did not split into a column and a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedRow {
    pub name: String,
    pub location: String,
}

/// Everything extracted for one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionData {
    /// Rows with a usable location, in page order.
    pub rows: Vec<CatalogRow>,

    /// Rows that were skipped because the location could not be split.
    pub malformed: Vec<MalformedRow>,

    /// Text of the section's countdown div, if one was found.
    pub countdown: Option<String>,
}

/// A parsed catalog page.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    sections: HashMap<Section, SectionData>,
}

impl CatalogPage {
    /// Parse the page markup. Sections whose heading is absent are omitted.
    pub fn parse(markup: &str) -> Self {
        let countdowns = extract_countdowns(markup);

        let mut sections = HashMap::new();
        for section in Section::all() {
            let Some(mut data) = extract_section(markup, section) else {
                warn!(section = %section, "no catalog table found");
                continue;
            };
            data.countdown = section_countdown(&countdowns, section);
            debug!(
                section = %section,
                rows = data.rows.len(),
                malformed = data.malformed.len(),
                "parsed catalog section"
            );
            sections.insert(section, data);
        }

        Self { sections }
    }

    /// Data for a section, if its heading was present.
    pub fn section(&self, section: Section) -> Option<&SectionData> {
        self.sections.get(&section)
    }

    /// Consume the page, taking one section's data.
    pub fn into_section(mut self, section: Section) -> Option<SectionData> {
        self.sections.remove(&section)
    }
}

/// Split a free-text location such as `"SE of Pessimism and 66th"` into
/// `(column, row)`.
pub(crate) fn split_location(location: &str) -> Option<(String, String)> {
    let cleaned = location.replace(LOCATION_PREFIX, "");
    let parts: Vec<&str> = cleaned.trim().split(LOCATION_SEPARATOR).collect();
    match parts.as_slice() {
        [column, row] if !column.trim().is_empty() && !row.trim().is_empty() => {
            Some((column.trim().to_string(), row.trim().to_string()))
        }
        _ => None,
    }
}

fn extract_section(markup: &str, section: Section) -> Option<SectionData> {
    let heading_end = IMG_ALT.captures_iter(markup).find_map(|caps| {
        let alt = caps.get(1).or_else(|| caps.get(2))?;
        let whole = caps.get(0)?;
        alt.as_str()
            .trim()
            .eq_ignore_ascii_case(section.heading_alt())
            .then_some(whole.end())
    })?;

    let table = TABLE.find_at(markup, heading_end)?;
    let mut data = SectionData::default();

    for caps in TABLE_ROW.captures_iter(table.as_str()) {
        let attributes = caps.get(1).map_or("", |m| m.as_str());
        if !ODD_EVEN.is_match(attributes) {
            continue;
        }
        let body = caps.get(2).map_or("", |m| m.as_str());
        let cells: Vec<String> = TABLE_CELL
            .captures_iter(body)
            .filter_map(|cell| cell.get(1).map(|m| cell_text(m.as_str())))
            .collect();

        if cells.len() < 2 {
            debug!(section = %section, "skipping row with fewer than two cells");
            continue;
        }

        let name = cells[0].clone();
        let location = cells[1].clone();
        match split_location(&location) {
            Some((column, row)) => data.rows.push(CatalogRow { name, column, row }),
            None => {
                warn!(section = %section, name = %name, location = %location, "unexpected location format");
                data.malformed.push(MalformedRow { name, location });
            }
        }
    }

    Some(data)
}

/// First countdown div for the section that carries a time, falling back to
/// the first one that mentions it at all.
fn section_countdown(countdowns: &[String], section: Section) -> Option<String> {
    let mut labelled = countdowns
        .iter()
        .filter(|text| text.contains(section.countdown_label()));
    let first = labelled.next()?;
    let timed = std::iter::once(first)
        .chain(labelled)
        .find(|text| COUNTDOWN_TEXT.is_match(text))
        .unwrap_or(first);
    Some(timed.clone())
}

fn extract_countdowns(markup: &str) -> Vec<String> {
    DIV.captures_iter(markup)
        .filter(|caps| caps.get(1).is_some_and(|m| NEXT_CHANGE.is_match(m.as_str())))
        .filter_map(|caps| caps.get(2).map(|m| cell_text(m.as_str())))
        .collect()
}

fn cell_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
