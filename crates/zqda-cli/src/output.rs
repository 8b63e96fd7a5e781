use serde_json::Value;

use zqda_core::domain::links::translate_zotero_uri;
use zqda_core::domain::Record;
use zqda_sync::AnnotationEntry;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

// ============================================================================
// Record rendering helpers
// ============================================================================

/// Short display title: `title`, then `name`, then the record type
pub fn record_title(record: &Record) -> String {
    let data = record.data();
    ["title", "name", "annotationText"]
        .iter()
        .filter_map(|field| data.get(*field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("[{}]", record.item_type()))
}

/// One line per record for listings
pub fn record_line(record: &Record) -> String {
    format!(
        "{:<10} {:<16} {}",
        record.key(),
        record.item_type(),
        record_title(record)
    )
}

/// Local paths of the items a record is related to
///
/// Reads `relations` (predicate → URI or list of URIs) and rewrites group
/// item URIs into `/<library>/item/<key>`.
pub fn related_links(record: &Record) -> Vec<String> {
    let Some(relations) = record.data().get("relations").and_then(Value::as_object) else {
        return Vec::new();
    };

    relations
        .values()
        .flat_map(|value| match value {
            Value::String(uri) => vec![uri.as_str()],
            Value::Array(uris) => uris.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        })
        .map(|uri| translate_zotero_uri(uri).into_owned())
        .collect()
}

/// Multi-line description of one record
pub fn record_details(record: &Record) -> Vec<String> {
    let mut lines = vec![
        format!("Key:         {}", record.key()),
        format!("Type:        {}", record.item_type()),
        format!("Version:     {}", record.version()),
        format!("Title:       {}", record_title(record)),
    ];

    if let Some(parent) = record.parent_item() {
        lines.push(format!("Parent:      {parent}"));
    }
    if let Some(parent) = record.parent_collection() {
        lines.push(format!("Parent coll: {parent}"));
    }
    if !record.collections().is_empty() {
        let keys: Vec<_> = record.collections().iter().map(|k| k.as_str()).collect();
        lines.push(format!("Collections: {}", keys.join(", ")));
    }
    if !record.tags().is_empty() {
        lines.push(format!("Tags:        {}", record.tags().join(", ")));
    }
    if let Some(info) = record.attachment() {
        lines.push(format!(
            "File:        {} ({}, {})",
            info.filename.as_deref().unwrap_or("-"),
            info.content_type.as_deref().unwrap_or("-"),
            info.link_mode.as_str()
        ));
    }
    for member in record.members() {
        lines.push(format!("Member:      {} ({})", member.key, member.item_type));
    }
    for link in related_links(record) {
        lines.push(format!("Related:     {link}"));
    }
    if let Some(bib) = record.bib() {
        lines.push(format!("Citation:    {}", bib.trim()));
    }
    lines
}

/// Numbered block for one annotation of a tag listing
pub fn annotation_lines(position: usize, entry: &AnnotationEntry) -> Vec<String> {
    let mut lines = vec![
        format!("{position}. {} [{}]", entry.source.trim(), entry.key),
        format!("   {}", entry.text),
    ];
    if !entry.comment.is_empty() {
        lines.push(format!("   Comment: {}", entry.comment));
    }
    if !entry.tags.is_empty() {
        lines.push(format!("   Tags:    {}", entry.tags.join(", ")));
    }
    if let Some(path) = &entry.item_path {
        lines.push(format!("   Item:    {path}"));
    }
    if let Some(link) = &entry.open_pdf {
        lines.push(format!("   Open:    {link}"));
    }
    lines
}
