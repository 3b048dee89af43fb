//! Content items and the front-matter block at the head of each Markdown file.
//!
//! Hugo accepts YAML (`---`) and TOML (`+++`) fences; both are normalised into
//! the same [`FrontMatter`] so the publish policy can be evaluated without
//! invoking the renderer.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::PathBuf,
};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, format_description::FormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

const YAML_FENCE: &str = "---";
const TOML_FENCE: &str = "+++";

const LOCAL_DATETIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);
const LOCAL_DATETIME_SPACE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A content file that failed to parse, named by its path so authors can fix it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}: {message}", .path.display())]
pub struct ContentError {
    pub path: PathBuf,
    pub message: String,
}

impl ContentError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontMatterFormat {
    Yaml,
    Toml,
}

impl fmt::Display for FrontMatterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterFormat::Yaml => f.write_str("YAML"),
            FrontMatterFormat::Toml => f.write_str("TOML"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrontMatter {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_date")]
    pub date: Option<OffsetDateTime>,
    pub draft: bool,
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub categories: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn serialize_date<S>(date: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match date {
        Some(value) => {
            let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
            serializer.serialize_some(&formatted)
        }
        None => serializer.serialize_none(),
    }
}

impl FrontMatter {
    /// Parse a raw metadata block in the given format.
    pub fn parse(format: FrontMatterFormat, raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let value = match format {
            FrontMatterFormat::Yaml => serde_yaml_ng::from_str::<serde_json::Value>(raw)
                .map_err(|err| format!("invalid YAML front matter: {err}"))?,
            FrontMatterFormat::Toml => {
                let table = toml::from_str::<toml::Table>(raw)
                    .map_err(|err| format!("invalid TOML front matter: {err}"))?;
                toml_to_json(toml::Value::Table(table))
            }
        };

        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Object(map) => Self::from_mapping(map),
            _ => Err(format!("{format} front matter must be a mapping")),
        }
    }

    /// Scalars are converted the way Hugo casts them: numbers and booleans
    /// become strings, `"true"`/`"false"` become booleans, and an empty date
    /// means no date. Keys match case-insensitively.
    fn from_mapping(mut map: serde_json::Map<String, Value>) -> Result<Self, String> {
        let mut take = |key: &str| {
            let found = map
                .keys()
                .find(|candidate| candidate.eq_ignore_ascii_case(key))
                .cloned()?;
            map.remove(&found).filter(|value| !value.is_null())
        };

        let title = take("title")
            .map(|value| scalar_string("title", value))
            .transpose()?
            .unwrap_or_default();
        let date = match take("date") {
            Some(value) => match scalar_string("date", value)?.trim() {
                "" => None,
                raw => Some(parse_date(raw)?),
            },
            None => None,
        };
        let draft = take("draft")
            .map(|value| boolean("draft", value))
            .transpose()?
            .unwrap_or(false);
        let tags = string_list("tags", take("tags"))?.into_iter().collect();
        let categories = string_list("categories", take("categories"))?
            .into_iter()
            .collect();
        let series = string_list("series", take("series"))?;
        let series_order = take("series_order")
            .map(|value| integer("series_order", value))
            .transpose()?;
        let description = take("description")
            .map(|value| scalar_string("description", value))
            .transpose()?;
        let slug = take("slug")
            .map(|value| scalar_string("slug", value))
            .transpose()?;

        Ok(FrontMatter {
            title,
            date,
            draft,
            tags,
            categories,
            series,
            series_order,
            description,
            slug,
            extra: map.into_iter().collect(),
        })
    }
}

fn scalar_string(key: &str, value: Value) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(format!("`{key}` must be a scalar, found {}", kind(&other))),
    }
}

fn boolean(key: &str, value: Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(flag),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" | "" => Ok(false),
            _ => Err(format!("`{key}` must be a boolean, found `{text}`")),
        },
        other => Err(format!("`{key}` must be a boolean, found {}", kind(&other))),
    }
}

fn integer(key: &str, value: Value) -> Result<i64, String> {
    match &value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|n| n as i64))
            .ok_or_else(|| format!("`{key}` must be an integer, found `{number}`")),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| format!("`{key}` must be an integer, found `{text}`")),
        other => Err(format!("`{key}` must be an integer, found {}", kind(other))),
    }
}

/// A single scalar or a list of scalars, blanks dropped.
fn string_list(key: &str, value: Option<Value>) -> Result<Vec<String>, String> {
    let values = match value {
        None => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(scalar) => vec![scalar],
    };
    let mut list = Vec::with_capacity(values.len());
    for value in values.into_iter().filter(|value| !value.is_null()) {
        let text = scalar_string(key, value)?;
        let text = text.trim();
        if !text.is_empty() {
            list.push(text.to_string());
        }
    }
    Ok(list)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Accepts the date shapes Hugo accepts in front matter.
pub fn parse_date(raw: &str) -> Result<OffsetDateTime, String> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }
    if raw.len() > 10 && raw.as_bytes()[10] == b' ' {
        let with_t = format!("{}T{}", &raw[..10], &raw[11..]);
        if let Ok(value) = OffsetDateTime::parse(&with_t, &Rfc3339) {
            return Ok(value);
        }
    }
    for format in [LOCAL_DATETIME_FORMAT, LOCAL_DATETIME_SPACE_FORMAT] {
        if let Ok(value) = PrimitiveDateTime::parse(raw, format) {
            return Ok(value.assume_utc());
        }
    }
    if let Ok(value) = Date::parse(raw, DATE_FORMAT) {
        return Ok(value.midnight().assume_utc());
    }
    Err(format!("unrecognised date `{raw}`"))
}

fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(value) => serde_json::Value::String(value),
        toml::Value::Integer(value) => serde_json::Value::from(value),
        toml::Value::Float(value) => serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        toml::Value::Boolean(value) => serde_json::Value::Bool(value),
        toml::Value::Datetime(value) => serde_json::Value::String(value.to_string()),
        toml::Value::Array(values) => {
            serde_json::Value::Array(values.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Split a document into its front-matter block (if any) and body.
pub fn split_front_matter(
    source: &str,
) -> Result<(Option<(FrontMatterFormat, &str)>, &str), String> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let (first_line, rest) = match source.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (source, ""),
    };

    let format = match first_line.trim_end() {
        YAML_FENCE => FrontMatterFormat::Yaml,
        TOML_FENCE => FrontMatterFormat::Toml,
        _ => return Ok((None, source)),
    };
    let fence = first_line.trim_end();

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            let metadata = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((Some((format, metadata)), body));
        }
        offset += line.len();
    }

    Err(format!(
        "{format} front matter opened with `{fence}` is never closed"
    ))
}

/// Which content a build would publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishPolicy {
    pub include_drafts: bool,
    pub include_future: bool,
}

impl PublishPolicy {
    pub fn production() -> Self {
        Self::default()
    }

    pub fn with_drafts(mut self, include: bool) -> Self {
        self.include_drafts = include;
        self
    }

    pub fn with_future(mut self, include: bool) -> Self {
        self.include_future = include;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    /// Path relative to the content directory.
    pub path: PathBuf,
    pub front_matter: FrontMatter,
    pub body: String,
}

impl ContentItem {
    pub fn parse(path: impl Into<PathBuf>, source: &str) -> Result<Self, ContentError> {
        let path = path.into();
        let (block, body) =
            split_front_matter(source).map_err(|message| ContentError::new(&path, message))?;
        let front_matter = match block {
            Some((format, raw)) => FrontMatter::parse(format, raw)
                .map_err(|message| ContentError::new(&path, message))?,
            None => FrontMatter::default(),
        };

        Ok(Self {
            path,
            front_matter,
            body: body.to_string(),
        })
    }

    pub fn is_draft(&self) -> bool {
        self.front_matter.draft
    }

    pub fn is_future(&self, now: OffsetDateTime) -> bool {
        self.front_matter.date.is_some_and(|date| date > now)
    }

    pub fn is_publishable(&self, policy: PublishPolicy, now: OffsetDateTime) -> bool {
        if self.is_draft() && !policy.include_drafts {
            return false;
        }
        if self.is_future(now) && !policy.include_future {
            return false;
        }
        true
    }
}

/// Every content item under one content directory, ordered by path.
#[derive(Debug, Clone, Default)]
pub struct ContentSet {
    items: Vec<ContentItem>,
}

impl ContentSet {
    pub fn from_items(mut items: Vec<ContentItem>) -> Self {
        items.sort_by(|left, right| left.path.cmp(&right.path));
        Self { items }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn publishable(
        &self,
        policy: PublishPolicy,
        now: OffsetDateTime,
    ) -> impl Iterator<Item = &ContentItem> {
        self.items
            .iter()
            .filter(move |item| item.is_publishable(policy, now))
    }

    pub fn drafts(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter().filter(|item| item.is_draft())
    }

    pub fn future(&self, now: OffsetDateTime) -> impl Iterator<Item = &ContentItem> {
        self.items.iter().filter(move |item| item.is_future(now))
    }
}
