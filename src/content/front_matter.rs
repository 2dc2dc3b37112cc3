//! Front matter parsing with an explicit schema.
//!
//! Known keys are validated into typed fields at parse time. Every other key
//! is kept as-is in an open bag. Field order is preserved so a translated
//! document lists its keys exactly as the source did.

use crate::error::FrontMatterError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};

const DELIMITER: &str = "---";
const ALT_CLOSING: &str = "...";

/// A `date` value, kept in its original spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn parse(raw: &str) -> Result<Self, FrontMatterError> {
        let trimmed = raw.trim();
        let valid = DateTime::parse_from_rfc3339(trimmed).is_ok()
            || NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").is_ok()
            || NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").is_ok()
            || NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok();
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(FrontMatterError::InvalidDate(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Title(String),
    Date(Timestamp),
    Description(String),
    Tags(Vec<String>),
    Draft(bool),
    Other(String, Value),
}

impl Field {
    pub fn key(&self) -> &str {
        match self {
            Field::Title(_) => "title",
            Field::Date(_) => "date",
            Field::Description(_) => "description",
            Field::Tags(_) => "tags",
            Field::Draft(_) => "draft",
            Field::Other(key, _) => key,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Field::Title(s) | Field::Description(s) => Value::String(s.clone()),
            Field::Date(ts) => Value::String(ts.as_str().to_string()),
            Field::Tags(tags) => {
                Value::Sequence(tags.iter().cloned().map(Value::String).collect())
            }
            Field::Draft(b) => Value::Bool(*b),
            Field::Other(_, value) => value.clone(),
        }
    }

    fn from_entry(key: &str, value: Value) -> Result<Field, FrontMatterError> {
        let wrong = |expected: &'static str| FrontMatterError::WrongType {
            key: key.to_string(),
            expected,
        };
        match key {
            "title" => match value {
                Value::String(s) => Ok(Field::Title(s)),
                _ => Err(wrong("a string")),
            },
            "description" => match value {
                Value::String(s) => Ok(Field::Description(s)),
                _ => Err(wrong("a string")),
            },
            "date" => match value {
                Value::String(s) => Ok(Field::Date(Timestamp::parse(&s)?)),
                _ => Err(wrong("a timestamp string")),
            },
            "tags" => match value {
                Value::Sequence(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        _ => Err(wrong("a list of strings")),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Field::Tags),
                _ => Err(wrong("a list of strings")),
            },
            "draft" => match value {
                Value::Bool(b) => Ok(Field::Draft(b)),
                _ => Err(wrong("a boolean")),
            },
            _ => Ok(Field::Other(key.to_string(), value)),
        }
    }
}

/// Ordered, schema-checked front matter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrontMatter {
    fields: Vec<Field>,
}

impl FrontMatter {
    pub fn from_yaml(yaml: &str) -> Result<Self, FrontMatterError> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| FrontMatterError::InvalidYaml(e.to_string()))?;
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => return Err(FrontMatterError::NotAMapping),
        };

        let mut fields = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(FrontMatterError::NonStringKey(format!("{:?}", other)));
                }
            };
            fields.push(Field::from_entry(&key, value)?);
        }
        Ok(Self { fields })
    }

    pub fn to_yaml(&self) -> Result<String, FrontMatterError> {
        let mut mapping = Mapping::with_capacity(self.fields.len());
        for field in &self.fields {
            mapping.insert(Value::String(field.key().to_string()), field.to_value());
        }
        serde_yaml::to_string(&mapping).map_err(|e| FrontMatterError::Render(e.to_string()))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(Field::key).collect()
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Title(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn description(&self) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Description(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn date(&self) -> Option<&Timestamp> {
        self.fields.iter().find_map(|f| match f {
            Field::Date(ts) => Some(ts),
            _ => None,
        })
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.fields.iter().find_map(|f| match f {
            Field::Tags(tags) => Some(tags.as_slice()),
            _ => None,
        })
    }

    pub fn draft(&self) -> Option<bool> {
        self.fields.iter().find_map(|f| match f {
            Field::Draft(b) => Some(*b),
            _ => None,
        })
    }
}

/// A content file split into front matter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub front_matter: Option<FrontMatter>,
    pub body: String,
}

impl Document {
    /// Split and validate a file's text. A file that does not start with a
    /// `---` line has no front matter and is all body.
    pub fn parse(text: &str) -> Result<Self, FrontMatterError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut lines = text.split_inclusive('\n');
        let first = match lines.next() {
            Some(line) if line.trim_end() == DELIMITER => line,
            _ => {
                return Ok(Self {
                    front_matter: None,
                    body: text.to_string(),
                })
            }
        };

        let yaml_start = first.len();
        let mut offset = yaml_start;
        for line in lines {
            let line_start = offset;
            offset += line.len();
            let trimmed = line.trim_end();
            if trimmed == DELIMITER || trimmed == ALT_CLOSING {
                let front_matter = FrontMatter::from_yaml(&text[yaml_start..line_start])?;
                return Ok(Self {
                    front_matter: Some(front_matter),
                    body: text[offset..].to_string(),
                });
            }
        }
        Err(FrontMatterError::Unterminated)
    }

    pub fn render(&self) -> Result<String, FrontMatterError> {
        match &self.front_matter {
            Some(front_matter) => {
                let yaml = front_matter.to_yaml()?;
                let mut out = String::with_capacity(yaml.len() + self.body.len() + 8);
                out.push_str(DELIMITER);
                out.push('\n');
                if !front_matter.fields().is_empty() {
                    out.push_str(&yaml);
                }
                out.push_str(DELIMITER);
                out.push('\n');
                out.push_str(&self.body);
                Ok(out)
            }
            None => Ok(self.body.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELCOME: &str = "---\ntitle: Welcome\ndate: 2024-01-15T10:00:00+08:00\ndescription: First post\ntags:\n- hugo\n- rust\ndraft: false\nauthor: jane\n---\n# Hi\n\nText.\n";

    // ==================== Parse Tests ====================

    #[test]
    fn test_parse_typed_fields() {
        let doc = Document::parse(WELCOME).expect("should parse");
        let fm = doc.front_matter.expect("front matter present");
        assert_eq!(fm.title(), Some("Welcome"));
        assert_eq!(fm.description(), Some("First post"));
        assert_eq!(fm.date().unwrap().as_str(), "2024-01-15T10:00:00+08:00");
        assert_eq!(fm.tags().unwrap(), ["hugo", "rust"]);
        assert_eq!(fm.draft(), Some(false));
        assert_eq!(fm.keys(), vec!["title", "date", "description", "tags", "draft", "author"]);
        assert_eq!(doc.body, "# Hi\n\nText.\n");
    }

    #[test]
    fn test_no_front_matter_is_all_body() {
        let doc = Document::parse("# Just a body\n").unwrap();
        assert!(doc.front_matter.is_none());
        assert_eq!(doc.body, "# Just a body\n");
    }

    #[test]
    fn test_dot_closing_delimiter() {
        let doc = Document::parse("---\ntitle: T\n...\nbody").unwrap();
        assert_eq!(doc.front_matter.unwrap().title(), Some("T"));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn test_empty_block() {
        let doc = Document::parse("---\n---\nbody\n").unwrap();
        assert!(doc.front_matter.unwrap().fields().is_empty());
    }

    #[test]
    fn test_bom_is_stripped() {
        let doc = Document::parse("\u{feff}---\ntitle: T\n---\nb").unwrap();
        assert_eq!(doc.front_matter.unwrap().title(), Some("T"));
    }

    #[test]
    fn test_date_only_timestamp() {
        let doc = Document::parse("---\ndate: 2024-01-15\n---\n").unwrap();
        assert_eq!(doc.front_matter.unwrap().date().unwrap().as_str(), "2024-01-15");
    }

    // ==================== Malformed Tests ====================

    #[test]
    fn test_unterminated_block() {
        assert_eq!(
            Document::parse("---\ntitle: T\nbody"),
            Err(FrontMatterError::Unterminated)
        );
    }

    #[test]
    fn test_not_a_mapping() {
        assert_eq!(
            Document::parse("---\n- a\n- b\n---\n"),
            Err(FrontMatterError::NotAMapping)
        );
    }

    #[test]
    fn test_title_wrong_type() {
        let err = Document::parse("---\ntitle: [a, b]\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::WrongType { ref key, .. } if key == "title"));
    }

    #[test]
    fn test_draft_wrong_type() {
        let err = Document::parse("---\ndraft: maybe\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::WrongType { ref key, .. } if key == "draft"));
    }

    #[test]
    fn test_tags_with_non_string_item() {
        let err = Document::parse("---\ntags: [a, [b]]\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::WrongType { .. }));
    }

    #[test]
    fn test_invalid_date() {
        let err = Document::parse("---\ndate: yesterday\n---\n").unwrap_err();
        assert_eq!(err, FrontMatterError::InvalidDate("yesterday".to_string()));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = Document::parse("---\ntitle: \"unclosed\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::InvalidYaml(_)));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let err = Document::parse("---\ntitle: a\ntitle: b\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::InvalidYaml(_)));
    }

    // ==================== Render Tests ====================

    #[test]
    fn test_render_preserves_order_and_values() {
        let doc = Document::parse(WELCOME).unwrap();
        let rendered = doc.render().unwrap();
        let reparsed = Document::parse(&rendered).unwrap();
        assert_eq!(reparsed, doc);
        assert!(rendered.starts_with("---\ntitle: Welcome\n"));
        assert!(rendered.ends_with("---\n# Hi\n\nText.\n"));
    }

    #[test]
    fn test_render_without_front_matter_is_body() {
        let doc = Document {
            front_matter: None,
            body: "only body".to_string(),
        };
        assert_eq!(doc.render().unwrap(), "only body");
    }

    #[test]
    fn test_other_values_survive() {
        let doc = Document::parse("---\nweight: 3\nextra:\n  toc: true\n---\n").unwrap();
        let reparsed = Document::parse(&doc.render().unwrap()).unwrap();
        assert_eq!(reparsed.front_matter, doc.front_matter);
    }
}
