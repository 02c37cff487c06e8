//! Leaf field descriptors
//!
//! A leaf reads one attribute of a source object and formats it. Leaves are
//! shared between the schema and every plan built from it, so they are kept
//! behind `Arc` and never copied per request.

use super::error::MarshalError;
use super::marshal::{lookup, marshal};
use super::plan::MarshalPlan;
use super::schema::Fieldset;
use super::selection::json_type_name;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Signature of user supplied formatters
pub type FormatFn = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// Output format for date-time leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// `2024-05-01T10:00:00+00:00`
    #[default]
    Iso8601,
    /// `Wed, 01 May 2024 10:00:00 +0000`
    Rfc822,
}

/// How a leaf turns a source value into output
#[derive(Clone)]
pub enum FieldFormat {
    /// Value is passed through untouched
    Raw,
    String,
    Integer,
    Float,
    Boolean,
    DateTime(DateFormat),
    Uuid,
    /// Read `member` from an object value and format it with `then`
    ///
    /// Yields `null` when the value is not an object or lacks the member.
    Member {
        member: String,
        then: Box<FieldFormat>,
    },
    /// Replace `{value}` in the template with the stringified value
    Template(String),
    /// Always embedded child object rendered with a fixed plan
    ///
    /// A lazy object yields `null` when the source lacks the key, a strict
    /// one fails with [`MarshalError::MissingAttribute`]. Rendered against a
    /// `null` source, both yield `null` or the default.
    Object { plan: Arc<MarshalPlan>, lazy: bool },
    Custom(Arc<FormatFn>),
}

impl fmt::Debug for FieldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFormat::Raw => write!(f, "Raw"),
            FieldFormat::String => write!(f, "String"),
            FieldFormat::Integer => write!(f, "Integer"),
            FieldFormat::Float => write!(f, "Float"),
            FieldFormat::Boolean => write!(f, "Boolean"),
            FieldFormat::DateTime(df) => write!(f, "DateTime({:?})", df),
            FieldFormat::Uuid => write!(f, "Uuid"),
            FieldFormat::Member { member, then } => f
                .debug_struct("Member")
                .field("member", member)
                .field("then", then)
                .finish(),
            FieldFormat::Template(t) => write!(f, "Template({:?})", t),
            FieldFormat::Object { plan, lazy } => f
                .debug_struct("Object")
                .field("fields", &plan.names().collect::<Vec<_>>())
                .field("lazy", lazy)
                .finish(),
            FieldFormat::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl FieldFormat {
    /// Format a present, non-null value
    pub fn apply(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldFormat::Raw => Ok(value.clone()),
            FieldFormat::String => Ok(Value::String(stringify(value))),
            FieldFormat::Integer => to_integer(value),
            FieldFormat::Float => to_float(value),
            FieldFormat::Boolean => Ok(Value::Bool(truthy(value))),
            FieldFormat::DateTime(df) => to_datetime(value, *df),
            FieldFormat::Uuid => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| format!("expected a UUID string, got {}", json_type_name(value)))?;
                let id = Uuid::parse_str(raw).map_err(|e| format!("invalid UUID '{}': {}", raw, e))?;
                Ok(Value::String(id.hyphenated().to_string()))
            }
            FieldFormat::Member { member, then } => match value.as_object().and_then(|o| o.get(member)) {
                None | Some(Value::Null) => Ok(Value::Null),
                Some(inner) => then.apply(inner),
            },
            FieldFormat::Template(template) => {
                Ok(Value::String(template.replace("{value}", &stringify(value))))
            }
            FieldFormat::Object { plan, .. } => marshal(value, plan).map_err(|e| e.to_string()),
            FieldFormat::Custom(f) => f(value),
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn to_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n.clone())),
        Value::Number(n) => n
            .as_f64()
            .map(f64::trunc)
            .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| Value::from(f as i64))
            .ok_or_else(|| format!("'{}' is out of integer range", n)),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not an integer", s)),
        other => Err(format!("expected an integer, got {}", json_type_name(other))),
    }
}

fn to_float(value: &Value) -> Result<Value, String> {
    let float = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    float
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("cannot convert {} to a float", value))
}

fn to_datetime(value: &Value, format: DateFormat) -> Result<Value, String> {
    let parsed: DateTime<Utc> = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid date-time '{}': {}", s, e))?,
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| format!("invalid timestamp {}", n))?,
        other => return Err(format!("expected a date-time, got {}", json_type_name(other))),
    };
    Ok(Value::String(match format {
        DateFormat::Iso8601 => parsed.to_rfc3339(),
        DateFormat::Rfc822 => parsed.to_rfc2822(),
    }))
}

/// Check that a name can be used as a field name in selectors
///
/// Dots separate nested path segments and commas separate selector entries.
pub fn is_valid_field_name(name: &str) -> bool {
    static FIELD_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FIELD_NAME_REGEX.get_or_init(|| Regex::new(r"^[^.,\s]+$").unwrap());
    regex.is_match(name)
}

/// A descriptor that extracts and formats a single value
#[derive(Debug, Clone)]
pub struct LeafField {
    attribute: Option<String>,
    default: Option<Value>,
    format: FieldFormat,
}

impl LeafField {
    pub fn new(format: FieldFormat) -> Self {
        Self {
            attribute: None,
            default: None,
            format,
        }
    }

    pub fn raw() -> Self {
        Self::new(FieldFormat::Raw)
    }

    pub fn string() -> Self {
        Self::new(FieldFormat::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldFormat::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldFormat::Float)
    }

    pub fn boolean() -> Self {
        Self::new(FieldFormat::Boolean)
    }

    pub fn datetime(format: DateFormat) -> Self {
        Self::new(FieldFormat::DateTime(format))
    }

    pub fn uuid() -> Self {
        Self::new(FieldFormat::Uuid)
    }

    /// Dereference `member` on the attribute value, passing it through
    pub fn member(member: impl Into<String>) -> Self {
        Self::member_as(member, FieldFormat::Raw)
    }

    /// Dereference `member` on the attribute value and format it
    pub fn member_as(member: impl Into<String>, then: FieldFormat) -> Self {
        Self::new(FieldFormat::Member {
            member: member.into(),
            then: Box::new(then),
        })
    }

    /// Synthesize a string from a template, e.g. `"/pictures/{value}/st"`
    pub fn template(template: impl Into<String>) -> Self {
        Self::new(FieldFormat::Template(template.into()))
    }

    /// Always embed `child` with its default selection
    pub fn nested(child: &Fieldset) -> Self {
        Self::new(FieldFormat::Object {
            plan: Arc::new(child.default_plan()),
            lazy: false,
        })
    }

    /// Like [`LeafField::nested`], but a missing key yields `null`
    pub fn lazy(child: &Fieldset) -> Self {
        Self::new(FieldFormat::Object {
            plan: Arc::new(child.default_plan()),
            lazy: true,
        })
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new(FieldFormat::Custom(Arc::new(f)))
    }

    /// Read this attribute instead of the field name
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Value used when the attribute is absent or null
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn format_kind(&self) -> &FieldFormat {
        &self.format
    }

    /// Format a value directly, without attribute lookup
    ///
    /// `null` short-circuits to the default.
    pub fn format(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(self.default.clone().unwrap_or(Value::Null));
        }
        self.format.apply(value)
    }

    /// Extract and format this field from `source`, stored under `key`
    pub fn output(&self, key: &str, source: &Value) -> Result<Value, MarshalError> {
        let attribute = self.attribute.as_deref().unwrap_or(key);
        match (lookup(source, attribute), &self.format) {
            (None, FieldFormat::Object { lazy: true, .. }) => Ok(Value::Null),
            (None, FieldFormat::Object { lazy: false, .. }) if !source.is_null() => {
                Err(MarshalError::MissingAttribute {
                    field: key.to_string(),
                })
            }
            (None | Some(Value::Null), _) => Ok(self.default.clone().unwrap_or(Value::Null)),
            (Some(value), FieldFormat::Object { plan, .. }) => {
                marshal(value, plan).map_err(|e| e.within(key))
            }
            (Some(value), format) => format.apply(value).map_err(|message| MarshalError::Format {
                field: key.to_string(),
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::FieldsetDef;
    use serde_json::json;

    #[test]
    fn test_raw_passthrough() {
        let field = LeafField::raw();
        let source = json!({ "tags": ["a", "b"] });
        assert_eq!(field.output("tags", &source).unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_attribute_and_default() {
        let field = LeafField::integer().attribute("mt_id").with_default(-1);
        assert_eq!(field.output("id", &json!({ "mt_id": 7 })).unwrap(), json!(7));
        assert_eq!(field.output("id", &json!({})).unwrap(), json!(-1));
        assert_eq!(field.output("id", &json!({ "mt_id": null })).unwrap(), json!(-1));
    }

    #[test]
    fn test_dotted_attribute_walks_objects() {
        let field = LeafField::string().attribute("topic.forum.name");
        let source = json!({ "topic": { "forum": { "name": "News" } } });
        assert_eq!(field.output("forum", &source).unwrap(), json!("News"));
        assert_eq!(field.output("forum", &json!({ "topic": 3 })).unwrap(), json!(null));
    }

    #[test]
    fn test_string_coercion() {
        let field = LeafField::string();
        assert_eq!(field.format(&json!(2)).unwrap(), json!("2"));
        assert_eq!(field.format(&json!(true)).unwrap(), json!("true"));
        assert_eq!(field.format(&json!("x")).unwrap(), json!("x"));
    }

    #[test]
    fn test_integer_coercion() {
        let field = LeafField::integer();
        assert_eq!(field.format(&json!(3.7)).unwrap(), json!(3));
        assert_eq!(field.format(&json!(-3.7)).unwrap(), json!(-3));
        assert_eq!(field.format(&json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(field.format(&json!(true)).unwrap(), json!(1));
        assert!(field.format(&json!("abc")).is_err());
        assert!(field.format(&json!([1])).is_err());
    }

    #[test]
    fn test_integer_error_names_field() {
        let err = LeafField::integer()
            .output("hits", &json!({ "hits": "many" }))
            .unwrap_err();
        assert!(matches!(err, MarshalError::Format { ref field, .. } if field == "hits"));
    }

    #[test]
    fn test_integer_out_of_range_is_error() {
        let field = LeafField::integer();
        assert!(field.format(&json!(1e20)).is_err());
        assert!(field.format(&json!(-1e20)).is_err());
        assert_eq!(field.format(&json!(-9.2e18)).unwrap(), json!(-9_200_000_000_000_000_000i64));

        let err = field.output("hits", &json!({ "hits": 1e20 })).unwrap_err();
        assert!(matches!(err, MarshalError::Format { ref field, .. } if field == "hits"));
    }

    #[test]
    fn test_strict_object_on_null_source() {
        let body = FieldsetDef::new("body")
            .field("text", LeafField::string())
            .build()
            .unwrap();
        let field = LeafField::nested(&body);

        assert_eq!(field.output("body", &Value::Null).unwrap(), Value::Null);
        assert!(field.output("body", &json!({})).is_err());

        let field = LeafField::nested(&body).with_default(json!({ "text": "" }));
        assert_eq!(
            field.output("body", &Value::Null).unwrap(),
            json!({ "text": "" })
        );
    }

    #[test]
    fn test_float_and_boolean() {
        assert_eq!(LeafField::float().format(&json!(2)).unwrap(), json!(2.0));
        assert_eq!(LeafField::float().format(&json!("1.5")).unwrap(), json!(1.5));
        assert!(LeafField::float().format(&json!({})).is_err());

        let field = LeafField::boolean();
        assert_eq!(field.format(&json!(0)).unwrap(), json!(false));
        assert_eq!(field.format(&json!("no")).unwrap(), json!(true));
        assert_eq!(field.format(&json!("")).unwrap(), json!(false));
        assert_eq!(field.format(&json!([])).unwrap(), json!(false));
    }

    #[test]
    fn test_datetime_formats() {
        let iso = LeafField::datetime(DateFormat::Iso8601);
        assert_eq!(
            iso.format(&json!(0)).unwrap(),
            json!("1970-01-01T00:00:00+00:00")
        );
        assert_eq!(
            iso.format(&json!("2024-05-01T12:00:00+02:00")).unwrap(),
            json!("2024-05-01T10:00:00+00:00")
        );

        let rfc = LeafField::datetime(DateFormat::Rfc822);
        let rendered = rfc.format(&json!(0)).unwrap();
        let rendered = rendered.as_str().unwrap();
        assert!(rendered.starts_with("Thu, "));
        assert!(rendered.ends_with("Jan 1970 00:00:00 +0000"));
        assert!(rfc.format(&json!("yesterday")).is_err());
    }

    #[test]
    fn test_uuid_normalized() {
        let field = LeafField::uuid();
        assert_eq!(
            field
                .format(&json!("67E55044-10B1-426F-9247-BB680E5FE0C8"))
                .unwrap(),
            json!("67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
        assert!(field.format(&json!("not-a-uuid")).is_err());
    }

    #[test]
    fn test_member_dereference() {
        let field = LeafField::member("name").attribute("from_user");
        let source = json!({ "from_user": { "name": "alice", "id": 3 } });
        assert_eq!(field.output("from", &source).unwrap(), json!("alice"));
    }

    #[test]
    fn test_member_absent_is_null() {
        let field = LeafField::member("test");
        assert_eq!(field.format(&json!("plain string")).unwrap(), json!(null));
        assert_eq!(field.format(&json!({ "other": 1 })).unwrap(), json!(null));
    }

    #[test]
    fn test_member_with_format() {
        let source = json!({ "test": 2 });
        assert_eq!(LeafField::member("test").format(&source).unwrap(), json!(2));
        assert_eq!(
            LeafField::member_as("test", FieldFormat::String)
                .format(&source)
                .unwrap(),
            json!("2")
        );
        assert_eq!(
            LeafField::member_as("test", FieldFormat::Integer)
                .format(&source)
                .unwrap(),
            json!(2)
        );
    }

    #[test]
    fn test_template_synthesizes_string() {
        let field = LeafField::template("/pictures/{value}/st").attribute("pid");
        assert_eq!(
            field.output("thumb_small_url", &json!({ "pid": 12 })).unwrap(),
            json!("/pictures/12/st")
        );
    }

    #[test]
    fn test_custom_formatter() {
        let field = LeafField::custom(|v| Ok(json!(v.as_str().map(str::len))));
        assert_eq!(field.format(&json!("abcd")).unwrap(), json!(4));
    }

    #[test]
    fn test_field_name_validation() {
        assert!(is_valid_field_name("test01"));
        assert!(is_valid_field_name("allDay"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("a.b"));
        assert!(!is_valid_field_name("a,b"));
        assert!(!is_valid_field_name("a b"));
    }
}
