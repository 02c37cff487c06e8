//! Tests for YAML configuration loading and how it reaches built fieldsets

use fieldsets::prelude::*;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

struct TopicFields;

impl FieldsetType for TopicFields {
    const NAME: &'static str = "topic";

    fn declare() -> FieldsetDef {
        FieldsetDef::new(Self::NAME)
            .field("tid", LeafField::integer())
            .field("title", LeafField::string())
            .field("body", LeafField::string())
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
query:
  fields_kw: only
  embedd_kw: with
max_depth: 8
max_body_bytes: 2048
fieldsets:
  topic:
    default_fields: [tid, title]
"#,
    );

    let config = FieldsetsConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.query.fields_kw, "only");
    assert_eq!(config.query.embed_kw, "with");
    assert_eq!(config.max_depth, 8);
    assert_eq!(config.max_body_bytes, 2048);
    assert!(config.meta_for("topic").is_some());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(FieldsetsConfig::from_yaml_file("/nonexistent/fieldsets.yaml").is_err());
}

#[test]
fn test_invalid_yaml_is_an_error() {
    assert!(FieldsetsConfig::from_yaml_str("max_depth: [1, 2").is_err());
    assert!(FieldsetsConfig::from_yaml_str("max_depth: deep").is_err());
}

#[test]
fn test_config_reaches_fieldset() {
    let config = FieldsetsConfig::from_yaml_str(
        r#"
query:
  fields_kw: only
fieldsets:
  topic:
    default_fields: [tid]
"#,
    )
    .unwrap();
    let registry = FieldsetRegistry::new(Arc::new(config));
    let topic = registry.get::<TopicFields>().unwrap();

    assert_eq!(topic.fields_kw(), "only");
    assert_eq!(topic.embed_kw(), "embedd");

    let source = json!({ "tid": 1, "title": "t", "body": "b" });
    assert_eq!(
        topic.shape(&source, &Selection::defaults()).unwrap(),
        json!({ "tid": 1 })
    );

    let selection = topic.parse_query(Some("only=title&fields=nope")).unwrap();
    assert_eq!(
        topic.shape(&source, &selection).unwrap(),
        json!({ "title": "t" })
    );
}

#[test]
fn test_invalid_override_fails_schema() {
    let config = FieldsetsConfig::from_yaml_str(
        "fieldsets:\n  topic:\n    default_fields: [tid, author]\n",
    )
    .unwrap();
    let registry = FieldsetRegistry::new(Arc::new(config));

    let err = registry.get::<TopicFields>().unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownDefault {
            fieldset: "topic".to_string(),
            kind: "fields",
            names: vec!["author".to_string()],
        }
    );
}

#[test]
fn test_merged_files() {
    let base = write_config("fieldsets:\n  topic:\n    default_fields: [tid, title]\n");
    let local = write_config("max_depth: 4\nfieldsets:\n  topic:\n    embedd_kw: with\n");

    let configs = [base.path(), local.path()]
        .iter()
        .map(|p| FieldsetsConfig::from_yaml_file(p.to_str().unwrap()))
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    let merged = FieldsetsConfig::merge(configs);

    assert_eq!(merged.max_depth, 4);
    let topic = merged.meta_for("topic").unwrap();
    assert_eq!(
        topic.default_fields,
        Some(vec!["tid".to_string(), "title".to_string()])
    );
    assert_eq!(topic.embed_kw.as_deref(), Some("with"));
}
