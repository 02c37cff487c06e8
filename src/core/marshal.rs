//! Generic serializer driven by a [`MarshalPlan`]

use super::error::MarshalError;
use super::plan::{MarshalPlan, PlanEntry};
use serde_json::{Map, Value};

/// Look up a possibly dotted attribute path, `None` when any step is missing
pub(crate) fn lookup<'a>(source: &'a Value, attribute: &str) -> Option<&'a Value> {
    attribute
        .split('.')
        .try_fold(source, |current, key| current.as_object()?.get(key))
}

/// Shape `data` according to `plan`
///
/// Arrays are shaped element by element. Objects produce one output key per
/// plan entry except [`PlanEntry::Absent`], which is omitted.
pub fn marshal(data: &Value, plan: &MarshalPlan) -> Result<Value, MarshalError> {
    if let Value::Array(items) = data {
        return items
            .iter()
            .map(|item| marshal(item, plan))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    let mut out = Map::with_capacity(plan.len());
    for (name, entry) in plan.iter() {
        let value = match entry {
            PlanEntry::Leaf(leaf) | PlanEntry::Plain(leaf) => leaf.output(name, data)?,
            PlanEntry::Embedded { field, plan } => {
                let kwargs = field.nested_kwargs();
                let attribute = kwargs.attribute.as_deref().unwrap_or(name);
                match lookup(data, attribute) {
                    None | Some(Value::Null) if kwargs.allow_null => Value::Null,
                    None | Some(Value::Null) => match &kwargs.default {
                        Some(default) => default.clone(),
                        None => marshal(&Value::Null, plan).map_err(|e| e.within(name))?,
                    },
                    Some(child) => marshal(child, plan).map_err(|e| e.within(name))?,
                }
            }
            PlanEntry::Absent => continue,
        };
        out.insert(name.to_string(), value);
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::LeafField;
    use crate::core::nested::NestedDecl;
    use crate::core::schema::FieldsetDef;
    use crate::core::selection::Selection;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        let source = json!({ "a": { "b": { "c": 1 } }, "x": null });
        assert_eq!(lookup(&source, "a.b.c"), Some(&json!(1)));
        assert_eq!(lookup(&source, "x"), Some(&Value::Null));
        assert_eq!(lookup(&source, "a.z"), None);
        assert_eq!(lookup(&json!(5), "a"), None);
    }

    #[test]
    fn test_marshal_list() {
        let fieldset = FieldsetDef::new("topic")
            .field("tid", LeafField::integer())
            .field("title", LeafField::string())
            .build()
            .unwrap();
        let data = json!([
            { "tid": 1, "title": "a", "secret": true },
            { "tid": "2", "title": "b" }
        ]);
        let out = marshal(&data, &fieldset.default_plan()).unwrap();
        assert_eq!(
            out,
            json!([{ "tid": 1, "title": "a" }, { "tid": 2, "title": "b" }])
        );
    }

    #[test]
    fn test_embedded_null_child() {
        let child = FieldsetDef::new("child")
            .field("nest01", LeafField::integer())
            .build()
            .unwrap();
        let strict = FieldsetDef::new("parent")
            .nested("a", NestedDecl::instance(child.clone()))
            .nested("b", NestedDecl::instance(child.clone()).allow_null(true))
            .nested(
                "c",
                NestedDecl::instance(child.clone()).with_default(json!("none")),
            )
            .build()
            .unwrap();

        let out = strict.shape(&json!({}), &Selection::defaults()).unwrap();
        assert_eq!(
            out,
            json!({ "a": { "nest01": null }, "b": null, "c": "none" })
        );
    }

    #[test]
    fn test_embedded_null_child_with_strict_object() {
        let body = FieldsetDef::new("body")
            .field("text", LeafField::string())
            .build()
            .unwrap();
        let message = FieldsetDef::new("message")
            .field("title", LeafField::string())
            .field("body", LeafField::nested(&body))
            .build()
            .unwrap();
        let parent = FieldsetDef::new("parent")
            .nested("last", NestedDecl::instance(message))
            .build()
            .unwrap();

        let out = parent
            .shape(&json!({ "last": null }), &Selection::defaults())
            .unwrap();
        assert_eq!(out, json!({ "last": { "title": null, "body": null } }));

        let err = parent
            .shape(&json!({ "last": { "title": "t" } }), &Selection::defaults())
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::MissingAttribute {
                field: "last.body".to_string()
            }
        );
    }

    #[test]
    fn test_embedded_reads_nested_attribute() {
        let member = FieldsetDef::new("member")
            .field("id", LeafField::integer())
            .build()
            .unwrap();
        let message = FieldsetDef::new("message")
            .nested(
                "from",
                NestedDecl::instance(member).attribute("from_user"),
            )
            .build()
            .unwrap();

        let source = json!({ "from_user": { "id": "3" }, "from": { "id": 99 } });
        let out = message.shape(&source, &Selection::defaults()).unwrap();
        assert_eq!(out, json!({ "from": { "id": 3 } }));
    }

    #[test]
    fn test_error_path_includes_parent() {
        let child = FieldsetDef::new("child")
            .field("nest01", LeafField::integer())
            .build()
            .unwrap();
        let parent = FieldsetDef::new("parent")
            .nested("test02", NestedDecl::instance(child))
            .build()
            .unwrap();
        let err = parent
            .shape(&json!({ "test02": { "nest01": "x" } }), &Selection::defaults())
            .unwrap_err();
        assert!(err.to_string().contains("test02.nest01"));
    }
}
