use serde_json::{Map, Value};

use crate::models::{Field, FieldValue, SubmissionFields, SubmissionPatch};

/// Keys owned by the server. They are dropped from client input instead of
/// being stored as undeclared attributes.
const RESERVED: &[&str] = &["id", "_id", "submittedAt", "source", "csvData", "__v"];

/// Sort incoming attributes into declared fields (coerced) and `extra`
/// (everything undeclared, stored verbatim).
pub fn sort_fields(raw: &Map<String, Value>) -> Result<SubmissionPatch, String> {
    let mut patch = SubmissionPatch::default();

    for (key, value) in raw {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        match Field::from_key(key) {
            Some(field) => {
                let value = coerce(field, value)?;
                patch.fields.push((field, value));
            }
            None => {
                patch.extra.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(patch)
}

/// Lift the declared columns of a CSV row into fields. Cells that don't
/// coerce are left unset; the row itself is kept in `csvData` regardless.
pub fn lift_csv_row(row: &Map<String, Value>) -> SubmissionFields {
    let mut fields = SubmissionFields::default();
    for (key, value) in row {
        let Some(field) = Field::from_key(key) else {
            continue;
        };
        match coerce(field, value) {
            Ok(value) => fields.set(field, value),
            Err(e) => tracing::debug!("Skipping CSV cell {key}: {e}"),
        }
    }
    fields
}

/// Coerce a JSON value to the declared type of `field`. `null` clears.
pub fn coerce(field: Field, value: &Value) -> Result<Option<FieldValue>, String> {
    let name = field.key();
    match (field, value) {
        (_, Value::Null) => Ok(None),
        (Field::Newsletter, Value::Bool(b)) => Ok(Some(FieldValue::Flag(*b))),
        (Field::Newsletter, Value::String(s)) => parse_flag(s)
            .map(|b| Some(FieldValue::Flag(b)))
            .ok_or_else(|| format!("Invalid boolean for {name}: {s}")),
        (Field::Newsletter, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Some(FieldValue::Flag(false))),
            Some(1) => Ok(Some(FieldValue::Flag(true))),
            _ => Err(format!("Invalid boolean for {name}: {n}")),
        },
        (Field::Newsletter, _) => Err(format!("Expected boolean for {name}")),
        (_, Value::String(s)) => Ok(Some(FieldValue::Text(s.clone()))),
        (_, Value::Number(n)) => Ok(Some(FieldValue::Text(n.to_string()))),
        (_, Value::Bool(b)) => Ok(Some(FieldValue::Text(b.to_string()))),
        (_, Value::Array(_) | Value::Object(_)) => Err(format!("Expected string for {name}")),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn splits_declared_and_extra() {
        let patch = sort_fields(&obj(json!({
            "name": "Jo",
            "userType": "student",
            "favouriteColour": "teal",
            "source": "csv",
            "submittedAt": "2001-01-01T00:00:00Z"
        })))
        .unwrap();

        assert!(patch.fields.contains(&(Field::Name, Some(FieldValue::Text("Jo".into())))));
        let user_type = (Field::UserType, Some(FieldValue::Text("student".into())));
        assert!(patch.fields.contains(&user_type));
        assert_eq!(patch.fields.len(), 2);
        assert_eq!(patch.extra, obj(json!({ "favouriteColour": "teal" })));
    }

    #[test]
    fn coerces_scalars() {
        assert_eq!(
            coerce(Field::Employees, &json!(42)).unwrap(),
            Some(FieldValue::Text("42".into()))
        );
        assert_eq!(
            coerce(Field::Newsletter, &json!("Yes")).unwrap(),
            Some(FieldValue::Flag(true))
        );
        assert_eq!(coerce(Field::Newsletter, &json!(0)).unwrap(), Some(FieldValue::Flag(false)));
        assert_eq!(coerce(Field::Email, &Value::Null).unwrap(), None);
    }

    #[test]
    fn rejects_structured_values() {
        assert!(coerce(Field::Name, &json!(["a"])).is_err());
        assert!(coerce(Field::Newsletter, &json!("maybe")).is_err());
        assert!(sort_fields(&obj(json!({ "skills": { "rust": true } }))).is_err());
    }

    #[test]
    fn csv_rows_lift_known_columns() {
        let fields = lift_csv_row(&obj(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "newsletter": "nope",
            "Notes": "ignored"
        })));
        assert_eq!(fields.name.as_deref(), Some("Ada"));
        assert_eq!(fields.email.as_deref(), Some("ada@example.com"));
        assert_eq!(fields.newsletter, None);
    }
}
