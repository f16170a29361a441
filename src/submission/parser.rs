use serde_json::{Map, Value};

/// Parse a request body based on Content-Type header.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, String> {
    let ct = content_type.unwrap_or("application/json");

    if ct.contains("application/json") {
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))
    } else if ct.contains("application/x-www-form-urlencoded") {
        parse_form_urlencoded(body)
    } else {
        // Try JSON first, then form-urlencoded
        serde_json::from_slice(body)
            .or_else(|_| parse_form_urlencoded(body))
            .map_err(|e| format!("Unable to parse body: {e}"))
    }
}

/// Parse a body that must be a JSON object (or a url-encoded form).
pub fn parse_object(content_type: Option<&str>, body: &[u8]) -> Result<Map<String, Value>, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err("Request body is empty".to_string());
    }
    match parse_body(content_type, body)? {
        Value::Object(map) => Ok(map),
        _ => Err("Request body must be an object".to_string()),
    }
}

fn parse_form_urlencoded(body: &[u8]) -> Result<Value, String> {
    std::str::from_utf8(body).map_err(|e| format!("Invalid UTF-8: {e}"))?;

    // Later duplicates win, matching how browsers post repeated inputs.
    let mut map = Map::new();
    for (k, v) in form_urlencoded::parse(body) {
        map.insert(k.into_owned(), Value::String(v.into_owned()));
    }
    Ok(Value::Object(map))
}

/// Extract the `csvData` rows of a bulk import payload.
/// Returns `Ok(None)` when the payload carries no `csvData` key.
pub fn csv_rows(payload: &Map<String, Value>) -> Result<Option<Vec<Map<String, Value>>>, String> {
    let Some(value) = payload.get("csvData") else {
        return Ok(None);
    };
    let Value::Array(rows) = value else {
        return Err("csvData must be an array".to_string());
    };

    rows.iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(format!("csvData row {i} must be an object")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_and_forms() {
        let v = parse_object(Some("application/json"), br#"{"name":"Jo"}"#).unwrap();
        assert_eq!(v["name"], "Jo");

        let v = parse_object(
            Some("application/x-www-form-urlencoded"),
            b"name=Jo+Smith&newsletter=on",
        )
        .unwrap();
        assert_eq!(v["name"], "Jo Smith");
        assert_eq!(v["newsletter"], "on");
    }

    #[test]
    fn rejects_non_objects() {
        assert!(parse_object(Some("application/json"), b"[1,2]").is_err());
        assert!(parse_object(Some("application/json"), b"{oops").is_err());
        assert!(parse_object(None, b"  ").is_err());
    }

    #[test]
    fn csv_rows_shape() {
        let none = json!({ "name": "Jo" });
        assert_eq!(csv_rows(none.as_object().unwrap()).unwrap(), None);

        let bad = json!({ "csvData": "a,b,c" });
        assert!(csv_rows(bad.as_object().unwrap()).is_err());

        let bad_row = json!({ "csvData": [{ "a": 1 }, 2] });
        assert!(csv_rows(bad_row.as_object().unwrap()).unwrap_err().contains("row 1"));

        let ok = json!({ "csvData": [{ "a": 1 }, { "b": 2 }] });
        assert_eq!(csv_rows(ok.as_object().unwrap()).unwrap().unwrap().len(), 2);
    }
}
