use serde_json::Value;

/// Filters for listing a collection.
///
/// Fields are matched by equality on their string form, the way the REST store
/// matches query string parameters. `search` matches any string field containing
/// the text, ignoring case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<(&'static str, String)>,
    search: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match records where `field` equals `value`
    pub fn eq(mut self, field: &'static str, value: impl ToString) -> Self {
        self.filters.push((field, value.to_string()));
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// The query as `key=value` pairs for a query string
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let filters = self
            .filters
            .iter()
            .map(|(field, value)| (field.to_string(), value.clone()));

        let search = self.search.iter().map(|s| ("q".to_string(), s.clone()));

        filters.chain(search).collect()
    }

    pub fn matches(&self, record: &Value) -> bool {
        let filters_match = self.filters.iter().all(|(field, expected)| {
            record
                .get(field)
                .map(|v| value_as_string(v) == *expected)
                .unwrap_or(false)
        });

        let search_matches = match &self.search {
            Some(text) => contains_text(record, &text.to_lowercase()),
            None => true,
        };

        filters_match && search_matches
    }
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| contains_text(v, needle)),
        Value::Object(fields) => fields.values().any(|v| contains_text(v, needle)),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::Query;

    #[test]
    fn matches_numbers_and_strings_by_string_form() {
        let record = json!({ "id": 4, "studentId": 2, "courseId": 9, "status": "active" });

        assert!(Query::new().eq("studentId", 2).eq("courseId", 9).matches(&record));
        assert!(Query::new().eq("status", "active").matches(&record));
        assert!(!Query::new().eq("studentId", 3).matches(&record));
        assert!(!Query::new().eq("missing", 1).matches(&record));
    }

    #[test]
    fn search_ignores_case() {
        let record = json!({ "title": "Intro to Rust", "description": "Ownership" });

        assert!(Query::new().search("rust").matches(&record));
        assert!(Query::new().search("OWNER").matches(&record));
        assert!(!Query::new().search("python").matches(&record));
    }

    #[test]
    fn pairs_put_search_last() {
        let query = Query::new().eq("category", "Programming").search("rust");

        assert_eq!(
            query.to_pairs(),
            vec![
                ("category".to_string(), "Programming".to_string()),
                ("q".to_string(), "rust".to_string()),
            ]
        );
    }
}
