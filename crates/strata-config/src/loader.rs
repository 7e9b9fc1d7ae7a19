//! Loading fragment files into [`ConfigFragment`]s.
//!
//! A fragment file is YAML. A file with no `---` separators is one anonymous
//! fragment whose whole content is payload. Otherwise the documents pair up
//! as header/payload:
//!
//! ```yaml
//! ---
//! name: coreroutes
//! after: 'framework/*'
//! only:
//!   moduleexists: cms
//! ---
//! Director:
//!   rules:
//!     'admin': AdminController
//! ```

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::fragment::{ConfigFragment, FragmentMatcher};
use crate::predicate::PredicateSet;

/// Parse one fragment file.
///
/// `module` is the owning module's name and `file` the file stem; together
/// with each fragment's name they form the identities ordering rules match
/// against.
pub fn load_fragment_file(module: &str, file: &str, text: &str) -> Result<Vec<ConfigFragment>> {
    let documents = split_documents(text);

    let parse = |doc: &str| -> Result<Value> {
        if doc.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(doc).map_err(|source| ConfigError::Yaml {
            file: format!("{module}/{file}"),
            source,
        })
    };

    match documents {
        Documents::Single(payload) => Ok(vec![ConfigFragment {
            module: module.to_string(),
            file: file.to_string(),
            name: "anonymous-1".to_string(),
            payload: normalize_payload(parse(payload)?),
            before: Vec::new(),
            after: Vec::new(),
            only: None,
            except: None,
        }]),
        Documents::Paired(docs) => {
            if docs.len() % 2 != 0 {
                return Err(ConfigError::OddDocumentCount {
                    file: format!("{module}/{file}"),
                    count: docs.len(),
                });
            }

            let mut fragments = Vec::with_capacity(docs.len() / 2);
            for (idx, pair) in docs.chunks(2).enumerate() {
                let header = parse(pair[0])?;
                let payload = normalize_payload(parse(pair[1])?);
                fragments.push(fragment_from_header(
                    module,
                    file,
                    idx + 1,
                    &header,
                    payload,
                ));
            }
            Ok(fragments)
        }
    }
}

enum Documents<'a> {
    /// No separators: the whole file is one payload.
    Single(&'a str),
    Paired(Vec<&'a str>),
}

/// Split on `---` separator lines. A leading blank document (the common
/// "file starts with ---" case) is dropped.
fn split_documents(text: &str) -> Documents<'_> {
    let mut docs: Vec<&str> = Vec::new();
    let mut start = 0usize;
    let mut any_separator = false;

    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim() == "---" {
            any_separator = true;
            docs.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    docs.push(&text[start..]);

    if !any_separator {
        return Documents::Single(text);
    }
    if docs
        .first()
        .is_some_and(|first| first.trim().is_empty())
    {
        docs.remove(0);
    }
    Documents::Paired(docs)
}

fn fragment_from_header(
    module: &str,
    file: &str,
    ordinal: usize,
    header: &Value,
    payload: Value,
) -> ConfigFragment {
    // Header keys are matched lower-cased.
    let get = |wanted: &str| -> Option<&Value> {
        header.as_object().and_then(|map| {
            map.iter()
                .find(|(key, _)| key.to_lowercase() == wanted)
                .map(|(_, value)| value)
        })
    };

    let name = get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("anonymous-{ordinal}"));

    ConfigFragment {
        module: module.to_string(),
        file: file.to_string(),
        name,
        payload,
        before: get("before").map(parse_matchers).unwrap_or_default(),
        after: get("after").map(parse_matchers).unwrap_or_default(),
        only: get("only").map(PredicateSet::from_value),
        except: get("except").map(PredicateSet::from_value),
    }
}

/// `before`/`after` accept a rule string, a comma-separated rule string, a
/// list of either, or an explicit `{module, file, name}` mapping.
fn parse_matchers(value: &Value) -> Vec<FragmentMatcher> {
    match value {
        Value::String(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .map(FragmentMatcher::parse)
            .collect(),
        Value::Array(items) => items.iter().flat_map(parse_matchers).collect(),
        Value::Object(map) => {
            let part = |key: &str| {
                map.iter()
                    .find(|(k, _)| k.to_lowercase() == key)
                    .and_then(|(_, v)| v.as_str())
                    .map(str::to_string)
            };
            let mut matcher = FragmentMatcher::default();
            if let Some(module) = part("module") {
                matcher.module = module;
            }
            if let Some(file) = part("file") {
                matcher.file = file;
            }
            if let Some(name) = part("name") {
                matcher.name = name;
            }
            vec![matcher]
        }
        _ => Vec::new(),
    }
}

/// Payloads are class→property maps; an empty document is an empty map.
fn normalize_payload(value: Value) -> Value {
    match value {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn single_document_is_anonymous() {
        let fragments = load_fragment_file("app", "config", "Page:\n  cms: true\n").unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].name, "anonymous-1");
        assert_eq!(fragments[0].payload, json!({"Page": {"cms": true}}));
        assert!(fragments[0].before.is_empty());
    }

    #[test]
    fn paired_documents_with_headers() {
        let text = r#"---
Name: routes
After: 'framework/*'
---
Director:
  rules: []
---
name: admin
before: '#routes'
only:
  moduleexists: cms
---
Admin:
  enabled: true
"#;
        let fragments = load_fragment_file("app", "config", text).unwrap();
        assert_eq!(fragments.len(), 2);

        assert_eq!(fragments[0].name, "routes");
        assert_eq!(fragments[0].after.len(), 1);
        assert_eq!(fragments[0].after[0].module, "framework");
        assert_eq!(fragments[0].after[0].file, "*");

        assert_eq!(fragments[1].name, "admin");
        assert_eq!(fragments[1].before[0].name, "routes");
        let only = fragments[1].only.as_ref().unwrap();
        assert_eq!(only.statics.len(), 1);
        assert!(only.variants.is_empty());
    }

    #[test]
    fn odd_document_count_is_fatal() {
        let text = "---\nName: lonely\n---\npayload: 1\n---\nextra: true\n";
        let err = load_fragment_file("app", "broken", text).unwrap_err();
        match err {
            ConfigError::OddDocumentCount { file, count } => {
                assert_eq!(file, "app/broken");
                assert_eq!(count, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn anonymous_names_are_numbered_per_file() {
        let text = "---\n{}\n---\na: 1\n---\n{}\n---\nb: 2\n";
        let fragments = load_fragment_file("app", "config", text).unwrap();
        assert_eq!(fragments[0].name, "anonymous-1");
        assert_eq!(fragments[1].name, "anonymous-2");
    }

    #[test]
    fn comma_separated_and_list_rules() {
        let text = "---\nbefore: 'cms/*, framework/routes'\nafter:\n  - '#base'\n  - module: app\n    name: extra\n---\n{}\n";
        let fragments = load_fragment_file("app", "config", text).unwrap();
        let f = &fragments[0];
        assert_eq!(f.before.len(), 2);
        assert_eq!(f.before[0].module, "cms");
        assert_eq!(f.before[1].file, "routes");
        assert_eq!(f.after.len(), 2);
        assert_eq!(f.after[0].name, "base");
        assert_eq!(f.after[1].module, "app");
        assert_eq!(f.after[1].name, "extra");
        assert_eq!(f.after[1].file, "*");
    }

    #[test]
    fn empty_payload_is_an_empty_map() {
        let text = "---\nName: empty\n---\n";
        let fragments = load_fragment_file("app", "config", text).unwrap();
        assert_eq!(fragments[0].payload, json!({}));
    }

    #[test]
    fn yaml_errors_name_the_file() {
        let err = load_fragment_file("app", "bad", ": not: [valid").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
        assert!(err.to_string().contains("app/bad"));
    }
}
