// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Two-pass templating for configuration strings.
//!
//! # Load time
//!
//! The raw configuration text is scanned for `{{ func "ARG" }}` blocks before
//! it is parsed:
//!
//! * `env` - replaced with the environment variable, or nothing when unset
//! * `secret` - replaced with the plaintext from the secret store
//! * `macro` - replaced with a deferred `___MACRO___NAME___` placeholder
//! * `context` - replaced with a deferred `___CONTEXT___KEY___` placeholder
//!
//! # Run time
//!
//! Fields typed as [`Template`] keep the deferred placeholders.
//! [`Template::resolve`] expands macros on every call and context placeholders
//! only when a record is supplied. Within one call every occurrence of the
//! same macro expands to the same value.

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

use crate::config::consts::{CONTEXT_SENTINEL, MACRO_SENTINEL, SENTINEL_SUFFIX};
use crate::errors::{ConfigError, TemplateError};
use crate::query::Query;
use crate::record::Record;

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(.*?)\}\}").expect("static regex"))
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*([A-Za-z_][A-Za-z0-9_]*)\s+"([^"]*)"\s*$"#).expect("static regex")
    })
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"___(MACRO|CONTEXT)___(.+?)___").expect("static regex"))
}

/// Values a `{{ macro "NAME" }}` call can defer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    UnixTime,
    Timestamp,
    MicroTimestamp,
    Uuid,
}

impl MacroKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unixtime" => Some(Self::UnixTime),
            "timestamp" => Some(Self::Timestamp),
            "microtimestamp" => Some(Self::MicroTimestamp),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UnixTime => "unixtime",
            Self::Timestamp => "timestamp",
            Self::MicroTimestamp => "microtimestamp",
            Self::Uuid => "uuid",
        }
    }

    /// Produces a fresh value for this macro.
    pub fn generate(&self) -> String {
        let now = Utc::now();
        match self {
            Self::UnixTime => now.timestamp().to_string(),
            Self::Timestamp => now.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::MicroTimestamp => now.to_rfc3339_opts(SecondsFormat::Micros, true),
            Self::Uuid => uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Context keys end up inside `___CONTEXT___KEY___`, so they must not contain
/// a run of underscores or touch the terminator.
fn is_valid_context_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !key.contains("__")
        && !key.starts_with('_')
        && !key.ends_with('_')
}

fn parse_call(block: &str) -> Result<(String, String), ConfigError> {
    let inner = &block[2..block.len() - 2];
    let captures = call_regex()
        .captures(inner)
        .ok_or_else(|| ConfigError::MalformedTemplate(block.to_string()))?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}

/// Rejects raw text that already contains placeholder sentinels.
pub(crate) fn check_reserved(raw: &str) -> Result<(), ConfigError> {
    for sentinel in [MACRO_SENTINEL, CONTEXT_SENTINEL] {
        if raw.contains(sentinel) {
            return Err(ConfigError::ReservedPlaceholder(sentinel.to_string()));
        }
    }
    Ok(())
}

/// Paths of every `{{ secret "PATH" }}` call, deduplicated, in source order.
pub(crate) fn secret_paths(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut seen = BTreeSet::new();
    let mut paths = Vec::new();
    for block in block_regex().find_iter(raw) {
        let (func, arg) = parse_call(block.as_str())?;
        if func == "secret" && seen.insert(arg.clone()) {
            paths.push(arg);
        }
    }
    Ok(paths)
}

/// Performs load-time expansion.
///
/// `secrets` must already hold a value for every path returned by
/// [`secret_paths`].
pub(crate) fn expand(
    raw: &str,
    env: &dyn Fn(&str) -> Option<String>,
    secrets: &HashMap<String, String>,
) -> Result<String, ConfigError> {
    check_reserved(raw)?;

    let mut out = String::with_capacity(raw.len());
    let mut last = 0;
    for block in block_regex().find_iter(raw) {
        out.push_str(&raw[last..block.start()]);
        last = block.end();

        let (func, arg) = parse_call(block.as_str())?;
        match func.as_str() {
            "env" => out.push_str(&env(&arg).unwrap_or_default()),
            "secret" => {
                let value = secrets.get(&arg).ok_or_else(|| ConfigError::Secret {
                    path: arg.clone(),
                    reason: "secret was not fetched".to_string(),
                })?;
                out.push_str(value);
            }
            "macro" => {
                let kind = MacroKind::from_name(&arg).ok_or(ConfigError::UnknownMacro(arg))?;
                out.push_str(MACRO_SENTINEL);
                out.push_str(kind.name());
                out.push_str(SENTINEL_SUFFIX);
            }
            "context" => {
                if !is_valid_context_key(&arg) {
                    return Err(ConfigError::MalformedTemplate(block.as_str().to_string()));
                }
                out.push_str(CONTEXT_SENTINEL);
                out.push_str(&arg);
                out.push_str(SENTINEL_SUFFIX);
            }
            _ => return Err(ConfigError::UnknownTemplateFunction(func)),
        }
    }
    out.push_str(&raw[last..]);
    Ok(out)
}

/// A configuration string that may hold deferred placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The string as loaded, placeholders included.
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Whether resolving can produce anything other than [`Template::raw`].
    pub fn is_deferred(&self) -> bool {
        placeholder_regex().is_match(&self.0)
    }

    /// Whether resolving needs a record.
    pub fn uses_context(&self) -> bool {
        self.0.contains(CONTEXT_SENTINEL)
    }

    /// Expands macros, and context placeholders when `record` is given.
    ///
    /// Fails with every missing key when the record lacks any referenced
    /// context value.
    pub fn resolve(&self, record: Option<&Record>) -> Result<String, TemplateError> {
        if !self.is_deferred() {
            return Ok(self.0.clone());
        }

        let mut macros: HashMap<MacroKind, String> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        let mut out = String::with_capacity(self.0.len());
        let mut last = 0;

        for captures in placeholder_regex().captures_iter(&self.0) {
            let whole = captures.get(0).map(|m| (m.start(), m.end(), m.as_str()));
            let Some((start, end, text)) = whole else {
                continue;
            };
            out.push_str(&self.0[last..start]);
            last = end;

            let name = &captures[2];
            match &captures[1] {
                "MACRO" => match MacroKind::from_name(name) {
                    Some(kind) => out.push_str(macros.entry(kind).or_insert_with(|| kind.generate())),
                    None => out.push_str(text),
                },
                _ => match record {
                    Some(record) => match record.context_value(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            if !missing.iter().any(|m| m == name) {
                                missing.push(name.to_string());
                            }
                        }
                    },
                    None => out.push_str(text),
                },
            }
        }
        out.push_str(&self.0[last..]);

        if !missing.is_empty() {
            return Err(TemplateError::MissingContextKeys(missing));
        }
        Ok(out)
    }

    /// Resolves the template and compiles the result as a query.
    pub fn resolve_to_query(&self, record: Option<&Record>) -> Result<Query, TemplateError> {
        let resolved = self.resolve(record)?;
        Ok(Query::parse(&resolved)?)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Template {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Template {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn expand_simple(raw: &str) -> Result<String, ConfigError> {
        expand(raw, &no_env, &HashMap::new())
    }

    #[test]
    fn test_expand_env() {
        let env = |key: &str| (key == "HOST").then(|| "example.org".to_string());
        let out = expand("url: http://{{ env \"HOST\" }}/{{env \"MISSING\"}}", &env, &HashMap::new())
            .unwrap();
        assert_eq!(out, "url: http://example.org/");
    }

    #[test]
    fn test_expand_secret() {
        let secrets = HashMap::from([("db/password".to_string(), "hunter2".to_string())]);
        let out = expand("pw: {{ secret \"db/password\" }}", &no_env, &secrets).unwrap();
        assert_eq!(out, "pw: hunter2");
    }

    #[test]
    fn test_expand_emits_placeholders() {
        let out = expand_simple("id: {{ macro \"uuid\" }}-{{ context \"user\" }}").unwrap();
        assert_eq!(out, "id: ___MACRO___uuid___-___CONTEXT___user___");
    }

    #[test]
    fn test_expand_rejections() {
        assert!(matches!(
            expand_simple("{{ macro \"nope\" }}"),
            Err(ConfigError::UnknownMacro(name)) if name == "nope"
        ));
        assert!(matches!(
            expand_simple("{{ shell \"ls\" }}"),
            Err(ConfigError::UnknownTemplateFunction(name)) if name == "shell"
        ));
        assert!(matches!(
            expand_simple("{{ env HOST }}"),
            Err(ConfigError::MalformedTemplate(_))
        ));
        assert!(matches!(
            expand_simple("x: ___MACRO___uuid___"),
            Err(ConfigError::ReservedPlaceholder(_))
        ));
        assert!(matches!(
            expand_simple("{{ context \"bad__key\" }}"),
            Err(ConfigError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_secret_paths_deduplicates() {
        let raw = "{{ secret \"a\" }} {{ env \"X\" }} {{ secret \"b\" }} {{ secret \"a\" }}";
        assert_eq!(secret_paths(raw).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_resolve_caches_macro_within_one_evaluation() {
        let template = Template::new("___MACRO___uuid___/___MACRO___uuid___");
        let first = template.resolve(None).unwrap();
        let (left, right) = first.split_once('/').unwrap();
        assert_eq!(left, right);
        assert_eq!(left.len(), 36);

        let second = template.resolve(None).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_resolve_context() {
        let template = Template::new("hello ___CONTEXT___who___ from ___CONTEXT___city___");
        let mut record = Record::new(1, "src", "x");
        record.context.insert("who".to_string(), "\"alice\"".to_string());
        record.context.insert("city".to_string(), "Paris".to_string());

        assert_eq!(template.resolve(Some(&record)).unwrap(), "hello alice from Paris");
    }

    #[test]
    fn test_resolve_without_record_keeps_context_placeholder() {
        let template = Template::new("k=___CONTEXT___who___ t=___MACRO___unixtime___");
        let out = template.resolve(None).unwrap();
        assert!(out.starts_with("k=___CONTEXT___who___ t="));
        assert!(!out.contains("MACRO"));
    }

    #[test]
    fn test_resolve_reports_every_missing_key() {
        let template = Template::new("___CONTEXT___a___ ___CONTEXT___b___ ___CONTEXT___a___ ___CONTEXT___c___");
        let mut record = Record::new(1, "src", "x");
        record.context.insert("b".to_string(), "1".to_string());

        let err = template.resolve(Some(&record)).unwrap_err();
        assert_eq!(err, TemplateError::MissingContextKeys(vec!["a".into(), "c".into()]));
        assert_eq!(err.to_string(), "context keys were not set: a, c");
    }

    #[test]
    fn test_resolve_to_query() {
        let template = Template::new(".___CONTEXT___field___");
        let mut record = Record::new(1, "src", "x");
        record.context.insert("field".to_string(), "\"user\"".to_string());

        let query = template.resolve_to_query(Some(&record)).unwrap();
        assert_eq!(query.source(), ".user");
    }

    #[test]
    fn test_macro_kinds() {
        for name in ["unixtime", "timestamp", "microtimestamp", "uuid"] {
            let kind = MacroKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
            assert!(!kind.generate().is_empty());
        }
        assert!(MacroKind::from_name("date").is_none());
    }
}
