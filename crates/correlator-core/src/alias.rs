// crates/correlator-core/src/alias.rs
// ============================================================================
// Module: Aliasing Resolver
// ============================================================================

//! ## Overview
//! Rewrites tool-specific namespaces and dataset URNs to canonical forms
//! using two tables loaded once at startup: an exact-match namespace alias
//! map, and an ordered list of URN patterns with `{var}`/`{var*}` segment
//! placeholders. Missing or malformed configuration degrades to the
//! identity function rather than failing startup.

use std::collections::HashMap;

use serde::Deserialize;

/// One entry of `dataset_patterns`: first-match-wins against the full
/// `"{namespace}/{name}"` URN.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetPattern {
    /// Template matched against a dataset URN. A segment `{var}` matches
    /// exactly one `/`-free segment; `{var*}` matches one or more segments,
    /// including embedded `/`, and must be the template's final segment.
    pub pattern: String,
    /// Replacement template; `{var}`/`{var*}` placeholders are substituted
    /// with the values captured from `pattern`.
    pub canonical: String,
}

/// The two lookup tables driving alias resolution.
///
/// # Invariants
/// - Resolution is idempotent: applying it twice yields the same URN.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasConfig {
    /// Exact-match replacement of a dataset's namespace segment.
    #[serde(default)]
    pub namespace_aliases: HashMap<String, String>,
    /// Ordered, first-match-wins URN rewrite rules.
    #[serde(default)]
    pub dataset_patterns: Vec<DatasetPattern>,
}

impl AliasConfig {
    /// The identity configuration: no aliases, no patterns.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Resolves `namespace` via [`Self::namespace_aliases`], falling back to
    /// the input unchanged when no alias matches.
    #[must_use]
    pub fn resolve_namespace<'a>(&'a self, namespace: &'a str) -> &'a str {
        self.namespace_aliases.get(namespace).map_or(namespace, String::as_str)
    }

    /// Resolves a full `"{namespace}/{name}"` URN against
    /// [`Self::dataset_patterns`], returning the first match's canonical
    /// rewrite, or `urn` unchanged when nothing matches.
    #[must_use]
    pub fn resolve_urn(&self, urn: &str) -> String {
        for entry in &self.dataset_patterns {
            if let Some(captures) = match_pattern(&entry.pattern, urn) {
                return substitute(&entry.canonical, &captures);
            }
        }
        urn.to_owned()
    }

    /// Resolves a `(namespace, name)` pair: first the namespace alias, then
    /// the URN pattern table over the rebuilt URN.
    #[must_use]
    pub fn resolve(&self, namespace: &str, name: &str) -> String {
        let namespace = self.resolve_namespace(namespace);
        self.resolve_urn(&format!("{namespace}/{name}"))
    }
}

/// Matches `pattern` against `urn`, returning captured variable bindings on
/// success.
fn match_pattern(pattern: &str, urn: &str) -> Option<HashMap<String, String>> {
    let pattern_segs: Vec<&str> = pattern.split('/').collect();
    let urn_segs: Vec<&str> = urn.split('/').collect();
    let mut captures = HashMap::new();

    let mut pi = 0;
    let mut ui = 0;
    while pi < pattern_segs.len() {
        let seg = pattern_segs[pi];
        if let Some(var) = star_var(seg) {
            if ui >= urn_segs.len() {
                return None;
            }
            captures.insert(var.to_owned(), urn_segs[ui..].join("/"));
            return if pi + 1 == pattern_segs.len() { Some(captures) } else { None };
        } else if let Some(var) = plain_var(seg) {
            let value = urn_segs.get(ui)?;
            captures.insert(var.to_owned(), (*value).to_owned());
            pi += 1;
            ui += 1;
        } else {
            if urn_segs.get(ui) != Some(&seg) {
                return None;
            }
            pi += 1;
            ui += 1;
        }
    }

    if ui == urn_segs.len() { Some(captures) } else { None }
}

/// Returns the variable name for a `{var*}` segment.
fn star_var(seg: &str) -> Option<&str> {
    seg.strip_prefix('{').and_then(|s| s.strip_suffix("*}"))
}

/// Returns the variable name for a plain `{var}` segment.
fn plain_var(seg: &str) -> Option<&str> {
    seg.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
}

/// Replaces every `{var}`/`{var*}` placeholder in `template` with its
/// captured value. Placeholders with no matching capture are left as-is.
fn substitute(template: &str, captures: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let token = &rest[start + 1..start + end];
        let var = token.strip_suffix('*').unwrap_or(token);
        match captures.get(var) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..=start + end]),
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}
