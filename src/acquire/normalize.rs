// src/acquire/normalize.rs
//! Field normalizer: maps provider-specific JSON trees onto `ProfileRecord`.
//!
//! Each canonical field has a priority-ordered candidate list. The first
//! candidate that resolves to a non-empty string wins; otherwise the field
//! falls back to its placeholder. Missing path segments resolve to "empty"
//! and never error. The mapping is pure.

use serde_json::Value;

use super::types::ProfileRecord;

/// Provider payloads the crate understands. Untyped bodies never leave this
/// module: they are consumed by `normalize` and dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProviderPayload {
    /// One dataset item of the Apify profile-detail actor.
    Apify(Value),
    /// One `data[]` entry of a PhantomBuster container output.
    PhantomBuster(Value),
    /// Body of the PhantomBuster direct profile endpoint.
    PhantomDirect(Value),
}

/// One way of pulling a string out of a payload.
#[derive(Debug, Clone, Copy)]
pub enum Candidate {
    /// Dotted path; numeric segments index into arrays (`experience.0.title`).
    Path(&'static str),
    /// Non-empty values of all paths joined with a space (`first_name last_name`).
    Join(&'static [&'static str]),
    /// First element of the list at `list`, then its first non-empty sub-field.
    FirstOf {
        list: &'static str,
        fields: &'static [&'static str],
    },
}

/// Candidate table for one payload schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidates {
    pub full_name: &'static [Candidate],
    pub headline: &'static [Candidate],
    pub about: &'static [Candidate],
    pub recent_post: &'static [Candidate],
}

use Candidate::{FirstOf, Join, Path};

pub const APIFY_FIELDS: FieldCandidates = FieldCandidates {
    full_name: &[
        Path("basic_info.fullname"),
        Join(&["basic_info.first_name", "basic_info.last_name"]),
        Path("fullName"),
    ],
    headline: &[
        Path("basic_info.headline"),
        Path("headline"),
        Path("experience.0.title"),
    ],
    about: &[Path("basic_info.about"), Path("about"), Path("summary")],
    recent_post: &[
        FirstOf {
            list: "recentPosts",
            fields: &["text", "content", "commentary"],
        },
        FirstOf {
            list: "posts",
            fields: &["text", "content", "commentary"],
        },
        FirstOf {
            list: "activities",
            fields: &["text", "description", "commentary"],
        },
        Path("recentActivity"),
        FirstOf {
            list: "activity",
            fields: &["text", "content"],
        },
        Path("latestPost.text"),
        Path("latestPost.content"),
    ],
};

pub const PHANTOMBUSTER_FIELDS: FieldCandidates = FieldCandidates {
    full_name: &[Path("fullName"), Path("name")],
    headline: &[Path("headline"), Path("title")],
    about: &[Path("description"), Path("about")],
    recent_post: &[Path("lastPost"), Path("recentActivity")],
};

pub const PHANTOM_DIRECT_FIELDS: FieldCandidates = FieldCandidates {
    full_name: &[Path("fullName")],
    headline: &[Path("headline")],
    about: &[Path("about")],
    recent_post: &[Path("recentPost")],
};

impl RawProviderPayload {
    fn parts(&self) -> (&Value, &'static FieldCandidates) {
        match self {
            RawProviderPayload::Apify(v) => (v, &APIFY_FIELDS),
            RawProviderPayload::PhantomBuster(v) => (v, &PHANTOMBUSTER_FIELDS),
            RawProviderPayload::PhantomDirect(v) => (v, &PHANTOM_DIRECT_FIELDS),
        }
    }

    /// True when the body carries nothing to normalize (null, `{}`, `[]`).
    pub fn is_empty(&self) -> bool {
        match self.parts().0 {
            Value::Null => true,
            Value::Object(m) => m.is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        }
    }
}

/// Normalize a payload into the canonical record using its schema's candidate table.
pub fn normalize(payload: &RawProviderPayload) -> ProfileRecord {
    let (root, table) = payload.parts();
    normalize_with(root, table)
}

pub fn normalize_with(root: &Value, table: &FieldCandidates) -> ProfileRecord {
    ProfileRecord::new(
        first_match(root, table.full_name),
        first_match(root, table.headline),
        first_match(root, table.about),
        first_match(root, table.recent_post),
    )
}

/// Evaluate candidates in order; first non-empty wins.
pub fn first_match(root: &Value, candidates: &[Candidate]) -> Option<String> {
    candidates.iter().find_map(|c| resolve(root, c))
}

/// First non-empty value produced by `pick` over `items`, in order.
/// Live-document locators follow the same rule in `sources::live`, but
/// asynchronously, so they do not go through here.
pub fn first_non_empty<T, F>(items: &[T], mut pick: F) -> Option<String>
where
    F: FnMut(&T) -> Option<String>,
{
    items
        .iter()
        .filter_map(&mut pick)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn resolve(root: &Value, candidate: &Candidate) -> Option<String> {
    match candidate {
        Path(p) => lookup(root, p).and_then(text_of),
        Join(paths) => {
            let parts: Vec<String> = paths
                .iter()
                .filter_map(|p| lookup(root, p).and_then(text_of))
                .collect();
            non_empty(parts.join(" "))
        }
        FirstOf { list, fields } => {
            let first = lookup(root, list)?.as_array()?.first()?;
            first_non_empty(fields, |f| first.get(*f).and_then(text_of))
        }
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |cur, seg| match cur {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Reduce a value to text: strings as-is, numbers stringified, a list reduced
/// to its first element (and that element's `text` when it is an object).
fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => non_empty(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(text_of),
        Value::Object(map) => map.get("text").and_then(text_of),
        Value::Null | Value::Bool(_) => None,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
