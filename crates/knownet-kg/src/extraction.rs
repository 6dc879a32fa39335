//! Triple extraction from annotated LLM responses.
//!
//! Responses arrive with inline markup: entities as `[name]($N1)` or
//! `[name|Category]($N1)`, relations as `[label]($R1, $N1, $N2)` where the
//! endpoint list may repeat with `;` when one relation covers several triples.
//! A trailing ` || ["entity", ...]` section lists the entities the model
//! recognized in the user's question.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A subject-predicate-object fact. All members are free text; subject and
/// object are entity names as they appeared in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// De-duplication key. Two triples are the same fact iff their
    /// concatenated members match.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.subject, self.predicate, self.object)
    }
}

/// Everything recovered from one response's prose section.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Unique triples in first-seen order.
    pub triples: Vec<Triple>,
    /// Raw category text per entity name, for entities annotated with one.
    pub entity_categories: HashMap<String, String>,
}

fn entity_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // [name]($N1) or [name|Category]($N1)
        Regex::new(r"\[([^\]|]+)(?:\|([^\]]+))?\]\(\$N(\d+)\)").unwrap()
    })
}

fn relation_regex() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // [label]($R1, $N1, $N2) with optional repeated endpoint pairs after ';'
        Regex::new(r"\[([^\]]+)\]\((\$R\d+), (.+?)\)").unwrap()
    })
}

/// Split a full response into its prose section and the question-entity list.
/// Absent or malformed trailing sections yield an empty list.
pub fn split_response(text: &str) -> (&str, Vec<String>) {
    match text.split_once("||") {
        None => (text, Vec::new()),
        Some((prose, rest)) => (prose, parse_entity_list(rest)),
    }
}

fn parse_entity_list(raw: &str) -> Vec<String> {
    let start = match raw.find('[') {
        Some(i) => i,
        None => return Vec::new(),
    };
    let end = match raw.rfind(']') {
        Some(i) if i > start => i,
        _ => return Vec::new(),
    };
    serde_json::from_str::<Vec<String>>(&raw[start..=end]).unwrap_or_default()
}

/// Scan prose for annotated entities and relations and assemble triples.
///
/// Endpoint pairs referencing an undeclared entity code are dropped. An
/// entity re-declaring a code overwrites the earlier declaration. Triples
/// are de-duplicated by [`Triple::key`], preserving first-seen order.
pub fn extract_annotations(prose: &str) -> Extraction {
    let mut by_code: HashMap<String, String> = HashMap::new();
    let mut categories: HashMap<String, String> = HashMap::new();

    for cap in entity_regex().captures_iter(prose) {
        let name = cap[1].to_string();
        let code = format!("$N{}", &cap[3]);
        if let Some(category) = cap.get(2) {
            categories.insert(name.clone(), category.as_str().trim().to_string());
        }
        by_code.insert(code, name);
    }

    let mut triples = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for cap in relation_regex().captures_iter(prose) {
        let label = cap[1].to_string();
        for pair in cap[3].split(';') {
            let codes: Vec<&str> = pair.trim().split(',').map(str::trim).collect();
            if codes.len() != 2 {
                continue;
            }
            let (Some(subject), Some(object)) = (by_code.get(codes[0]), by_code.get(codes[1]))
            else {
                continue;
            };
            let triple = Triple::new(subject.clone(), label.clone(), object.clone());
            if seen.insert(triple.key()) {
                triples.push(triple);
            }
        }
    }

    Extraction { triples, entity_categories: categories }
}
