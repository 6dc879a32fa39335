/// Canonical relation vocabulary and predicate normalization.
///
/// LLM prose uses freeform verbs ("helps slow", "reducing"); the knowledge
/// graph stores UPPER_SNAKE_CASE relation types. Everything that compares a
/// predicate against the KG goes through [`normalize_relation`] first.

/// Relation types present in the knowledge graph.
pub const CANONICAL_RELATIONS: &[&str] = &[
    "INTERACTS_WITH",
    "AFFECTS",
    "TREATS",
    "PREVENTS",
    "INHIBITS",
    "STIMULATES",
    "ASSOCIATED_WITH",
    "CAUSES",
    "AUGMENTS",
    "PRODUCES",
    "COEXISTS_WITH",
    "DISRUPTS",
    "PREDISPOSES",
    "COMPLICATES",
];

/// Paraphrase map from cleaned lowercase verbs to canonical types.
const REL_MAP: &[(&str, &str)] = &[
    ("interact", "INTERACTS_WITH"),
    ("interacts with", "INTERACTS_WITH"),
    ("bind", "INTERACTS_WITH"),
    ("binds", "INTERACTS_WITH"),
    ("complexes with", "INTERACTS_WITH"),
    ("affect", "AFFECTS"),
    ("impact", "AFFECTS"),
    ("benefit", "AFFECTS"),
    ("improve", "AFFECTS"),
    ("have potential benefits", "AFFECTS"),
    ("increase", "AUGMENTS"),
    ("enhance", "AUGMENTS"),
    ("support", "AUGMENTS"),
    ("augment", "AUGMENTS"),
    ("stimulate", "STIMULATES"),
    ("activate", "STIMULATES"),
    ("inhibit", "INHIBITS"),
    ("suppress", "INHIBITS"),
    ("reduce", "INHIBITS"),
    ("slow", "INHIBITS"),
    ("help slow", "INHIBITS"),
    ("helps slow", "INHIBITS"),
    ("disrupt", "DISRUPTS"),
    ("impair", "DISRUPTS"),
    ("treat", "TREATS"),
    ("prevent", "PREVENTS"),
    ("protect", "PREVENTS"),
    ("cause", "CAUSES"),
    ("leads to", "CAUSES"),
    ("leading to", "CAUSES"),
    ("predispose", "PREDISPOSES"),
    ("complicate", "COMPLICATES"),
    ("produce", "PRODUCES"),
    ("coexists with", "COEXISTS_WITH"),
    ("associate", "ASSOCIATED_WITH"),
    ("associates with", "ASSOCIATED_WITH"),
    ("associated with", "ASSOCIATED_WITH"),
];

fn clean(rel: &str) -> String {
    let mut out = String::with_capacity(rel.len());
    let mut last_space = true;
    for ch in rel.trim().chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_space = false;
        } else if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        }
        // other punctuation is stripped
    }
    out.trim_end().to_string()
}

fn lookup(s: &str) -> Option<&'static str> {
    REL_MAP.iter().find(|(k, _)| *k == s).map(|(_, v)| *v)
}

/// Map a freeform predicate to its canonical relation type. Tries the
/// paraphrase map directly, then with "ing"/"ed"/"s" suffixes stripped.
/// Unknown predicates come back UPPER_SNAKE_CASEd verbatim.
pub fn normalize_relation(rel: &str) -> String {
    let s = clean(rel);
    if s.is_empty() {
        return String::new();
    }
    if let Some(canon) = lookup(&s) {
        return canon.to_string();
    }
    for suffix in ["ing", "ed", "s"] {
        if let Some(stem) = s.strip_suffix(suffix) {
            if let Some(canon) = lookup(stem) {
                return canon.to_string();
            }
        }
    }
    s.to_uppercase().replace(' ', "_")
}

/// True when `rel` is (or normalizes to) a known KG relation type.
pub fn is_canonical(rel: &str) -> bool {
    CANONICAL_RELATIONS.contains(&normalize_relation(rel).as_str())
}
