/// Entity category taxonomy mirroring the knowledge graph's node labels,
/// plus the color mapping used by graph clients.

use serde::{Deserialize, Serialize};

/// Canonical entity categories. LLM output and KG records both fold into
/// these via [`EntityCategory::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    #[serde(rename = "Dietary Supplement")]
    DietarySupplement,
    Disorders,
    Drug,
    #[serde(rename = "Genes & Molecular Sequences")]
    GenesMolecularSequences,
    Anatomy,
    #[serde(rename = "Living Beings")]
    LivingBeings,
    Physiology,
    #[serde(rename = "Chemicals & Drugs")]
    ChemicalsDrugs,
    Procedures,
    #[serde(rename = "Activities & Behaviors")]
    ActivitiesBehaviors,
    #[serde(rename = "Concepts & Ideas")]
    ConceptsIdeas,
    Device,
    Object,
    /// Fallback bucket for entities with no informative category.
    Objects,
    Organization,
    Phenomenon,
    #[serde(rename = "Complementary and Integrative Health")]
    IntegrativeHealth,
    #[serde(rename = "NotFind")]
    NotFound,
}

/// Grays are reserved for uncategorized nodes and never used as a category color.
pub const RESERVED_GRAYS: &[&str] = &["#e5e7eb", "#dddddd"];

/// Label variants the LLM or KG is allowed to be sloppy about.
const CATEGORY_ALIASES: &[(&str, EntityCategory)] = &[
    ("disease", EntityCategory::Disorders),
    ("diseases", EntityCategory::Disorders),
    ("disorder", EntityCategory::Disorders),
    ("disorders", EntityCategory::Disorders),
    ("drug", EntityCategory::Drug),
    ("drugs", EntityCategory::Drug),
    ("dietary supplement", EntityCategory::DietarySupplement),
    ("supplement", EntityCategory::DietarySupplement),
    ("gene", EntityCategory::GenesMolecularSequences),
    ("genes", EntityCategory::GenesMolecularSequences),
    ("genes & molecular sequences", EntityCategory::GenesMolecularSequences),
    ("celltype", EntityCategory::Anatomy),
    ("cell type", EntityCategory::Anatomy),
    ("anatomy", EntityCategory::Anatomy),
    ("living beings", EntityCategory::LivingBeings),
    ("process", EntityCategory::Physiology),
    ("physiology", EntityCategory::Physiology),
    ("symptom", EntityCategory::Physiology),
    ("chemicals & drugs", EntityCategory::ChemicalsDrugs),
    ("procedures", EntityCategory::Procedures),
    ("activities & behaviors", EntityCategory::ActivitiesBehaviors),
    ("riskfactor", EntityCategory::ConceptsIdeas),
    ("risk factor", EntityCategory::ConceptsIdeas),
    ("concepts & ideas", EntityCategory::ConceptsIdeas),
    ("device", EntityCategory::Device),
    ("object", EntityCategory::Object),
    ("objects", EntityCategory::Objects),
    ("organization", EntityCategory::Organization),
    ("phenomenon", EntityCategory::Phenomenon),
    ("complementary and integrative health", EntityCategory::IntegrativeHealth),
    ("notfind", EntityCategory::NotFound),
];

/// Keyword tables for guessing a category from the entity name when the
/// LLM omitted the annotation.
const SUPPLEMENT_KEYWORDS: &[&str] = &[
    "vitamin", "omega-3", "omega 3", "fish oil", "coenzyme", "ginkgo",
    "curcumin", "resveratrol",
];
const DISORDER_KEYWORDS: &[&str] = &[
    "alzheimer", "parkinson", "diabetes", "cancer", "disease",
];
const GENE_KEYWORDS: &[&str] = &["apoe", "apo e", "tp53", "psen1", "psen2"];
const ANATOMY_KEYWORDS: &[&str] = &[
    "neuron", "microglia", "astrocyt", "hippocamp", "cortex", "synapse", "brain",
];
const PHYSIOLOGY_KEYWORDS: &[&str] = &[
    "inflammation", "oxidative stress", "synaptic", "cognitive", "plasticity", "stress",
];
const CONCEPT_KEYWORDS: &[&str] = &[
    "lifestyle", "cardiovascular", "hypertension", "injury", "traumatic", "risk", "age",
];

impl EntityCategory {
    /// The display label stored in the KG and shown by clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::DietarySupplement       => "Dietary Supplement",
            EntityCategory::Disorders               => "Disorders",
            EntityCategory::Drug                    => "Drug",
            EntityCategory::GenesMolecularSequences => "Genes & Molecular Sequences",
            EntityCategory::Anatomy                 => "Anatomy",
            EntityCategory::LivingBeings            => "Living Beings",
            EntityCategory::Physiology              => "Physiology",
            EntityCategory::ChemicalsDrugs          => "Chemicals & Drugs",
            EntityCategory::Procedures              => "Procedures",
            EntityCategory::ActivitiesBehaviors     => "Activities & Behaviors",
            EntityCategory::ConceptsIdeas           => "Concepts & Ideas",
            EntityCategory::Device                  => "Device",
            EntityCategory::Object                  => "Object",
            EntityCategory::Objects                 => "Objects",
            EntityCategory::Organization            => "Organization",
            EntityCategory::Phenomenon              => "Phenomenon",
            EntityCategory::IntegrativeHealth       => "Complementary and Integrative Health",
            EntityCategory::NotFound                => "NotFind",
        }
    }

    /// Canonical display color for this category.
    pub fn color(&self) -> &'static str {
        match self {
            EntityCategory::DietarySupplement       => "#91b9f4",
            EntityCategory::Disorders               => "#f28e2c",
            EntityCategory::Drug                    => "#e15759",
            EntityCategory::GenesMolecularSequences => "#76b7b2",
            EntityCategory::Anatomy                 => "#59a14f",
            EntityCategory::LivingBeings            => "#edc949",
            EntityCategory::Physiology              => "#af7aa1",
            EntityCategory::ChemicalsDrugs          => "#ff9da7",
            EntityCategory::Procedures              => "#9c755f",
            EntityCategory::ActivitiesBehaviors     => "#bab0ab",
            EntityCategory::ConceptsIdeas           => "#4e79a7",
            EntityCategory::Device                  => "#f28e2c",
            EntityCategory::Object                  => "#e15759",
            EntityCategory::Objects                 => "#dddddd",
            EntityCategory::Organization            => "#76b7b2",
            EntityCategory::Phenomenon              => "#59a14f",
            EntityCategory::IntegrativeHealth       => "#ff0000",
            EntityCategory::NotFound                => "#dddddd",
        }
    }

    /// True when this category carries no real information about the entity.
    pub fn is_uninformative(&self) -> bool {
        matches!(self, EntityCategory::Objects | EntityCategory::NotFound)
    }

    /// Parse a raw category label: alias table first, then exact canonical
    /// labels case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        for (alias, cat) in CATEGORY_ALIASES {
            if key == *alias {
                return Some(cat.clone());
            }
        }
        ALL_CATEGORIES
            .iter()
            .find(|c| c.as_str().to_lowercase() == key)
            .cloned()
    }

    /// Guess a category from the entity name alone.
    pub fn guess_from_name(name: &str) -> Option<Self> {
        let n = name.to_lowercase();
        let hit = |keys: &[&str]| keys.iter().any(|k| n.contains(k));
        if hit(SUPPLEMENT_KEYWORDS) {
            Some(EntityCategory::DietarySupplement)
        } else if hit(DISORDER_KEYWORDS) {
            Some(EntityCategory::Disorders)
        } else if hit(GENE_KEYWORDS) {
            Some(EntityCategory::GenesMolecularSequences)
        } else if hit(ANATOMY_KEYWORDS) {
            Some(EntityCategory::Anatomy)
        } else if hit(PHYSIOLOGY_KEYWORDS) {
            Some(EntityCategory::Physiology)
        } else if hit(CONCEPT_KEYWORDS) {
            Some(EntityCategory::ConceptsIdeas)
        } else {
            None
        }
    }

    /// Normalize a possibly-missing raw category for an entity: alias/canonical
    /// parse, then name heuristics, then the Objects fallback bucket.
    pub fn normalize(name: &str, raw: Option<&str>) -> Self {
        raw.and_then(Self::parse)
            .or_else(|| Self::guess_from_name(name))
            .unwrap_or(EntityCategory::Objects)
    }
}

const ALL_CATEGORIES: &[EntityCategory] = &[
    EntityCategory::DietarySupplement,
    EntityCategory::Disorders,
    EntityCategory::Drug,
    EntityCategory::GenesMolecularSequences,
    EntityCategory::Anatomy,
    EntityCategory::LivingBeings,
    EntityCategory::Physiology,
    EntityCategory::ChemicalsDrugs,
    EntityCategory::Procedures,
    EntityCategory::ActivitiesBehaviors,
    EntityCategory::ConceptsIdeas,
    EntityCategory::Device,
    EntityCategory::Object,
    EntityCategory::Objects,
    EntityCategory::Organization,
    EntityCategory::Phenomenon,
    EntityCategory::IntegrativeHealth,
    EntityCategory::NotFound,
];

/// Non-gray palette used for deterministic fallback colors, deduplicated in
/// declaration order.
fn fallback_palette() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for cat in ALL_CATEGORIES {
        let c = cat.color();
        if !RESERVED_GRAYS.contains(&c) && !seen.contains(&c) {
            seen.push(c);
        }
    }
    seen
}

fn djb2(s: &str) -> u32 {
    let mut h: u32 = 5381;
    for b in s.bytes() {
        h = h.wrapping_shl(5).wrapping_add(h).wrapping_add(b as u32);
    }
    h
}

/// Deterministic non-gray color keyed on the entity name. Stable per name
/// across runs so nodes never flicker between renders.
pub fn deterministic_color(name: &str) -> &'static str {
    let basis = name.trim();
    let basis = if basis.is_empty() { "unknown" } else { basis };
    let palette = fallback_palette();
    palette[(djb2(basis) as usize) % palette.len()]
}

/// Resolve the display color for an entity: the canonical category color if
/// it is informative, otherwise a deterministic color from the name.
pub fn color_for_category(category: &EntityCategory, name_hint: &str) -> &'static str {
    let canonical = category.color();
    if RESERVED_GRAYS.contains(&canonical) {
        deterministic_color(name_hint)
    } else {
        canonical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_folding() {
        assert_eq!(EntityCategory::parse("disease"), Some(EntityCategory::Disorders));
        assert_eq!(EntityCategory::parse("Supplement"), Some(EntityCategory::DietarySupplement));
        assert_eq!(EntityCategory::parse("SYMPTOM"), Some(EntityCategory::Physiology));
        assert_eq!(EntityCategory::parse("made-up label"), None);
    }

    #[test]
    fn test_canonical_label_roundtrip() {
        assert_eq!(
            EntityCategory::parse("Genes & Molecular Sequences"),
            Some(EntityCategory::GenesMolecularSequences)
        );
    }

    #[test]
    fn test_guess_from_name() {
        assert_eq!(
            EntityCategory::guess_from_name("Coenzyme Q10"),
            Some(EntityCategory::DietarySupplement)
        );
        assert_eq!(
            EntityCategory::guess_from_name("Alzheimer's disease"),
            Some(EntityCategory::Disorders)
        );
        assert_eq!(EntityCategory::guess_from_name("lavender"), None);
    }

    #[test]
    fn test_normalize_falls_back_to_objects() {
        assert_eq!(EntityCategory::normalize("lavender", None), EntityCategory::Objects);
        assert_eq!(
            EntityCategory::normalize("fish oil", Some("nonsense")),
            EntityCategory::DietarySupplement
        );
    }

    #[test]
    fn test_deterministic_color_is_stable_and_non_gray() {
        let a = deterministic_color("Omega-3 fatty acids");
        let b = deterministic_color("Omega-3 fatty acids");
        assert_eq!(a, b);
        assert!(!RESERVED_GRAYS.contains(&a));
    }

    #[test]
    fn test_color_for_gray_category_uses_name() {
        let c = color_for_category(&EntityCategory::Objects, "lavender");
        assert!(!RESERVED_GRAYS.contains(&c));
        assert_eq!(color_for_category(&EntityCategory::Disorders, "x"), "#f28e2c");
    }
}
