//! Broad semantic categories a linked entity has to belong to.

/// "Wikimedia disambiguation page". Never expanded: it has no useful parents.
pub const DISAMBIGUATION_PAGE: &str = "Q4167410";

/// Target type ids with their English labels.
pub const TARGET_TYPES: [(&str, &str); 27] = [
    ("Q5", "human"),
    ("Q2221906", "geographic location"),
    ("Q11862829", "academic discipline"),
    ("Q4936952", "anatomical structure"),
    ("Q12737077", "occupation"),
    ("Q29048322", "vehicle model"),
    ("Q811430", "construction"),
    ("Q47461344", "written work"),
    ("Q6999", "astronomical object"),
    ("Q11460", "clothing"),
    ("Q16521", "taxon"),
    ("Q24334685", "mythical entity"),
    ("Q31629", "type of sport"),
    ("Q28855038", "supernatural being"),
    ("Q11435", "liquid"),
    ("Q28108", "political system"),
    ("Q16334298", "group of living things"),
    ("Q43460564", "chemical entity"),
    ("Q732577", "publication"),
    ("Q271669", "landform"),
    ("Q34770", "language"),
    ("Q2198779", "unit"),
    ("Q20719696", "physico-geographical object"),
    ("Q15621286", "intellectual work"),
    ("Q39546", "tool"),
    ("Q7239", "organism"),
    ("Q2095", "food"),
];

pub fn is_target_type(entity: &str) -> bool {
    TARGET_TYPES.iter().any(|(id, _)| *id == entity)
}

pub fn target_label(entity: &str) -> Option<&'static str> {
    TARGET_TYPES
        .iter()
        .find(|(id, _)| *id == entity)
        .map(|(_, label)| *label)
}
