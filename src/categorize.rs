//! Keyword-based category detection
//!
//! Conversations are classified by scanning the title and message text for
//! fixed keyword sets. Rule order is fixed and the first matching rule wins;
//! when nothing matches the conversation falls back to [`DEFAULT_CATEGORY`].

/// Category assigned when no keyword rule matches
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Fixed keyword rules, evaluated in order. First match short-circuits.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "housing court case",
        &["housing court", "eviction", "lease", "landlord", "tenant"],
    ),
    ("dog", &["dog", "puppy", "canine", "vet"]),
    (
        "restaurant",
        &["restaurant", "menu", "reservation", "chef", "dining"],
    ),
];

/// Detect the category for a conversation from its title and message text.
///
/// Matching is a case-insensitive substring check over the concatenated
/// text, so partial words count ("vets" matches the "vet" keyword).
#[must_use]
pub fn detect_category<'a, I>(title: &str, texts: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    let mut haystack = title.to_lowercase();
    for text in texts {
        haystack.push('\n');
        haystack.push_str(&text.to_lowercase());
    }

    for (category, keywords) in CATEGORY_RULES {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return category;
        }
    }

    DEFAULT_CATEGORY
}
