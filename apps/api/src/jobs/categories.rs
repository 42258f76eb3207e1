/// Fallback category for anything that does not fit the fixed list.
pub const OTHER_SERVICES: &str = "Other Services";

/// Display names of every category a job can be filed under.
pub const CATEGORIES: &[&str] = &[
    "Delivery & Transport",
    "Construction & Labour",
    "Household Help",
    "Cooking & Catering",
    "Shop & Retail",
    "Security Guard",
    "Cleaning",
    "Driver",
    "Electrician & Plumber",
    "Beauty & Salon",
    "Office Helper",
    OTHER_SERVICES,
];

/// "Delivery & Transport" → "delivery-transport".
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Resolves a display name or slug to the canonical category name.
pub fn resolve(name_or_slug: &str) -> Option<&'static str> {
    let wanted = slugify(name_or_slug);
    if wanted.is_empty() {
        return None;
    }
    CATEGORIES.iter().copied().find(|c| slugify(c) == wanted)
}

/// Like [`resolve`] but never fails: unknown input lands in "Other Services".
pub fn normalize(name_or_slug: &str) -> &'static str {
    resolve(name_or_slug).unwrap_or(OTHER_SERVICES)
}
