//! City proximity ranking for job search results.
//!
//! A job located in the searched city outranks one elsewhere in the same
//! state, which outranks everything else. The city → state table is fixed
//! and only covers the states the board currently serves.

use std::cmp::Reverse;

pub const EXACT_MATCH_SCORE: u32 = 100;
pub const SAME_STATE_SCORE: u32 = 50;
pub const NO_MATCH_SCORE: u32 = 10;

/// Label given to listings posted less than a minute ago.
pub const JUST_NOW: &str = "Just now";

const STATE_CITIES: &[(&str, &[&str])] = &[
    (
        "uttar pradesh",
        &[
            "agra", "mathura", "lucknow", "kanpur", "varanasi", "noida", "ghaziabad", "meerut",
            "aligarh", "prayagraj", "allahabad", "bareilly", "gorakhpur", "firozabad", "jhansi",
        ],
    ),
    (
        "maharashtra",
        &[
            "mumbai", "pune", "nagpur", "nashik", "thane", "aurangabad", "solapur", "kolhapur",
        ],
    ),
    ("delhi", &["delhi", "new delhi", "dwarka", "rohini"]),
    (
        "karnataka",
        &["bangalore", "bengaluru", "mysore", "mysuru", "mangalore", "hubli"],
    ),
    (
        "tamil nadu",
        &["chennai", "coimbatore", "madurai", "salem", "tiruchirappalli", "trichy"],
    ),
    ("telangana", &["hyderabad", "secunderabad", "warangal"]),
    (
        "west bengal",
        &["kolkata", "howrah", "durgapur", "siliguri", "asansol"],
    ),
    (
        "gujarat",
        &["ahmedabad", "surat", "vadodara", "rajkot", "gandhinagar", "bhavnagar"],
    ),
    (
        "rajasthan",
        &["jaipur", "jodhpur", "udaipur", "kota", "ajmer", "bikaner"],
    ),
    (
        "madhya pradesh",
        &["indore", "bhopal", "gwalior", "jabalpur", "ujjain"],
    ),
    (
        "punjab",
        &["ludhiana", "amritsar", "jalandhar", "patiala", "mohali"],
    ),
    (
        "haryana",
        &["gurgaon", "gurugram", "faridabad", "panipat", "ambala", "karnal"],
    ),
    ("bihar", &["patna", "gaya", "bhagalpur", "muzaffarpur"]),
    (
        "kerala",
        &["kochi", "thiruvananthapuram", "kozhikode", "thrissur"],
    ),
];

/// Anything the ranker can place: job rows, listing cards, test fixtures.
pub trait Locatable {
    fn location(&self) -> &str;
    fn is_featured(&self) -> bool;
    fn posted_label(&self) -> &str;
}

/// The city in a target such as "Agra, Uttar Pradesh", lower-cased.
pub fn city_part(target: &str) -> String {
    target.split(',').next().unwrap_or("").trim().to_lowercase()
}

/// Looks up the state a city belongs to. Accepts "Agra" or "Agra, UP".
pub fn state_for_city(city: &str) -> Option<(&'static str, &'static [&'static str])> {
    let city = city_part(city);
    if city.is_empty() {
        return None;
    }
    STATE_CITIES
        .iter()
        .find(|(_, cities)| cities.contains(&city.as_str()))
        .map(|(state, cities)| (*state, *cities))
}

/// Scores how close `location` is to `target_city`.
pub fn city_proximity_score(location: &str, target_city: &str) -> u32 {
    let location = location.to_lowercase();
    let target = city_part(target_city);

    if target.is_empty() {
        return NO_MATCH_SCORE;
    }
    if location.contains(&target) {
        return EXACT_MATCH_SCORE;
    }

    match state_for_city(&target) {
        Some((state, cities))
            if location.contains(state) || cities.iter().any(|c| location.contains(c)) =>
        {
            SAME_STATE_SCORE
        }
        _ => NO_MATCH_SCORE,
    }
}

/// Stable sort by (proximity desc, featured first, "Just now" first).
/// An empty target city leaves the list untouched.
pub fn sort_by_proximity<T: Locatable>(mut items: Vec<T>, target_city: &str) -> Vec<T> {
    if target_city.trim().is_empty() {
        return items;
    }
    items.sort_by_cached_key(|item| {
        (
            Reverse(city_proximity_score(item.location(), target_city)),
            Reverse(item.is_featured()),
            item.posted_label() != JUST_NOW,
        )
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Listing {
        id: usize,
        location: String,
        featured: bool,
        label: String,
    }

    impl Locatable for Listing {
        fn location(&self) -> &str {
            &self.location
        }
        fn is_featured(&self) -> bool {
            self.featured
        }
        fn posted_label(&self) -> &str {
            &self.label
        }
    }

    fn listing(id: usize, location: &str, featured: bool, label: &str) -> Listing {
        Listing {
            id,
            location: location.to_string(),
            featured,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_same_state_scores_50() {
        assert_eq!(city_proximity_score("Mathura, Uttar Pradesh", "Agra"), 50);
    }

    #[test]
    fn test_other_state_scores_10() {
        assert_eq!(city_proximity_score("Mumbai", "Agra"), 10);
    }

    #[test]
    fn test_substring_match_scores_100() {
        assert_eq!(city_proximity_score("Agra City", "Agra"), 100);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(city_proximity_score("near TAJ GANJ, AGRA", "agra"), 100);
        assert_eq!(city_proximity_score("LUCKNOW", "Agra"), 50);
    }

    #[test]
    fn test_unknown_city_falls_through() {
        assert_eq!(city_proximity_score("Mathura", "Atlantis"), 10);
        assert!(state_for_city("Atlantis").is_none());
    }

    #[test]
    fn test_target_with_state_suffix_still_matches_city() {
        assert_eq!(city_proximity_score("Agra", "Agra, Uttar Pradesh"), 100);
        assert_eq!(city_proximity_score("Mathura", "Agra, Uttar Pradesh"), 50);
        assert_eq!(city_part("  Agra , UP"), "agra");
    }

    #[test]
    fn test_state_lookup_ignores_suffix() {
        let (state, _) = state_for_city("Pune, Maharashtra").unwrap();
        assert_eq!(state, "maharashtra");
    }

    #[test]
    fn test_empty_target_is_passthrough() {
        let items = vec![
            listing(0, "Mumbai", false, "2 hours ago"),
            listing(1, "Agra", true, JUST_NOW),
        ];
        let sorted = sort_by_proximity(items, "   ");
        assert_eq!(sorted.iter().map(|l| l.id).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_ranking_order() {
        let items = vec![
            listing(0, "Mumbai", true, JUST_NOW),
            listing(1, "Mathura", false, "1 day ago"),
            listing(2, "Agra", false, "3 days ago"),
            listing(3, "Mathura", true, "1 day ago"),
            listing(4, "Agra Cantt", false, JUST_NOW),
        ];
        let sorted = sort_by_proximity(items, "Agra");
        let ids: Vec<_> = sorted.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1, 0]);
    }

    fn arb_listing() -> impl Strategy<Value = (String, bool, String)> {
        (
            prop::sample::select(vec![
                "Agra", "Mathura", "Lucknow", "Mumbai", "Pune", "Jaipur", "Somewhere",
            ]),
            any::<bool>(),
            prop::sample::select(vec![JUST_NOW, "5 minutes ago", "2 days ago"]),
        )
            .prop_map(|(loc, featured, label)| (loc.to_string(), featured, label.to_string()))
    }

    proptest! {
        #[test]
        fn prop_sort_is_stable(
            raw in prop::collection::vec(arb_listing(), 0..40),
            target in prop::sample::select(vec!["Agra", "Pune", "Atlantis"]),
        ) {
            let items: Vec<Listing> = raw
                .into_iter()
                .enumerate()
                .map(|(id, (location, featured, label))| Listing { id, location, featured, label })
                .collect();
            let sorted = sort_by_proximity(items, target);
            for pair in sorted.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let sa = city_proximity_score(&a.location, target);
                let sb = city_proximity_score(&b.location, target);
                prop_assert!(sa >= sb);
                if sa == sb && a.featured == b.featured && (a.label == JUST_NOW) == (b.label == JUST_NOW) {
                    prop_assert!(a.id < b.id, "equal keys reordered: {} before {}", a.id, b.id);
                }
            }
        }

        #[test]
        fn prop_exact_beats_state_beats_other(
            target in prop::sample::select(vec!["Agra", "Pune", "Jaipur", "Patna"]),
        ) {
            let (_, cities) = state_for_city(target).unwrap();
            let neighbour = cities
                .iter()
                .find(|c| !c.contains(&target.to_lowercase()))
                .unwrap();
            let exact = city_proximity_score(&format!("{target} Market"), target);
            let same_state = city_proximity_score(neighbour, target);
            let other = city_proximity_score("Reykjavik", target);
            prop_assert!(exact > same_state);
            prop_assert!(same_state > other);
        }
    }
}
