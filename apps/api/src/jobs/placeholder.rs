//! Stock photos for listings that were posted without images.
//!
//! The photo is picked by hashing the job id, so a listing keeps the same
//! placeholder across page loads. Collisions between jobs are fine.

use crate::jobs::categories::OTHER_SERVICES;

const UNSPLASH_BASE: &str = "https://images.unsplash.com";

const IMAGE_POOLS: &[(&str, &[&str])] = &[
    (
        "Delivery & Transport",
        &[
            "photo-1566576912321-d58ddd7a6088",
            "photo-1586528116311-ad8dd3c8310d",
            "photo-1601584115197-04ecc0da31d7",
            "photo-1580674285054-bed31e145f59",
        ],
    ),
    (
        "Construction & Labour",
        &[
            "photo-1504307651254-35680f356dfd",
            "photo-1541888946425-d81bb19240f5",
            "photo-1503387762-592deb58ef4e",
            "photo-1581094794329-c8112a89af12",
        ],
    ),
    (
        "Household Help",
        &[
            "photo-1581578731548-c64695cc6952",
            "photo-1556911220-bff31c812dba",
            "photo-1527515637462-cff94eecc1ac",
        ],
    ),
    (
        "Cooking & Catering",
        &[
            "photo-1556910103-1c02745aae4d",
            "photo-1577219491135-ce391730fb2c",
            "photo-1556909114-f6e7ad7d3136",
        ],
    ),
    (
        "Shop & Retail",
        &[
            "photo-1604719312566-8912e9227c6a",
            "photo-1534452203293-494d7ddbf7e0",
            "photo-1441986300917-64674bd600d8",
        ],
    ),
    (
        "Security Guard",
        &[
            "photo-1582139329536-e7284fece509",
            "photo-1560472354-b33ff0c44a43",
        ],
    ),
    (
        "Cleaning",
        &[
            "photo-1628177142898-93e36e4e3a50",
            "photo-1563453392212-326f5e854473",
            "photo-1584820927498-cfe5211fd8bf",
        ],
    ),
    (
        "Driver",
        &[
            "photo-1449965408869-eaa3f722e40d",
            "photo-1502877338535-766e1452684a",
            "photo-1533473359331-0135ef1b58bf",
        ],
    ),
    (
        "Electrician & Plumber",
        &[
            "photo-1621905251918-48416bd8575a",
            "photo-1607472586893-edb57bdc0e39",
            "photo-1585704032915-c3400ca199e7",
        ],
    ),
    (
        "Beauty & Salon",
        &[
            "photo-1560066984-138dadb4c035",
            "photo-1522337360788-8b13dee7a37e",
        ],
    ),
    (
        "Office Helper",
        &[
            "photo-1497366216548-37526070297c",
            "photo-1521737604893-d14cc237f11d",
        ],
    ),
    (
        OTHER_SERVICES,
        &[
            "photo-1521791136064-7986c2920216",
            "photo-1552664730-d307ca884978",
            "photo-1600880292203-757bb62b4baf",
            "photo-1542744173-8e7e53415bb0",
        ],
    ),
];

/// 32-bit string hash over UTF-16 code units: `h = h * 31 + unit`, wrapping.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

fn pool_for(category: &str) -> &'static [&'static str] {
    IMAGE_POOLS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category.trim()))
        .or_else(|| IMAGE_POOLS.iter().find(|(name, _)| *name == OTHER_SERVICES))
        .map(|(_, pool)| *pool)
        .unwrap_or(&[])
}

fn photo_url(photo_id: &str) -> String {
    format!("{UNSPLASH_BASE}/{photo_id}?w=800&h=600&fit=crop")
}

/// Picks the placeholder photo URL for a job with no uploaded images.
pub fn image_for_job(category: &str, job_id: &str) -> String {
    let pool = pool_for(category);
    if pool.is_empty() {
        return String::new();
    }
    let index = string_hash(job_id).unsigned_abs() as usize % pool.len();
    photo_url(pool[index])
}

/// The image a listing should display: the first upload, else a placeholder.
pub fn display_image(category: &str, job_id: &str, images: &[String]) -> String {
    images
        .iter()
        .find(|url| !url.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| image_for_job(category, job_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::categories::CATEGORIES;
    use proptest::prelude::*;

    fn pool_urls(category: &str) -> Vec<String> {
        pool_for(category).iter().map(|id| photo_url(id)).collect()
    }

    #[test]
    fn test_hash_matches_reference_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        // Long inputs wrap instead of overflowing.
        assert_eq!(string_hash(&"z".repeat(64)), 1_582_229_504);
        assert_eq!(
            string_hash("550e8400-e29b-41d4-a716-446655440000"),
            1_716_781_005
        );
        assert_eq!(string_hash("कार्य"), -2_074_959_031);
    }

    #[test]
    fn test_every_category_has_a_pool() {
        for category in CATEGORIES {
            assert!(
                IMAGE_POOLS.iter().any(|(name, _)| name == category),
                "missing pool for {category}"
            );
        }
    }

    #[test]
    fn test_unknown_category_uses_other_services() {
        let url = image_for_job("Astronaut", "job-1");
        assert!(pool_urls(OTHER_SERVICES).contains(&url));
    }

    #[test]
    fn test_uploaded_image_wins() {
        let images = vec!["https://cdn.example.com/a.jpg".to_string()];
        assert_eq!(
            display_image("Driver", "job-1", &images),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(display_image("Driver", "job-1", &[]), image_for_job("Driver", "job-1"));
    }

    proptest! {
        #[test]
        fn prop_image_is_deterministic(category in "\\PC{0,20}", job_id in "\\PC{0,40}") {
            prop_assert_eq!(image_for_job(&category, &job_id), image_for_job(&category, &job_id));
        }

        #[test]
        fn prop_image_comes_from_category_pool(
            category in prop::sample::select(CATEGORIES.to_vec()),
            job_id in "[a-f0-9-]{1,36}",
        ) {
            let url = image_for_job(category, &job_id);
            prop_assert!(pool_urls(category).contains(&url));
        }

        #[test]
        fn prop_unknown_category_comes_from_fallback(
            category in "[0-9]{1,8}",
            job_id in "[a-f0-9-]{1,36}",
        ) {
            let url = image_for_job(&category, &job_id);
            prop_assert!(pool_urls(OTHER_SERVICES).contains(&url));
        }
    }
}
