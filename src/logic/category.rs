//! Maps free-text garment labels onto the closed wardrobe taxonomy.
//!
//! Labels come from the segmentation service (`"pants"`, `"Upper-clothes"`)
//! or from users, often in Vietnamese (`"Quần jean"`, `"Giày thể thao"`).
//! Matching is done on folded words: lowercase, accents stripped.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::model::TaxonomyCategory;

/// Category used when no keyword matches
pub const DEFAULT_CATEGORY: TaxonomyCategory = TaxonomyCategory::Top;

struct Keyword {
    words: &'static [&'static str],
    /// Only match when the keyword opens the label
    leading_only: bool,
}

const fn kw(words: &'static [&'static str]) -> Keyword {
    Keyword {
        words,
        leading_only: false,
    }
}

const fn leading(words: &'static [&'static str]) -> Keyword {
    Keyword {
        words,
        leading_only: true,
    }
}

const SHOES: &[Keyword] = &[
    kw(&["giay"]),
    // "dép" (sandal) and "đẹp" (pretty) fold to the same word
    leading(&["dep"]),
    kw(&["guoc"]),
    kw(&["shoe"]),
    kw(&["shoes"]),
    kw(&["sneaker"]),
    kw(&["sneakers"]),
    kw(&["boot"]),
    kw(&["boots"]),
    kw(&["sandal"]),
    kw(&["sandals"]),
    kw(&["heels"]),
    kw(&["loafers"]),
    kw(&["footwear"]),
];

const DRESS: &[Keyword] = &[
    // "đầm" and "đậm" (dark, as in "xanh đậm") fold to the same word
    leading(&["dam"]),
    leading(&["ao", "dam"]),
    kw(&["vay", "dam"]),
    kw(&["vay", "lien"]),
    kw(&["ao", "dai"]),
    kw(&["dress"]),
    kw(&["dresses"]),
    kw(&["gown"]),
    kw(&["jumpsuit"]),
    kw(&["jumpsuits"]),
];

const SKIRT: &[Keyword] = &[
    kw(&["chan", "vay"]),
    kw(&["vay"]),
    kw(&["skirt"]),
    kw(&["skirts"]),
];

const BOTTOM: &[Keyword] = &[
    kw(&["quan"]),
    kw(&["pants"]),
    kw(&["trousers"]),
    kw(&["jean"]),
    kw(&["jeans"]),
    kw(&["shorts"]),
    kw(&["leggings"]),
    kw(&["joggers"]),
    kw(&["chinos"]),
    kw(&["bottom"]),
    kw(&["bottoms"]),
];

const TOP: &[Keyword] = &[
    kw(&["ao"]),
    kw(&["top"]),
    kw(&["tops"]),
    kw(&["shirt"]),
    kw(&["tee"]),
    kw(&["blouse"]),
    kw(&["sweater"]),
    kw(&["hoodie"]),
    kw(&["cardigan"]),
    kw(&["jacket"]),
    kw(&["coat"]),
    kw(&["outerwear"]),
    kw(&["vest"]),
    kw(&["polo"]),
    kw(&["upper", "clothes"]),
];

/// Priority order; the first family with a match wins
const RULES: &[(TaxonomyCategory, &[Keyword])] = &[
    (TaxonomyCategory::Shoes, SHOES),
    (TaxonomyCategory::Dress, DRESS),
    (TaxonomyCategory::Skirt, SKIRT),
    (TaxonomyCategory::Bottom, BOTTOM),
    (TaxonomyCategory::Top, TOP),
];

/// Resolve a label to its taxonomy category, falling back to `Top`.
pub fn normalize(raw_label: &str) -> TaxonomyCategory {
    classify(raw_label).unwrap_or(DEFAULT_CATEGORY)
}

/// Like `normalize`, but `None` when no keyword family matched.
pub fn classify(raw_label: &str) -> Option<TaxonomyCategory> {
    let folded = fold(raw_label);
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| matches(&words, k)))
        .map(|(category, _)| *category)
}

/// Lowercase and strip accents. `đ` has no decomposition and is mapped by hand.
pub fn fold(label: &str) -> String {
    label
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_lowercase())
        .map(|c| if c == 'đ' { 'd' } else { c })
        .collect()
}

fn matches(words: &[&str], keyword: &Keyword) -> bool {
    if keyword.leading_only {
        return words.starts_with(keyword.words);
    }
    words
        .windows(keyword.words.len())
        .any(|window| window == keyword.words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_vietnamese_marks() {
        assert_eq!(fold("Giày Thể Thao"), "giay the thao");
        assert_eq!(fold("Đầm"), "dam");
        assert_eq!(fold("Áo sơ mi"), "ao so mi");
    }

    #[test]
    fn test_documented_examples() {
        assert_eq!(normalize("Giày thể thao"), TaxonomyCategory::Shoes);
        assert_eq!(normalize("Áo sơ mi"), TaxonomyCategory::Top);
        assert_eq!(normalize("Quần jean"), TaxonomyCategory::Bottom);
    }

    #[test]
    fn test_segmentation_service_labels() {
        assert_eq!(normalize("top"), TaxonomyCategory::Top);
        assert_eq!(normalize("outerwear"), TaxonomyCategory::Top);
        assert_eq!(normalize("dress"), TaxonomyCategory::Dress);
        assert_eq!(normalize("pants"), TaxonomyCategory::Bottom);
        assert_eq!(normalize("skirt"), TaxonomyCategory::Skirt);
        assert_eq!(normalize("shoes"), TaxonomyCategory::Shoes);
        assert_eq!(normalize("Upper-clothes"), TaxonomyCategory::Top);
        assert_eq!(normalize("Left-shoe"), TaxonomyCategory::Shoes);
    }

    #[test]
    fn test_vietnamese_labels() {
        assert_eq!(normalize("Chân váy xếp ly"), TaxonomyCategory::Skirt);
        assert_eq!(normalize("Váy"), TaxonomyCategory::Skirt);
        assert_eq!(normalize("Đầm dự tiệc"), TaxonomyCategory::Dress);
        assert_eq!(normalize("Váy liền thân"), TaxonomyCategory::Dress);
        assert_eq!(normalize("Áo dài"), TaxonomyCategory::Dress);
        assert_eq!(normalize("Dép lê"), TaxonomyCategory::Shoes);
        assert_eq!(normalize("QUẦN SHORT"), TaxonomyCategory::Bottom);
    }

    #[test]
    fn test_dark_color_is_not_a_dress() {
        assert_eq!(normalize("Áo xanh đậm"), TaxonomyCategory::Top);
        assert_eq!(normalize("Quần đen đậm"), TaxonomyCategory::Bottom);
        assert_eq!(normalize("Áo đầm công sở"), TaxonomyCategory::Dress);
    }

    #[test]
    fn test_pretty_is_not_a_sandal() {
        assert_eq!(normalize("Áo đẹp"), TaxonomyCategory::Top);
        assert_eq!(normalize("Quần đẹp"), TaxonomyCategory::Bottom);
        assert_eq!(normalize("Chân váy đẹp"), TaxonomyCategory::Skirt);
        assert_eq!(normalize("Dép đẹp"), TaxonomyCategory::Shoes);
        assert_eq!(normalize("Dép lê"), TaxonomyCategory::Shoes);
    }

    #[test]
    fn test_priority_breaks_ties() {
        assert_eq!(normalize("dress shoes"), TaxonomyCategory::Shoes);
        assert_eq!(normalize("shirt dress"), TaxonomyCategory::Dress);
        assert_eq!(normalize("skirt with leggings"), TaxonomyCategory::Skirt);
        assert_eq!(normalize("jeans jacket"), TaxonomyCategory::Bottom);
    }

    #[test]
    fn test_shoe_keywords_without_higher_priority() {
        for label in ["giày", "Sneakers", "ankle boots", "red heels", "sandal"] {
            assert_eq!(normalize(label), TaxonomyCategory::Shoes, "label {label}");
        }
    }

    #[test]
    fn test_unrecognized_labels_default_to_top() {
        for label in ["", "   ", "hat", "scarf", "bag", "belt", "unknown", "Phụ kiện"] {
            assert_eq!(classify(label), None, "label {label:?}");
            assert_eq!(normalize(label), TaxonomyCategory::Top);
        }
    }

    #[test]
    fn test_words_not_substrings() {
        // "topaz" contains "top", "dampen" contains "dam"
        assert_eq!(classify("topaz brooch"), None);
        assert_eq!(classify("dampened cloth"), None);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let labels = ["dress shoes", "Chân váy", "Quần jean", "mystery", "Đầm"];
        let first: Vec<_> = labels.iter().map(|l| normalize(l)).collect();
        let reversed: Vec<_> = labels.iter().rev().map(|l| normalize(l)).collect();
        let second: Vec<_> = reversed.into_iter().rev().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_category_reachable() {
        for category in TaxonomyCategory::ALL {
            let label = category.slug();
            assert_eq!(normalize(label), category, "slug {label}");
        }
    }
}
