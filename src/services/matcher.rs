//! Filter evaluation over listings.
//!
//! A listing matches a filter when every configured axis accepts it:
//! keywords (any one, substring of title + description), categories
//! (exact), and the inclusive budget bounds. An axis with nothing
//! configured accepts everything.

use crate::models::{Filter, Listing};

/// Stateless predicate evaluation, safe to call from anywhere.
pub struct FilterMatcher;

impl FilterMatcher {
    /// Listings from `listings` accepted by `filter`, in input order.
    pub fn match_listings<'a>(listings: &'a [Listing], filter: &Filter) -> Vec<&'a Listing> {
        let keywords = normalized(&filter.keywords);
        let categories = normalized(&filter.categories);

        listings
            .iter()
            .filter(|listing| Self::accepts(listing, filter, &keywords, &categories))
            .collect()
    }

    pub fn matches(listing: &Listing, filter: &Filter) -> bool {
        Self::accepts(
            listing,
            filter,
            &normalized(&filter.keywords),
            &normalized(&filter.categories),
        )
    }

    fn accepts(listing: &Listing, filter: &Filter, keywords: &[String], categories: &[String]) -> bool {
        if !keywords.is_empty() {
            let text = listing.search_text();
            if !keywords.iter().any(|keyword| text.contains(keyword.as_str())) {
                return false;
            }
        }

        if !categories.is_empty() {
            let category = listing.category.trim().to_lowercase();
            if !categories.contains(&category) {
                return false;
            }
        }

        let below_min = filter.min_price.as_ref().is_some_and(|min| listing.budget < *min);
        let above_max = filter.max_price.as_ref().is_some_and(|max| listing.budget > *max);

        !below_min && !above_max
    }
}

/// Lowercased, trimmed, blanks dropped. A set of only blanks is no constraint.
fn normalized(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobType;
    use bigdecimal::BigDecimal;
    use jiff::Timestamp;
    use proptest::prelude::*;

    fn listing(category: &str, description: &str, budget: i64) -> Listing {
        let now = Timestamp::now();
        Listing {
            id: "01abc".to_string(),
            title: "New project".to_string(),
            url: "https://www.upwork.com/jobs/~01abc".to_string(),
            category: category.to_string(),
            job_type: JobType::Fixed,
            description: description.to_string(),
            skills: Vec::new(),
            budget: BigDecimal::from(budget),
            client_location: None,
            client_spend: None,
            client_rating: None,
            published_at: now,
            ingested_at: now,
        }
    }

    fn filter(keywords: &[&str], categories: &[&str]) -> Filter {
        Filter {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            ..Filter::default()
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let listings = vec![
            listing("Design", "", 0),
            listing("Web Development", "Rust service", 5000),
        ];
        assert_eq!(FilterMatcher::match_listings(&listings, &Filter::default()).len(), 2);
    }

    #[test]
    fn test_keyword_is_case_insensitive_substring() {
        let react = listing("Web", "React developer needed", 100);
        assert!(FilterMatcher::matches(&react, &filter(&["react"], &[])));
        assert!(FilterMatcher::matches(&react, &filter(&["REACT"], &[])));
        assert!(!FilterMatcher::matches(&react, &filter(&["vue"], &[])));
    }

    #[test]
    fn test_keyword_searches_title_too() {
        let mut l = listing("Web", "", 100);
        l.title = "Shopify store tweaks".to_string();
        assert!(FilterMatcher::matches(&l, &filter(&["shopify"], &[])));
    }

    #[test]
    fn test_categories_and_keywords_combine() {
        let f = filter(&["logo", "branding"], &["Design"]);
        assert!(FilterMatcher::matches(&listing("Design", "Full branding package", 100), &f));
        assert!(!FilterMatcher::matches(&listing("Design", "Poster layout", 100), &f));
        assert!(!FilterMatcher::matches(&listing("Writing", "Logo copy", 100), &f));
    }

    #[test]
    fn test_category_is_exact_not_substring() {
        let f = filter(&[], &["design"]);
        assert!(FilterMatcher::matches(&listing("DESIGN", "", 1), &f));
        assert!(!FilterMatcher::matches(&listing("Graphic Design", "", 1), &f));
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let f = Filter {
            min_price: Some(BigDecimal::from(50)),
            max_price: Some(BigDecimal::from(200)),
            ..Filter::default()
        };
        assert!(!FilterMatcher::matches(&listing("Design", "", 20), &f));
        assert!(FilterMatcher::matches(&listing("Design", "", 100), &f));
        assert!(!FilterMatcher::matches(&listing("Design", "", 500), &f));
        assert!(FilterMatcher::matches(&listing("Design", "", 50), &f));
        assert!(FilterMatcher::matches(&listing("Design", "", 200), &f));
    }

    #[test]
    fn test_blank_keywords_place_no_constraint() {
        let f = filter(&["", "  "], &[]);
        assert!(FilterMatcher::matches(&listing("Design", "anything", 1), &f));
    }

    fn arb_listing() -> impl Strategy<Value = Listing> {
        ("[a-zA-Z ]{0,12}", "[a-zA-Z ]{0,40}", "[a-zA-Z]{1,8}", 0i64..1000).prop_map(
            |(title, description, category, budget)| {
                let mut l = listing(&category, &description, budget);
                l.title = title;
                l
            },
        )
    }

    fn arb_filter() -> impl Strategy<Value = Filter> {
        (
            prop::collection::vec("[a-zA-Z]{1,4}", 0..3),
            prop::collection::vec("[a-zA-Z]{1,8}", 0..3),
            prop::option::of(0i64..1000),
            prop::option::of(0i64..1000),
        )
            .prop_map(|(keywords, categories, min, max)| Filter {
                keywords,
                categories,
                min_price: min.map(BigDecimal::from),
                max_price: max.map(BigDecimal::from),
                ..Filter::default()
            })
    }

    proptest! {
        #[test]
        fn property_unconstrained_filter_accepts_all(l in arb_listing()) {
            prop_assert!(FilterMatcher::matches(&l, &Filter::default()));
        }

        #[test]
        fn property_match_listings_agrees_with_matches(
            listings in prop::collection::vec(arb_listing(), 0..8),
            f in arb_filter(),
        ) {
            let expected: Vec<&Listing> =
                listings.iter().filter(|l| FilterMatcher::matches(l, &f)).collect();
            prop_assert_eq!(FilterMatcher::match_listings(&listings, &f), expected);
        }

        #[test]
        fn property_case_of_criteria_is_irrelevant(l in arb_listing(), f in arb_filter()) {
            let upper = Filter {
                keywords: f.keywords.iter().map(|k| k.to_uppercase()).collect(),
                categories: f.categories.iter().map(|c| c.to_uppercase()).collect(),
                ..f.clone()
            };
            prop_assert_eq!(FilterMatcher::matches(&l, &f), FilterMatcher::matches(&l, &upper));
        }

        #[test]
        fn property_adding_keywords_never_narrows(
            l in arb_listing(),
            f in arb_filter(),
            extra in "[a-zA-Z]{1,4}",
        ) {
            prop_assume!(!f.keywords.is_empty());
            let mut wider = f.clone();
            wider.keywords.push(extra);
            if FilterMatcher::matches(&l, &f) {
                prop_assert!(FilterMatcher::matches(&l, &wider));
            }
        }
    }
}
