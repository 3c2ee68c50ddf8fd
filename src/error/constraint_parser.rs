use std::sync::OnceLock;

use regex::Regex;

/// Tables owned by the schema, longest first so that `filter_keywords`
/// wins over `filters` when matching constraint-name prefixes.
const KNOWN_TABLES: &[&str] = &[
    "filter_categories",
    "filter_keywords",
    "alert_records",
    "listings",
    "profiles",
    "filters",
];

/// Suffixes PostgreSQL appends to generated constraint names.
const CONSTRAINT_SUFFIXES: &[&str] = &["_key", "_pkey", "_fkey", "_check", "_idx", "_not_null"];

/// Utility for parsing PostgreSQL constraint violation messages.
///
/// Understands the composite keys used by this schema, e.g.
/// `alert_records_user_id_listing_id_key` with a detail line of
/// `Key (user_id, listing_id)=(..., ...) already exists.`
pub struct ConstraintParser;

struct RegexPatterns {
    key_value: Regex,
    column_name: Regex,
    table_name: Regex,
}

impl RegexPatterns {
    fn new() -> Self {
        Self {
            key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").expect("valid key/value pattern"),
            column_name: Regex::new(r#"column "([^"]+)""#).expect("valid column pattern"),
            table_name: Regex::new(r#"(?:table|relation) "([^"]+)""#).expect("valid table pattern"),
        }
    }
}

static REGEX_PATTERNS: OnceLock<RegexPatterns> = OnceLock::new();

impl ConstraintParser {
    fn patterns() -> &'static RegexPatterns {
        REGEX_PATTERNS.get_or_init(RegexPatterns::new)
    }

    /// Parses a unique violation into `(entity, field, value)`.
    ///
    /// Composite keys are reported with comma-joined fields and values.
    pub fn parse_unique_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let entity = Self::entity_for(message, constraint_name);

        if let Some((field, value)) = Self::extract_key_value_from_message(message) {
            return Some((entity.unwrap_or_else(|| "resource".to_string()), field, value));
        }

        let (entity, field) = constraint_name.and_then(Self::parse_constraint_name)?;
        Some((entity, field, "duplicate_value".to_string()))
    }

    /// Parses a not-null, check or foreign-key violation into `(entity, field)`.
    pub fn parse_field_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        let entity = Self::entity_for(message, constraint_name)
            .unwrap_or_else(|| "resource".to_string());

        if let Some(field) = Self::extract_column_from_message(message) {
            return Some((entity, field));
        }
        if let Some((field, _)) = Self::extract_key_value_from_message(message) {
            return Some((entity, field));
        }
        constraint_name
            .and_then(Self::parse_constraint_name)
            .map(|(_, field)| (entity, field))
    }

    /// Splits a generated constraint name into `(table, columns)`.
    ///
    /// - `listings_pkey` -> `("listings", "id")`
    /// - `alert_records_user_id_listing_id_key` -> `("alert_records", "user_id_listing_id")`
    /// - `filters_user_id_fkey` -> `("filters", "user_id")`
    pub fn parse_constraint_name(constraint_name: &str) -> Option<(String, String)> {
        let table = KNOWN_TABLES
            .iter()
            .find(|table| constraint_name.starts_with(&format!("{}_", table)))?;

        if constraint_name == format!("{}_pkey", table) {
            return Some((table.to_string(), "id".to_string()));
        }

        let rest = &constraint_name[table.len() + 1..];
        let column = CONSTRAINT_SUFFIXES
            .iter()
            .find_map(|suffix| rest.strip_suffix(suffix))
            .unwrap_or(rest);

        if column.is_empty() {
            return None;
        }
        Some((table.to_string(), column.to_string()))
    }

    /// Extracts `column "name"` from a message.
    pub fn extract_column_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .column_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Extracts `table "name"` or `relation "name"` from a message.
    pub fn extract_table_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .table_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Extracts `Key (fields)=(values)`, normalising `", "` separators to `","`.
    pub fn extract_key_value_from_message(message: &str) -> Option<(String, String)> {
        Self::patterns().key_value.captures(message).and_then(|caps| {
            let field = caps.get(1)?.as_str().replace(", ", ",");
            let value = caps.get(2)?.as_str().replace(", ", ",");
            Some((field, value))
        })
    }

    fn entity_for(message: &str, constraint_name: Option<&str>) -> Option<String> {
        constraint_name
            .and_then(Self::parse_constraint_name)
            .map(|(entity, _)| entity)
            .or_else(|| Self::extract_table_from_message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_composite_alert_key() {
        let message = "duplicate key value violates unique constraint \"alert_records_user_id_listing_id_key\"\nDETAIL: Key (user_id, listing_id)=(5f0c6f7e-0000-0000-0000-000000000001, 01abc) already exists.";
        let result = ConstraintParser::parse_unique_violation(
            message,
            Some("alert_records_user_id_listing_id_key"),
        );
        assert_eq!(
            result,
            Some((
                "alert_records".to_string(),
                "user_id,listing_id".to_string(),
                "5f0c6f7e-0000-0000-0000-000000000001,01abc".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_listing_primary_key() {
        let message = "duplicate key value violates unique constraint \"listings_pkey\"\nDETAIL: Key (id)=(01abc) already exists.";
        let result = ConstraintParser::parse_unique_violation(message, Some("listings_pkey"));
        assert_eq!(
            result,
            Some(("listings".to_string(), "id".to_string(), "01abc".to_string()))
        );
    }

    #[test]
    fn test_parse_unique_violation_without_detail() {
        let result = ConstraintParser::parse_unique_violation(
            "duplicate key value",
            Some("listings_pkey"),
        );
        assert_eq!(
            result,
            Some((
                "listings".to_string(),
                "id".to_string(),
                "duplicate_value".to_string()
            ))
        );
    }

    #[test]
    fn test_parse_constraint_name_prefers_longest_table() {
        assert_eq!(
            ConstraintParser::parse_constraint_name("filter_keywords_filter_id_fkey"),
            Some(("filter_keywords".to_string(), "filter_id".to_string()))
        );
        assert_eq!(
            ConstraintParser::parse_constraint_name("filters_user_id_fkey"),
            Some(("filters".to_string(), "user_id".to_string()))
        );
        assert_eq!(ConstraintParser::parse_constraint_name("unknown_thing_key"), None);
    }

    #[test]
    fn test_parse_not_null_violation() {
        let message = "null value in column \"title\" of relation \"listings\" violates not-null constraint";
        assert_eq!(
            ConstraintParser::parse_field_violation(message, None),
            Some(("listings".to_string(), "title".to_string()))
        );
    }

    #[test]
    fn test_graceful_parsing_failures() {
        assert_eq!(ConstraintParser::parse_unique_violation("garbage", None), None);
        assert_eq!(ConstraintParser::parse_field_violation("garbage", None), None);
        assert_eq!(ConstraintParser::extract_key_value_from_message(""), None);
    }
}
