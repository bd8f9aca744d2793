use super::{RuleDef, RuleValue};

fn rule(name: &str, condition: &str, value: RuleValue, adjustment: f64, reason: &str) -> RuleDef {
    RuleDef {
        name: name.to_string(),
        condition: condition.to_string(),
        value: Some(value),
        adjustment,
        reason: Some(reason.to_string()),
    }
}

/// Rule set applied when the configuration does not list any rules.
pub fn default_rule_defs() -> Vec<RuleDef> {
    vec![
        rule(
            "metadata_match",
            "tmdb_match",
            RuleValue::Bool(true),
            0.1,
            "title found by metadata lookup",
        ),
        rule(
            "metadata_miss",
            "tmdb_match",
            RuleValue::Bool(false),
            -0.15,
            "title not found by metadata lookup",
        ),
        rule(
            "sample_or_trailer",
            "folder_name_contains",
            RuleValue::List(vec!["sample".to_string(), "trailer".to_string()]),
            -0.4,
            "folder looks like a sample or trailer",
        ),
        rule(
            "lossless_audio",
            "filetype",
            RuleValue::Str("flac".to_string()),
            0.05,
            "lossless audio present",
        ),
        rule(
            "scattered_small_files",
            "many_small_files",
            RuleValue::Bool(true),
            -0.1,
            "many small files",
        ),
    ]
}
