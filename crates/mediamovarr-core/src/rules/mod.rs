//! User-configured confidence adjustments.
//!
//! Rules arrive from configuration as loosely typed [`RuleDef`]s and are
//! compiled into [`Rule`]s whose [`Condition`] carries a typed payload.
//! Anything that cannot be compiled is reported as a [`RuleError`] and left
//! out of evaluation.

mod defaults;
mod engine;

pub use defaults::default_rule_defs;
pub use engine::apply;

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// A rule as written in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDef {
    pub name: String,
    pub condition: String,
    #[serde(default)]
    pub value: Option<RuleValue>,
    pub adjustment: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Bool(b) => write!(f, "{}", b),
            RuleValue::Int(i) => write!(f, "{}", i),
            RuleValue::Float(x) => write!(f, "{}", x),
            RuleValue::Str(s) => write!(f, "{:?}", s),
            RuleValue::List(items) => write!(f, "{:?}", items),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("rule '{rule}': {message}")]
pub struct RuleError {
    pub rule: String,
    pub message: String,
}

impl RuleError {
    fn new(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub op: CmpOp,
    pub value: usize,
}

impl Comparison {
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        let (op, rest) = if let Some(rest) = expr.strip_prefix(">=") {
            (CmpOp::Ge, rest)
        } else if let Some(rest) = expr.strip_prefix("<=") {
            (CmpOp::Le, rest)
        } else if let Some(rest) = expr.strip_prefix('>') {
            (CmpOp::Gt, rest)
        } else if let Some(rest) = expr.strip_prefix('<') {
            (CmpOp::Lt, rest)
        } else if let Some(rest) = expr.strip_prefix('=') {
            (CmpOp::Eq, rest)
        } else {
            (CmpOp::Eq, expr)
        };
        let value = rest.trim().parse::<usize>().ok()?;
        Some(Self { op, value })
    }

    pub fn matches(&self, actual: usize) -> bool {
        match self.op {
            CmpOp::Gt => actual > self.value,
            CmpOp::Lt => actual < self.value,
            CmpOp::Ge => actual >= self.value,
            CmpOp::Le => actual <= self.value,
            CmpOp::Eq => actual == self.value,
        }
    }
}

/// Closed set of rule conditions, each with its own payload.
#[derive(Debug, Clone)]
pub enum Condition {
    FileType(String),
    TmdbMatch(bool),
    SingleLargeVideo(bool),
    ManySmallFiles(bool),
    HasSeasonStructure(bool),
    AudioFileCount(Comparison),
    /// Lower-cased needles; matches when any one is contained.
    FolderNameContains(Vec<String>),
    FolderNameMatches(Regex),
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::FileType(_) => "filetype",
            Condition::TmdbMatch(_) => "tmdb_match",
            Condition::SingleLargeVideo(_) => "single_large_video",
            Condition::ManySmallFiles(_) => "many_small_files",
            Condition::HasSeasonStructure(_) => "has_season_structure",
            Condition::AudioFileCount(_) => "audio_file_count",
            Condition::FolderNameContains(_) => "folder_name_contains",
            Condition::FolderNameMatches(_) => "folder_name_matches",
        }
    }

    fn compile(rule: &str, condition: &str, value: Option<&RuleValue>) -> Result<Self, RuleError> {
        let value = value.ok_or_else(|| RuleError::new(rule, format!("condition '{}' needs a value", condition)))?;
        let wrong_kind = |expected: &str| {
            RuleError::new(
                rule,
                format!("condition '{}' expects {}, got {}", condition, expected, value),
            )
        };

        match condition.trim().to_lowercase().as_str() {
            "filetype" => match value {
                RuleValue::Str(s) => {
                    let ext = s.trim().trim_start_matches('.').to_lowercase();
                    if ext.is_empty() {
                        Err(RuleError::new(rule, "filetype extension is empty"))
                    } else {
                        Ok(Condition::FileType(ext))
                    }
                }
                _ => Err(wrong_kind("an extension string")),
            },
            "tmdb_match" => as_bool(value).map(Condition::TmdbMatch).ok_or_else(|| wrong_kind("a boolean")),
            "single_large_video" => as_bool(value)
                .map(Condition::SingleLargeVideo)
                .ok_or_else(|| wrong_kind("a boolean")),
            "many_small_files" => as_bool(value)
                .map(Condition::ManySmallFiles)
                .ok_or_else(|| wrong_kind("a boolean")),
            "has_season_structure" => as_bool(value)
                .map(Condition::HasSeasonStructure)
                .ok_or_else(|| wrong_kind("a boolean")),
            "audio_file_count" => {
                let comparison = match value {
                    RuleValue::Int(n) if *n >= 0 => Some(Comparison {
                        op: CmpOp::Eq,
                        value: *n as usize,
                    }),
                    RuleValue::Str(expr) => Comparison::parse(expr),
                    _ => None,
                };
                comparison
                    .map(Condition::AudioFileCount)
                    .ok_or_else(|| wrong_kind("a comparison such as \">= 5\" or a non-negative integer"))
            }
            "folder_name_contains" => {
                let needles: Vec<String> = match value {
                    RuleValue::List(items) => items.iter().map(|s| s.to_lowercase()).collect(),
                    RuleValue::Str(s) => vec![s.to_lowercase()],
                    _ => return Err(wrong_kind("a list of strings")),
                };
                if needles.iter().any(|n| n.is_empty()) || needles.is_empty() {
                    return Err(RuleError::new(rule, "folder_name_contains needs non-empty strings"));
                }
                Ok(Condition::FolderNameContains(needles))
            }
            "folder_name_matches" => match value {
                RuleValue::Str(pattern) => Regex::new(pattern)
                    .map(Condition::FolderNameMatches)
                    .map_err(|e| RuleError::new(rule, format!("invalid regex: {}", e))),
                _ => Err(wrong_kind("a regular expression string")),
            },
            other => Err(RuleError::new(rule, format!("unknown condition '{}'", other))),
        }
    }
}

fn as_bool(value: &RuleValue) -> Option<bool> {
    match value {
        RuleValue::Bool(b) => Some(*b),
        RuleValue::Str(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub condition: Condition,
    pub adjustment: f64,
    pub reason: String,
}

impl Rule {
    pub fn compile(def: &RuleDef) -> Result<Self, RuleError> {
        let name = def.name.trim();
        if name.is_empty() {
            return Err(RuleError::new("<unnamed>", "rule name is empty"));
        }
        if !def.adjustment.is_finite() {
            return Err(RuleError::new(name, "adjustment must be a finite number"));
        }
        let condition = Condition::compile(name, &def.condition, def.value.as_ref())?;
        let reason = def
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(name)
            .to_string();

        Ok(Self {
            name: name.to_string(),
            condition,
            adjustment: def.adjustment,
            reason,
        })
    }
}

#[derive(Debug, Default)]
pub struct CompiledRules {
    pub rules: Vec<Rule>,
    pub errors: Vec<RuleError>,
}

/// Compile rule definitions in order; malformed ones are logged and dropped.
pub fn compile_rules(defs: &[RuleDef]) -> CompiledRules {
    let mut compiled = CompiledRules::default();
    for def in defs {
        match Rule::compile(def) {
            Ok(rule) => compiled.rules.push(rule),
            Err(e) => {
                warn!("Ignoring malformed rule: {}", e);
                compiled.errors.push(e);
            }
        }
    }
    compiled
}

/// Rules from configuration, or the built-in set when none are configured.
pub fn rules_from_config(configured: Option<&[RuleDef]>) -> CompiledRules {
    match configured {
        Some(defs) => compile_rules(defs),
        None => compile_rules(&default_rule_defs()),
    }
}
