//! Fault-tolerant parsing of model responses
//!
//! Four extraction strategies are tried in order; the first candidate that
//! both parses as JSON and passes structural validation wins.

use super::errors::{AnalysisError, ProviderResult};
use super::types::{
    Action, AnalysisContext, Effort, PackageUpdateInfo, Recommendation, RiskLevel,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Confidence of a result built when the response could not be parsed
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Reason used on every recommendation of a fallback result
pub const UNPARSEABLE_REASON: &str = "Unable to parse AI response";

/// How the JSON payload was located in the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Whole trimmed response
    Direct,
    /// Contents of the first fenced code block
    FencedBlock,
    /// First balanced `{ ... }` span
    BalancedObject,
    /// First `{` to last `}`
    GreedyObject,
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 4] =
        [Self::Direct, Self::FencedBlock, Self::BalancedObject, Self::GreedyObject];

    fn candidate<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Self::Direct => Some(text),
            Self::FencedBlock => regex_utils::response::fenced_block(text),
            Self::BalancedObject => find_balanced_object(text),
            Self::GreedyObject => regex_utils::response::greedy_object(text),
        }
    }
}

/// Structured content recovered from a response
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub strategy: ExtractionStrategy,
    pub summary: Option<String>,
    /// One per input package, in input order
    pub recommendations: Vec<Recommendation>,
    pub warnings: Vec<String>,
    pub details: Option<String>,
    pub confidence: f64,
}

/// Parse a raw response against the context it answers
pub fn parse_response(
    response: &str,
    context: &AnalysisContext,
) -> ProviderResult<ParsedResponse> {
    let (value, strategy) = extract_json(response)
        .ok_or_else(|| AnalysisError::parse("no JSON object with a recommendations array"))?;
    debug!("Parsed provider response using {:?}", strategy);

    let raw = value
        .get("recommendations")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalysisError::parse("recommendations is not an array"))?;
    let confidence = score_confidence(raw, context.packages.len());

    let mut warnings = string_list(&value, "warnings");
    let (recommendations, normalize_warnings) = normalize_recommendations(raw, &context.packages);
    warnings.extend(normalize_warnings);

    Ok(ParsedResponse {
        strategy,
        summary: str_field(&value, "summary").map(str::to_string),
        recommendations,
        warnings,
        details: str_field(&value, "details").map(str::to_string),
        confidence,
    })
}

/// Locate and validate the JSON payload
pub fn extract_json(response: &str) -> Option<(Value, ExtractionStrategy)> {
    let trimmed = response.trim();

    for strategy in ExtractionStrategy::ORDER {
        let Some(candidate) = strategy.candidate(trimmed) else {
            continue;
        };

        match serde_json::from_str::<Value>(candidate) {
            Ok(value) if validate_structure(&value) => return Some((value, strategy)),
            Ok(_) => debug!("{:?} candidate parsed but failed validation", strategy),
            Err(e) => debug!("{:?} candidate is not JSON: {}", strategy, e),
        }
    }

    None
}

/// First balanced object span, ignoring braces inside quoted strings
pub fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Minimal schema check: a `recommendations` array of typed objects
pub fn validate_structure(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    let Some(recommendations) = object.get("recommendations").and_then(Value::as_array) else {
        return false;
    };

    for key in ["summary", "details"] {
        if !matches!(object.get(key), None | Some(Value::Null) | Some(Value::String(_))) {
            return false;
        }
    }

    recommendations.iter().all(validate_recommendation)
}

fn validate_recommendation(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    if !matches!(object.get("package"), Some(Value::String(name)) if !name.trim().is_empty()) {
        return false;
    }

    let strings_ok = ["currentVersion", "targetVersion", "action", "reason", "riskLevel", "estimatedEffort"]
        .iter()
        .all(|key| matches!(object.get(*key), None | Some(Value::Null) | Some(Value::String(_))));

    let lists_ok = ["breakingChanges", "securityFixes"].iter().all(|key| match object.get(*key) {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.iter().all(Value::is_string),
        Some(_) => false,
    });

    strings_ok && lists_ok
}

/// Coverage (30%) plus average per-recommendation completeness (70%)
pub fn score_confidence(recommendations: &[Value], expected: usize) -> f64 {
    let count = recommendations.len();

    let coverage = if expected == 0 { 1.0 } else { (count as f64 / expected as f64).min(1.0) };

    let completeness = if count == 0 {
        0.0
    } else {
        recommendations.iter().map(completeness).sum::<f64>() / count as f64
    };

    (coverage * 0.3 + completeness * 0.7).clamp(0.0, 1.0)
}

fn completeness(value: &Value) -> f64 {
    let mut score = 0.0;

    if str_field(value, "package").is_some_and(|s| !s.trim().is_empty()) {
        score += 0.2;
    }
    if str_field(value, "action").is_some_and(|s| !s.trim().is_empty()) {
        score += 0.2;
    }
    if str_field(value, "reason").is_some_and(|s| s.chars().count() > 10) {
        score += 0.3;
    }
    if str_field(value, "riskLevel").is_some_and(|s| !s.trim().is_empty()) {
        score += 0.15;
    }
    if value.get("breakingChanges").and_then(Value::as_array).is_some_and(|a| !a.is_empty()) {
        score += 0.15;
    }

    score
}

/// Map raw entries onto the input packages, in input order.
///
/// Entries for unknown packages are dropped and packages the model skipped
/// get a `review` placeholder, so the output always matches the input.
pub fn normalize_recommendations(
    raw: &[Value],
    packages: &[PackageUpdateInfo],
) -> (Vec<Recommendation>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut by_name: HashMap<&str, Recommendation> = HashMap::new();

    for entry in raw {
        let name = str_field(entry, "package").unwrap_or_default();
        let Some(package) = packages.iter().find(|p| p.name == name) else {
            warnings.push(format!("Ignored recommendation for unknown package '{}'", name));
            continue;
        };

        by_name.entry(package.name.as_str()).or_insert_with(|| normalize_one(entry, package));
    }

    let recommendations = packages
        .iter()
        .map(|package| match by_name.get(package.name.as_str()) {
            Some(rec) => rec.clone(),
            None => {
                warnings.push(format!("No recommendation returned for {}", package.name));
                Recommendation::review(package, "No recommendation returned by provider")
            }
        })
        .collect();

    (recommendations, warnings)
}

fn normalize_one(entry: &Value, package: &PackageUpdateInfo) -> Recommendation {
    let reason = str_field(entry, "reason")
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("No reason provided");

    Recommendation {
        package: package.name.clone(),
        current_version: str_field(entry, "currentVersion")
            .unwrap_or(&package.current_version)
            .to_string(),
        target_version: str_field(entry, "targetVersion")
            .unwrap_or(&package.target_version)
            .to_string(),
        action: str_field(entry, "action").map(Action::normalize).unwrap_or(Action::Review),
        reason: reason.to_string(),
        risk_level: str_field(entry, "riskLevel")
            .map(RiskLevel::normalize)
            .unwrap_or(RiskLevel::Medium),
        breaking_changes: string_list(entry, "breakingChanges"),
        security_fixes: string_list(entry, "securityFixes"),
        estimated_effort: str_field(entry, "estimatedEffort")
            .map(Effort::normalize)
            .unwrap_or(Effort::Medium),
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
