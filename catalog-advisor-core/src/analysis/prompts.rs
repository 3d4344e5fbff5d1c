//! Prompt templates for CLI-backed providers
//!
//! The prompt embeds the update list, a workspace summary, an optional
//! vulnerability briefing, and the JSON schema the response parser expects.

use super::types::{AnalysisContext, AnalysisType, PackageUpdateInfo, VulnerabilitySummary};
use std::fmt::Write;

/// Response schema shown to the model
const RESPONSE_SCHEMA: &str = r#"{
  "summary": "One paragraph overview of the batch",
  "recommendations": [
    {
      "package": "exact package name from the list",
      "currentVersion": "1.0.0",
      "targetVersion": "2.0.0",
      "action": "update | skip | review | defer",
      "reason": "Why this action is recommended",
      "riskLevel": "low | medium | high | critical",
      "breakingChanges": ["Notable breaking change"],
      "securityFixes": ["CVE or advisory fixed by the target version"],
      "estimatedEffort": "low | medium | high"
    }
  ],
  "warnings": ["Anything the maintainer should double check"]
}"#;

/// Prompt templates for dependency update analysis
pub struct AnalysisPrompts;

impl AnalysisPrompts {
    /// Full prompt for one analysis context
    pub fn build(context: &AnalysisContext) -> String {
        let mut prompt = String::new();

        prompt.push_str(Self::task_description(context.analysis_type));
        prompt.push_str("\n\n");

        let ws = &context.workspace_info;
        let _ = writeln!(prompt, "Workspace: {} ({})", ws.name, ws.path.display());
        let _ = writeln!(
            prompt,
            "The workspace has {} packages and {} catalogs.",
            ws.package_count, ws.catalog_count
        );
        prompt.push('\n');

        let _ = writeln!(prompt, "Proposed updates ({}):", context.packages.len());
        for package in &context.packages {
            prompt.push_str(&Self::package_line(package));
            prompt.push('\n');
        }

        if let Some(briefing) = Self::security_briefing(context) {
            prompt.push('\n');
            prompt.push_str(&briefing);
        }

        prompt.push_str(
            "\nRespond with a single JSON object and nothing else. \
             Include exactly one recommendation per package listed above, \
             using this schema:\n",
        );
        prompt.push_str(RESPONSE_SCHEMA);
        prompt.push('\n');

        prompt
    }

    fn task_description(analysis_type: AnalysisType) -> &'static str {
        match analysis_type {
            AnalysisType::Impact => {
                "You are reviewing dependency updates for a monorepo that shares versions \
                 through catalogs. Assess the impact of each update on the workspace: \
                 breaking changes, migration effort and risk."
            }
            AnalysisType::Security => {
                "You are reviewing dependency updates for a monorepo. Focus on security: \
                 vulnerabilities fixed or introduced by each target version, and whether \
                 a safer version should be used instead."
            }
            AnalysisType::Compatibility => {
                "You are reviewing dependency updates for a monorepo. Focus on \
                 compatibility: peer dependency conflicts, runtime or engine requirements, \
                 and API changes between the current and target versions."
            }
            AnalysisType::Recommend => {
                "You are reviewing dependency updates for a monorepo. Recommend for each \
                 update whether to apply it now, skip it, review it manually, or defer it."
            }
        }
    }

    fn package_line(package: &PackageUpdateInfo) -> String {
        let mut line = format!(
            "- {}: {} -> {} ({})",
            package.name, package.current_version, package.target_version, package.update_type
        );
        if let Some(catalog) = &package.catalog_name {
            let _ = write!(line, " [catalog: {}]", catalog);
        }
        line
    }

    /// Vulnerability briefing for packages with security data, if any
    pub fn security_briefing(context: &AnalysisContext) -> Option<String> {
        let affected: Vec<(&PackageUpdateInfo, &VulnerabilitySummary)> = context
            .packages
            .iter()
            .filter_map(|p| context.security_for(p).map(|s| (p, s)))
            .filter(|(_, s)| s.total() > 0 || !s.identifiers.is_empty())
            .collect();

        if affected.is_empty() {
            return None;
        }

        let mut briefing = String::from("Known vulnerabilities (from the security scan):\n");
        for (package, summary) in affected {
            let _ = writeln!(
                briefing,
                "- {}@{}: {} critical, {} high, {} medium, {} low",
                package.name,
                package.target_version,
                summary.critical,
                summary.high,
                summary.medium,
                summary.low
            );

            if !summary.identifiers.is_empty() {
                let _ = writeln!(briefing, "  Advisories: {}", summary.identifiers.join(", "));
            }

            if !summary.fixed_versions.is_empty() {
                let _ = writeln!(briefing, "  Fixed in: {}", summary.fixed_versions.join(", "));
            }

            if let Some(safe) = &summary.safe_version {
                let scope = match (safe.same_major, safe.same_minor) {
                    (_, true) => "same minor line",
                    (true, false) => "same major line",
                    (false, false) => "different major line",
                };
                let _ = writeln!(briefing, "  Verified safe version: {} ({})", safe.version, scope);

                if !safe.skipped_versions.is_empty() {
                    let _ = writeln!(
                        briefing,
                        "  Skipped as vulnerable: {}",
                        safe.skipped_versions.join(", ")
                    );
                }
            }
        }

        Some(briefing)
    }
}
