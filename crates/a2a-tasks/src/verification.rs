//! Pluggable verification rule engine: tagged rule variants dispatched by
//! type, with custom handlers registerable by name for one-off rules that
//! don't fit the built-in set.

use std::sync::Arc;

use a2a_types::task::{
    Deliverable, QualityLevel, VerificationResult, VerificationRule, VerificationRuleType,
    VerificationStatus, Verdict,
};

/// Filesystem-shaped facts about a deliverable, resolved by the caller
/// (default implementation reads the real filesystem; tests and non-file
/// deliverables supply a stub) so the rule engine itself never touches I/O
/// directly.
pub trait DeliverableContext: Send + Sync {
    fn exists(&self, path: &str) -> bool;
    fn read_to_string(&self, path: &str) -> std::io::Result<String>;
    fn size_bytes(&self, path: &str) -> Option<u64>;
}

/// Reads straight off the local filesystem. The default context in any
/// deployment that verifies real deliverable files.
pub struct FsDeliverableContext;

impl DeliverableContext for FsDeliverableContext {
    fn exists(&self, path: &str) -> bool {
        std::path::Path::new(path).exists()
    }

    fn read_to_string(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn size_bytes(&self, path: &str) -> Option<u64> {
        std::fs::metadata(path).ok().map(|m| m.len())
    }
}

type Handler = dyn Fn(&VerificationRule, &dyn DeliverableContext) -> VerificationResult + Send + Sync;

fn passed(message: impl Into<String>, score: f64) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Passed,
        score,
        details: message.into(),
        suggestions: vec![],
    }
}

fn failed(message: impl Into<String>, score: f64, suggestions: Vec<String>) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Failed,
        score,
        details: message.into(),
        suggestions,
    }
}

fn skipped(message: impl Into<String>) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Skipped,
        score: 100.0,
        details: message.into(),
        suggestions: vec![],
    }
}

fn error(message: impl Into<String>) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Error,
        score: 0.0,
        details: message.into(),
        suggestions: vec![],
    }
}

fn check_file_exists(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    let required = rule
        .criteria
        .get("required")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    if path.is_empty() {
        return error("no file path specified");
    }
    let exists = ctx.exists(path);
    if required && !exists {
        return failed(
            format!("required file not found: {path}"),
            0.0,
            vec![format!("create file: {path}")],
        );
    }
    if exists {
        let size = ctx.size_bytes(path).unwrap_or(0);
        return passed(format!("file exists: {path} ({size} bytes)"), 100.0);
    }
    skipped(format!("optional file not found: {path}"))
}

fn check_file_content(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    let patterns: Vec<String> = rule
        .criteria
        .get("patterns")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let min_lines = rule.criteria.get("min_lines").and_then(|v| v.as_u64()).unwrap_or(0);
    let max_lines = rule.criteria.get("max_lines").and_then(|v| v.as_u64());

    if path.is_empty() || !ctx.exists(path) {
        return failed(format!("file not found: {path}"), 0.0, vec![]);
    }
    let content = match ctx.read_to_string(path) {
        Ok(c) => c,
        Err(e) => return error(format!("cannot read file: {e}")),
    };
    let line_count = content.lines().count() as u64;

    if line_count < min_lines {
        return failed(
            format!("file too short: {line_count} lines (min: {min_lines})"),
            50.0,
            vec![format!("add more content (minimum {min_lines} lines required)")],
        );
    }
    if let Some(max) = max_lines {
        if line_count > max {
            return failed(
                format!("file too long: {line_count} lines (max: {max})"),
                50.0,
                vec![format!("reduce file size (maximum {max} lines)")],
            );
        }
    }

    let missing: Vec<&String> = patterns.iter().filter(|p| !content.contains(p.as_str())).collect();
    if !missing.is_empty() {
        let score = (100.0 - missing.len() as f64 * 20.0).max(0.0);
        let status = if score > 50.0 {
            VerificationStatus::Partial
        } else {
            VerificationStatus::Failed
        };
        return VerificationResult {
            status,
            score,
            details: format!("missing patterns: {missing:?}"),
            suggestions: missing.iter().map(|p| format!("add required content: {p}")).collect(),
        };
    }
    passed(
        format!("content check passed: {line_count} lines, {} patterns matched", patterns.len()),
        100.0,
    )
}

fn check_code_quality(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    if path.is_empty() || !ctx.exists(path) {
        return skipped(format!("file not found: {path}"));
    }
    let content = match ctx.read_to_string(path) {
        Ok(c) => c,
        Err(e) => return error(format!("cannot read file: {e}")),
    };

    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let n = i + 1;
        if line.len() > 120 {
            issues.push(format!("line {n}: too long ({} chars)", line.len()));
            suggestions.push(format!("line {n}: shorten to under 120 characters"));
        }
        if line != line.trim_end() {
            issues.push(format!("line {n}: trailing whitespace"));
        }
        if line.contains("TODO") || line.contains("FIXME") {
            issues.push(format!("line {n}: contains TODO/FIXME"));
        }
    }

    let score = (100.0 - issues.len() as f64 * 5.0).max(0.0);
    if !issues.is_empty() {
        let status = if score > 70.0 {
            VerificationStatus::Partial
        } else {
            VerificationStatus::Failed
        };
        return VerificationResult {
            status,
            score,
            details: format!("code quality issues found: {}", issues.len()),
            suggestions: suggestions.into_iter().take(5).collect(),
        };
    }
    passed(format!("code quality check passed: {} issues", issues.len()), 100.0)
}

fn check_documentation(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    let requires_comments = rule
        .criteria
        .get("requires_comments")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let min_doc_ratio = rule.criteria.get("min_doc_ratio").and_then(|v| v.as_f64()).unwrap_or(0.1);

    if path.is_empty() || !ctx.exists(path) {
        return skipped(format!("file not found: {path}"));
    }
    let content = match ctx.read_to_string(path) {
        Ok(c) => c,
        Err(e) => return error(format!("cannot read file: {e}")),
    };

    let mut issues = Vec::new();
    let has_doc_comment = content.contains("///") || content.contains("//!") || content.contains("\"\"\"");
    if !has_doc_comment {
        issues.push("no doc comments found".to_string());
    }

    let lines: Vec<&str> = content.lines().collect();
    let comment_lines = lines.iter().filter(|l| l.trim_start().starts_with("//")).count();
    let doc_ratio = if lines.is_empty() {
        0.0
    } else {
        comment_lines as f64 / lines.len() as f64
    };
    if requires_comments && doc_ratio < min_doc_ratio {
        issues.push(format!("low comment ratio: {:.1}% (min: {:.1}%)", doc_ratio * 100.0, min_doc_ratio * 100.0));
    }

    if !issues.is_empty() {
        let score = (100.0 - issues.len() as f64 * 30.0).max(0.0);
        let status = if score > 60.0 {
            VerificationStatus::Partial
        } else {
            VerificationStatus::Failed
        };
        return VerificationResult {
            status,
            score,
            details: format!("documentation issues: {issues:?}"),
            suggestions: vec!["add module/function doc comments".into(), "add inline comments".into()],
        };
    }
    passed("documentation check passed", 100.0)
}

fn check_test_coverage(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    let min_ratio = rule.criteria.get("min_coverage_ratio").and_then(|v| v.as_f64()).unwrap_or(0.2);

    if path.is_empty() || !ctx.exists(path) {
        return skipped(format!("file not found: {path}"));
    }
    let content = match ctx.read_to_string(path) {
        Ok(c) => c,
        Err(e) => return error(format!("cannot read file: {e}")),
    };

    let test_fns = content.matches("#[test]").count() as f64;
    let total_fns = content.matches("fn ").count() as f64;
    let ratio = if total_fns == 0.0 { 0.0 } else { test_fns / total_fns };

    if ratio < min_ratio {
        let score = (ratio / min_ratio * 100.0).clamp(0.0, 100.0);
        let status = if score > 50.0 { VerificationStatus::Partial } else { VerificationStatus::Failed };
        return VerificationResult {
            status,
            score,
            details: format!("test coverage ratio {:.1}% below minimum {:.1}%", ratio * 100.0, min_ratio * 100.0),
            suggestions: vec!["add #[test] functions covering the untested paths".into()],
        };
    }
    passed(format!("test coverage ratio {:.1}% meets minimum {:.1}%", ratio * 100.0, min_ratio * 100.0), 100.0)
}

fn check_security(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    let default_patterns = ["unwrap()", "eval(", "unsafe ", "password = \"", "api_key = \"", "secret = \""];
    let forbidden: Vec<String> = rule
        .criteria
        .get("forbidden_patterns")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
        .unwrap_or_else(|| default_patterns.iter().map(|s| s.to_string()).collect());

    if path.is_empty() || !ctx.exists(path) {
        return skipped(format!("file not found: {path}"));
    }
    let content = match ctx.read_to_string(path) {
        Ok(c) => c,
        Err(e) => return error(format!("cannot read file: {e}")),
    };

    let mut issues = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let n = i + 1;
        for pattern in &forbidden {
            if line.contains(pattern.as_str()) {
                issues.push(format!("line {n}: matched forbidden pattern `{pattern}`"));
            }
        }
    }

    let score = (100.0 - issues.len() as f64 * 25.0).max(0.0);
    if !issues.is_empty() {
        let status = if score > 50.0 { VerificationStatus::Partial } else { VerificationStatus::Failed };
        return VerificationResult {
            status,
            score,
            details: format!("security issues found: {}", issues.len()),
            suggestions: issues.into_iter().take(5).collect(),
        };
    }
    passed("no forbidden patterns found", 100.0)
}

fn check_performance(rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
    let path = rule.criteria.get("path").and_then(|v| v.as_str()).unwrap_or("");
    let max_bytes = rule.criteria.get("max_bytes").and_then(|v| v.as_u64()).unwrap_or(100_000);
    let max_clones = rule.criteria.get("max_clone_calls").and_then(|v| v.as_u64()).unwrap_or(20);

    if path.is_empty() || !ctx.exists(path) {
        return skipped(format!("file not found: {path}"));
    }
    let content = match ctx.read_to_string(path) {
        Ok(c) => c,
        Err(e) => return error(format!("cannot read file: {e}")),
    };
    let size = ctx.size_bytes(path).unwrap_or(content.len() as u64);
    let clone_calls = content.matches(".clone()").count() as u64;

    let mut issues = Vec::new();
    if size > max_bytes {
        issues.push(format!("file size {size} bytes exceeds budget {max_bytes} bytes"));
    }
    if clone_calls > max_clones {
        issues.push(format!("{clone_calls} .clone() calls exceed budget {max_clones}"));
    }

    if !issues.is_empty() {
        let score = (100.0 - issues.len() as f64 * 30.0).max(0.0);
        let status = if score > 50.0 { VerificationStatus::Partial } else { VerificationStatus::Failed };
        return VerificationResult {
            status,
            score,
            details: format!("performance budget exceeded: {issues:?}"),
            suggestions: vec!["reduce allocations and split oversized files".into()],
        };
    }
    passed(format!("within performance budget: {size} bytes, {clone_calls} clones"), 100.0)
}

/// Dispatches rule execution by [`VerificationRuleType`] tag, with custom
/// handlers registerable for the `Custom(name)` variant.
pub struct VerificationRuleEngine {
    rules: Vec<VerificationRule>,
    custom_handlers: std::collections::HashMap<String, Arc<Handler>>,
}

impl VerificationRuleEngine {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            custom_handlers: std::collections::HashMap::new(),
        }
    }

    /// The three built-in rules every engine starts with: a required
    /// file-existence check, a required code-quality check, and an
    /// optional documentation check.
    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.register_rule(VerificationRule {
            id: "check_main_file".to_string(),
            rule_type: VerificationRuleType::FileExists,
            criteria: serde_json::json!({"required": true}),
            weight: 1.0,
            required: true,
        });
        engine.register_rule(VerificationRule {
            id: "check_code_quality".to_string(),
            rule_type: VerificationRuleType::CodeQuality,
            criteria: serde_json::json!({}),
            weight: 0.8,
            required: true,
        });
        engine.register_rule(VerificationRule {
            id: "check_documentation".to_string(),
            rule_type: VerificationRuleType::Documentation,
            criteria: serde_json::json!({"requires_comments": false}),
            weight: 0.6,
            required: false,
        });
        engine
    }

    pub fn register_rule(&mut self, rule: VerificationRule) {
        self.rules.retain(|r| r.id != rule.id);
        self.rules.push(rule);
    }

    pub fn register_custom_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&VerificationRule, &dyn DeliverableContext) -> VerificationResult + Send + Sync + 'static,
    ) {
        self.custom_handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn rules(&self) -> &[VerificationRule] {
        &self.rules
    }

    fn execute(&self, rule: &VerificationRule, ctx: &dyn DeliverableContext) -> VerificationResult {
        match &rule.rule_type {
            VerificationRuleType::FileExists => check_file_exists(rule, ctx),
            VerificationRuleType::FileContent => check_file_content(rule, ctx),
            VerificationRuleType::CodeQuality => check_code_quality(rule, ctx),
            VerificationRuleType::Documentation => check_documentation(rule, ctx),
            VerificationRuleType::TestCoverage => check_test_coverage(rule, ctx),
            VerificationRuleType::SecurityCheck => check_security(rule, ctx),
            VerificationRuleType::Performance => check_performance(rule, ctx),
            VerificationRuleType::Custom(name) => match self.custom_handlers.get(name) {
                Some(handler) => handler(rule, ctx),
                None => error(format!("no handler for custom rule type: {name}")),
            },
        }
    }

    /// Runs every registered rule against one deliverable's resolved path,
    /// rewriting each rule's `criteria.path` on the fly without mutating
    /// shared rule state.
    pub fn verify_deliverable(
        &self,
        deliverable: &Deliverable,
        ctx: &dyn DeliverableContext,
    ) -> Vec<(String, VerificationResult)> {
        let Some(path) = deliverable.path.as_deref() else {
            return vec![];
        };
        self.rules
            .iter()
            .map(|rule| {
                let mut criteria = rule.criteria.clone();
                if let Some(obj) = criteria.as_object_mut() {
                    obj.insert("path".to_string(), serde_json::Value::String(path.to_string()));
                }
                let scoped = VerificationRule {
                    id: rule.id.clone(),
                    rule_type: rule.rule_type.clone(),
                    criteria,
                    weight: rule.weight,
                    required: rule.required,
                };
                (rule.id.clone(), self.execute(&scoped, ctx))
            })
            .collect()
    }
}

impl Default for VerificationRuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the delegation-level verdict from rules + their results:
/// weighted score honoring each rule's declared `weight`,
/// FAILED-on-any-required-rule-failure, PASSED/PARTIAL/FAILED thresholds,
/// and the derived [`QualityLevel`].
pub fn compute_verdict_weighted(
    rules: &[VerificationRule],
    results: &[(String, VerificationResult)],
) -> Verdict {
    let mut total_score = 0.0;
    let mut total_weight = 0.0;
    let mut failed_required = false;

    for (rule_id, result) in results {
        let Some(rule) = rules.iter().find(|r| &r.id == rule_id) else {
            continue;
        };
        total_score += result.score * rule.weight;
        total_weight += rule.weight;
        if rule.required
            && matches!(result.status, VerificationStatus::Failed | VerificationStatus::Error)
        {
            failed_required = true;
        }
    }

    let weighted_score = if total_weight > 0.0 { total_score / total_weight } else { 0.0 };
    let status = if failed_required {
        VerificationStatus::Failed
    } else if weighted_score >= 90.0 {
        VerificationStatus::Passed
    } else if weighted_score >= 60.0 {
        VerificationStatus::Partial
    } else {
        VerificationStatus::Failed
    };

    Verdict {
        status,
        weighted_score,
        quality: QualityLevel::from_score(weighted_score),
        rule_results: results.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeFs {
        files: Mutex<HashMap<String, String>>,
    }

    impl FakeFs {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: Mutex::new(files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect()),
            }
        }
    }

    impl DeliverableContext for FakeFs {
        fn exists(&self, path: &str) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }
        fn read_to_string(&self, path: &str) -> std::io::Result<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path))
        }
        fn size_bytes(&self, path: &str) -> Option<u64> {
            self.files.lock().unwrap().get(path).map(|c| c.len() as u64)
        }
    }

    #[test]
    fn file_exists_required_missing_fails() {
        let engine = VerificationRuleEngine::with_default_rules();
        let ctx = FakeFs::new(&[]);
        let deliverable = Deliverable {
            kind: "code".into(),
            description: "impl".into(),
            path: Some("missing.rs".into()),
            criteria: vec![],
        };
        let results = engine.verify_deliverable(&deliverable, &ctx);
        let (_, main_file) = results.iter().find(|(id, _)| id == "check_main_file").unwrap();
        assert_eq!(main_file.status, VerificationStatus::Failed);
    }

    #[test]
    fn high_quality_file_passes_all_rules() {
        let engine = VerificationRuleEngine::with_default_rules();
        let ctx = FakeFs::new(&[("good.rs", "/// doc\nfn main() {}\n")]);
        let deliverable = Deliverable {
            kind: "code".into(),
            description: "impl".into(),
            path: Some("good.rs".into()),
            criteria: vec![],
        };
        let results = engine.verify_deliverable(&deliverable, &ctx);
        for (_, result) in &results {
            assert_ne!(result.status, VerificationStatus::Failed);
        }
    }

    #[test]
    fn weighted_verdict_fails_closed_on_required_rule() {
        let rules = vec![
            VerificationRule {
                id: "r1".into(),
                rule_type: VerificationRuleType::FileExists,
                criteria: serde_json::json!({}),
                weight: 1.0,
                required: true,
            },
            VerificationRule {
                id: "r2".into(),
                rule_type: VerificationRuleType::Documentation,
                criteria: serde_json::json!({}),
                weight: 0.5,
                required: false,
            },
        ];
        let results = vec![
            (
                "r1".to_string(),
                VerificationResult {
                    status: VerificationStatus::Failed,
                    score: 0.0,
                    details: "missing".into(),
                    suggestions: vec![],
                },
            ),
            (
                "r2".to_string(),
                VerificationResult {
                    status: VerificationStatus::Passed,
                    score: 100.0,
                    details: "ok".into(),
                    suggestions: vec![],
                },
            ),
        ];
        let verdict = compute_verdict_weighted(&rules, &results);
        assert_eq!(verdict.status, VerificationStatus::Failed);
    }

    #[test]
    fn weighted_verdict_passes_at_high_score() {
        let rules = vec![VerificationRule {
            id: "r1".into(),
            rule_type: VerificationRuleType::FileExists,
            criteria: serde_json::json!({}),
            weight: 1.0,
            required: true,
        }];
        let results = vec![(
            "r1".to_string(),
            VerificationResult {
                status: VerificationStatus::Passed,
                score: 95.0,
                details: "ok".into(),
                suggestions: vec![],
            },
        )];
        let verdict = compute_verdict_weighted(&rules, &results);
        assert_eq!(verdict.status, VerificationStatus::Passed);
        assert_eq!(verdict.quality, QualityLevel::Excellent);
    }

    #[test]
    fn test_coverage_rule_fails_below_minimum_ratio() {
        let ctx = FakeFs::new(&[("lib.rs", "fn a() {}\nfn b() {}\nfn c() {}\nfn d() {}\nfn e() {}\n")]);
        let rule = VerificationRule {
            id: "cov".into(),
            rule_type: VerificationRuleType::TestCoverage,
            criteria: serde_json::json!({"path": "lib.rs", "min_coverage_ratio": 0.5}),
            weight: 1.0,
            required: true,
        };
        let result = check_test_coverage(&rule, &ctx);
        assert_ne!(result.status, VerificationStatus::Passed);
    }

    #[test]
    fn test_coverage_rule_passes_with_enough_tests() {
        let ctx = FakeFs::new(&[("lib.rs", "fn a() {}\n#[test]\nfn test_a() {}\n")]);
        let rule = VerificationRule {
            id: "cov".into(),
            rule_type: VerificationRuleType::TestCoverage,
            criteria: serde_json::json!({"path": "lib.rs", "min_coverage_ratio": 0.3}),
            weight: 1.0,
            required: true,
        };
        let result = check_test_coverage(&rule, &ctx);
        assert_eq!(result.status, VerificationStatus::Passed);
    }

    #[test]
    fn security_rule_flags_forbidden_pattern() {
        let ctx = FakeFs::new(&[("lib.rs", "let x = foo().unwrap();\n")]);
        let rule = VerificationRule {
            id: "sec".into(),
            rule_type: VerificationRuleType::SecurityCheck,
            criteria: serde_json::json!({"path": "lib.rs"}),
            weight: 1.0,
            required: true,
        };
        let result = check_security(&rule, &ctx);
        assert_eq!(result.status, VerificationStatus::Failed);
    }

    #[test]
    fn security_rule_passes_clean_file() {
        let ctx = FakeFs::new(&[("lib.rs", "fn add(a: i32, b: i32) -> i32 { a + b }\n")]);
        let rule = VerificationRule {
            id: "sec".into(),
            rule_type: VerificationRuleType::SecurityCheck,
            criteria: serde_json::json!({"path": "lib.rs"}),
            weight: 1.0,
            required: true,
        };
        let result = check_security(&rule, &ctx);
        assert_eq!(result.status, VerificationStatus::Passed);
    }

    #[test]
    fn performance_rule_flags_oversized_file() {
        let ctx = FakeFs::new(&[("lib.rs", "x")]);
        let rule = VerificationRule {
            id: "perf".into(),
            rule_type: VerificationRuleType::Performance,
            criteria: serde_json::json!({"path": "lib.rs", "max_bytes": 0}),
            weight: 1.0,
            required: true,
        };
        let result = check_performance(&rule, &ctx);
        assert_ne!(result.status, VerificationStatus::Passed);
    }

    #[test]
    fn performance_rule_passes_within_budget() {
        let ctx = FakeFs::new(&[("lib.rs", "fn main() {}\n")]);
        let rule = VerificationRule {
            id: "perf".into(),
            rule_type: VerificationRuleType::Performance,
            criteria: serde_json::json!({"path": "lib.rs"}),
            weight: 1.0,
            required: true,
        };
        let result = check_performance(&rule, &ctx);
        assert_eq!(result.status, VerificationStatus::Passed);
    }

    #[test]
    fn engine_dispatches_to_all_rule_types_without_skipping() {
        let ctx = FakeFs::new(&[("f.rs", "fn a() {}\n#[test]\nfn test_a() {}\n")]);
        for rule_type in [
            VerificationRuleType::TestCoverage,
            VerificationRuleType::SecurityCheck,
            VerificationRuleType::Performance,
        ] {
            let mut engine = VerificationRuleEngine::new();
            engine.register_rule(VerificationRule {
                id: "r".into(),
                rule_type,
                criteria: serde_json::json!({"path": "f.rs"}),
                weight: 1.0,
                required: true,
            });
            let deliverable = Deliverable {
                kind: "code".into(),
                description: "impl".into(),
                path: Some("f.rs".into()),
                criteria: vec![],
            };
            let results = engine.verify_deliverable(&deliverable, &ctx);
            let (_, result) = &results[0];
            assert_ne!(result.status, VerificationStatus::Skipped, "rule dispatch must not fall back to a skip stub");
        }
    }
}
