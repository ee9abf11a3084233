//! Intent policies for generated statements.
//!
//! The keyword rules are heuristic necessary conditions: a statement that
//! fails one almost certainly does not answer the question, but passing all
//! of them proves nothing about correctness. Rules are data, so they can be
//! replaced or extended without touching the validation pipeline.

/// Checks that a statement plausibly answers the stated intent.
pub trait IntentPolicy: Send + Sync {
    /// `Err` carries a human-readable reason naming the missing construct.
    fn check(&self, sql: &str, intent: &str) -> Result<(), String>;
}

/// One keyword-triggered requirement.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Intent vocabulary that activates the rule (lowercase)
    pub triggers: Vec<String>,

    /// Every group must be satisfied; a group is satisfied when the
    /// statement contains any of its constructs (uppercase)
    pub required: Vec<Vec<String>>,

    pub message: String,
}

impl IntentRule {
    pub fn new(triggers: &[&str], required: &[&[&str]], message: &str) -> Self {
        Self {
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            required: required
                .iter()
                .map(|group| group.iter().map(|s| s.to_string()).collect())
                .collect(),
            message: message.to_string(),
        }
    }

    fn is_triggered(&self, intent: &str, words: &[&str]) -> bool {
        self.triggers.iter().any(|trigger| {
            if trigger.chars().all(char::is_alphanumeric) {
                words.iter().any(|w| w.starts_with(trigger.as_str()))
            } else {
                intent.contains(trigger.as_str())
            }
        })
    }

    fn is_satisfied(&self, normalized_sql: &str) -> bool {
        self.required
            .iter()
            .all(|group| group.iter().any(|c| normalized_sql.contains(c.as_str())))
    }
}

/// Keyword-driven intent rules for the trading table.
#[derive(Debug, Clone)]
pub struct KeywordIntentPolicy {
    rules: Vec<IntentRule>,
}

impl KeywordIntentPolicy {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }
}

impl Default for KeywordIntentPolicy {
    fn default() -> Self {
        Self::new(vec![
            IntentRule::new(
                &["profit", "loss", "pnl"],
                &[&["PNL", "PROFIT", "LOSS", "DAILY"]],
                "Missing profit/loss column.",
            ),
            IntentRule::new(
                &["percentage", "%"],
                &[&["COUNT"], &["100"]],
                "Percentage needs COUNT and * 100.",
            ),
            IntentRule::new(&["total", "sum"], &[&["SUM("]], "Total query needs SUM()."),
            IntentRule::new(&["average", "avg"], &[&["AVG("]], "Average query needs AVG()."),
            IntentRule::new(
                &["most", "highest", "best", "top"],
                &[&["ORDER BY"], &["DESC"]],
                "'Most/highest' needs ORDER BY DESC.",
            ),
        ])
    }
}

impl IntentPolicy for KeywordIntentPolicy {
    fn check(&self, sql: &str, intent: &str) -> Result<(), String> {
        let intent = intent.to_lowercase();
        let words: Vec<&str> = intent
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let normalized = normalize_sql(sql);

        for rule in &self.rules {
            if rule.is_triggered(&intent, &words) && !rule.is_satisfied(&normalized) {
                return Err(rule.message.clone());
            }
        }
        Ok(())
    }
}

/// Uppercase, single-spaced, no space before `(`.
pub(crate) fn normalize_sql(sql: &str) -> String {
    sql.to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" (", "(")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(sql: &str, intent: &str) -> Result<(), String> {
        KeywordIntentPolicy::default().check(sql, intent)
    }

    #[test]
    fn test_total_requires_sum() {
        assert_eq!(
            check("SELECT \"Daily_PnL\" FROM forex_trades", "total profit").unwrap_err(),
            "Total query needs SUM()."
        );
        assert!(check("SELECT SUM (\"Daily_PnL\") FROM forex_trades", "total profit").is_ok());
    }

    #[test]
    fn test_profit_requires_pnl_column() {
        assert_eq!(
            check("SELECT COUNT(*) FROM forex_trades", "how many losses").unwrap_err(),
            "Missing profit/loss column."
        );
    }

    #[test]
    fn test_percentage_requires_count_and_scale() {
        let err = check(
            "SELECT COUNT(*) FROM forex_trades WHERE \"Daily_PnL\" > 0",
            "what % of days were profitable",
        )
        .unwrap_err();
        assert_eq!(err, "Percentage needs COUNT and * 100.");

        assert!(check(
            "SELECT COUNT(CASE WHEN \"Daily_PnL\" > 0 THEN 1 END) * 100.0 / COUNT(*) FROM forex_trades",
            "profit percentage",
        )
        .is_ok());
    }

    #[test]
    fn test_superlative_requires_descending_order() {
        let sql = "SELECT \"Symbol\" FROM forex_trades ORDER BY \"Daily_PnL\"";
        assert_eq!(
            check(sql, "most traded symbol").unwrap_err(),
            "'Most/highest' needs ORDER BY DESC."
        );
        assert!(check(&format!("{} DESC", sql), "most traded symbol").is_ok());
    }

    #[test]
    fn test_triggers_match_word_starts_only() {
        // "stop" must not trigger the "top" rule
        assert!(check("SELECT \"Symbol\" FROM forex_trades", "list symbols with a stop").is_ok());
        // "averages" triggers "average"
        assert!(check("SELECT \"Symbol\" FROM forex_trades", "averages per symbol").is_err());
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        let policy = KeywordIntentPolicy::new(vec![IntentRule::new(
            &["count"],
            &[&["COUNT("]],
            "Count query needs COUNT().",
        )]);
        assert!(policy.check("SELECT SUM(x) FROM t", "total").is_ok());
        assert!(policy.check("SELECT x FROM t", "count trades").is_err());
        assert_eq!(policy.rules().len(), 1);
    }
}
