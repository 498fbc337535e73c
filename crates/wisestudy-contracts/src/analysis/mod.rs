mod schema;
mod validate;

use serde::{Deserialize, Serialize};

pub use schema::response_schema;
pub use validate::{validate_analysis, SchemaError, SchemaViolation};

pub const SEVERITY_MAX: u8 = 100;

/// Structured report produced by one analysis request.
///
/// Values are immutable once received. A new submission produces a new
/// instance; nothing is merged into a previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub subject: String,
    pub estimated_score: f64,
    pub total_score: f64,
    pub summary: String,
    pub weaknesses: Vec<Weakness>,
    pub plan: Vec<PlanItem>,
    pub mistakes: Vec<MistakeAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weakness {
    pub topic: String,
    /// 0 (solid) to 100 (very weak).
    pub severity: u8,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub stage: String,
    pub task: String,
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeAnalysis {
    pub question_id: String,
    pub topic: String,
    pub cause: String,
    pub solution: String,
}

/// Display-oriented numbers derived from the raw scores.
///
/// The raw `estimated_score` / `total_score` are kept untouched on
/// [`AnalysisResult`]; only this view clamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOverview {
    pub estimated: f64,
    pub total: f64,
    pub percentage: u8,
    pub potential_gain: f64,
    pub over_total: bool,
}

impl AnalysisResult {
    pub fn score_overview(&self) -> ScoreOverview {
        let denominator = if self.total_score > 0.0 {
            self.total_score
        } else {
            100.0
        };
        let ratio = (self.estimated_score / denominator * 100.0).round();
        let percentage = ratio.clamp(0.0, 100.0) as u8;
        ScoreOverview {
            estimated: self.estimated_score,
            total: self.total_score,
            percentage,
            potential_gain: (self.total_score - self.estimated_score).max(0.0),
            over_total: self.estimated_score > self.total_score,
        }
    }

    /// Weaknesses ordered from most to least severe, ties kept in source order.
    pub fn weaknesses_by_severity(&self) -> Vec<&Weakness> {
        let mut ranked: Vec<&Weakness> = self.weaknesses.iter().collect();
        ranked.sort_by(|left, right| right.severity.cmp(&left.severity));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisResult, Weakness};

    fn result(estimated: f64, total: f64) -> AnalysisResult {
        AnalysisResult {
            subject: "数学".to_string(),
            estimated_score: estimated,
            total_score: total,
            summary: String::new(),
            weaknesses: Vec::new(),
            plan: Vec::new(),
            mistakes: Vec::new(),
        }
    }

    #[test]
    fn score_overview_reports_percentage_and_gain() {
        let overview = result(92.0, 150.0).score_overview();
        assert_eq!(overview.percentage, 61);
        assert_eq!(overview.potential_gain, 58.0);
        assert!(!overview.over_total);
    }

    #[test]
    fn score_overview_uses_hundred_when_total_missing() {
        let overview = result(45.0, 0.0).score_overview();
        assert_eq!(overview.percentage, 45);
        assert_eq!(overview.potential_gain, 0.0);
    }

    #[test]
    fn score_overview_clamps_when_estimate_exceeds_total() {
        let raw = result(130.0, 120.0);
        let overview = raw.score_overview();
        assert_eq!(overview.percentage, 100);
        assert_eq!(overview.potential_gain, 0.0);
        assert!(overview.over_total);
        assert_eq!(raw.estimated_score, 130.0);
    }

    #[test]
    fn weaknesses_by_severity_is_stable() {
        let mut value = result(80.0, 100.0);
        for (topic, severity) in [("函数", 40), ("几何", 85), ("数列", 40), ("概率", 90)] {
            value.weaknesses.push(Weakness {
                topic: topic.to_string(),
                severity,
                description: String::new(),
            });
        }
        let topics: Vec<&str> = value
            .weaknesses_by_severity()
            .into_iter()
            .map(|weakness| weakness.topic.as_str())
            .collect();
        assert_eq!(topics, vec!["概率", "几何", "函数", "数列"]);
    }

    #[test]
    fn serializes_with_camel_case_wire_names() -> anyhow::Result<()> {
        let value = serde_json::to_value(result(1.0, 2.0))?;
        assert!(value.get("estimatedScore").is_some());
        assert!(value.get("totalScore").is_some());
        assert!(value.get("estimated_score").is_none());
        Ok(())
    }
}
