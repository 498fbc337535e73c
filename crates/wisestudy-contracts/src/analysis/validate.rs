use std::fmt;

use serde_json::{Map, Value};

use super::{AnalysisResult, MistakeAnalysis, PlanItem, Weakness, SEVERITY_MAX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub problem: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("response does not match the analysis schema: {}", join_violations(.violations))]
pub struct SchemaError {
    pub violations: Vec<SchemaViolation>,
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    const SHOWN: usize = 5;
    let mut text = violations
        .iter()
        .take(SHOWN)
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join("; ");
    if violations.len() > SHOWN {
        text.push_str(&format!(" (+{} more)", violations.len() - SHOWN));
    }
    text
}

/// Checks every required field and its type, then builds the result.
///
/// Unknown extra fields are ignored. All violations are collected so the
/// caller can log the full picture in one line.
pub fn validate_analysis(value: &Value) -> Result<AnalysisResult, SchemaError> {
    let mut checker = Checker::default();
    let Some(root) = value.as_object() else {
        checker.push("$", format!("expected object, found {}", type_name(value)));
        return Err(checker.into_error());
    };

    let subject = checker.string(root, "", "subject");
    let estimated_score = checker.number(root, "", "estimatedScore");
    let total_score = checker.number(root, "", "totalScore");
    let summary = checker.string(root, "", "summary");
    let weaknesses = checker.list(root, "weaknesses", |checker, item, path| {
        let topic = checker.string(item, path, "topic");
        let severity = checker.severity(item, path, "severity");
        let description = checker.string(item, path, "description");
        Some(Weakness {
            topic: topic?,
            severity: severity?,
            description: description?,
        })
    });
    let plan = checker.list(root, "plan", |checker, item, path| {
        let stage = checker.string(item, path, "stage");
        let task = checker.string(item, path, "task");
        let focus = checker.string(item, path, "focus");
        Some(PlanItem {
            stage: stage?,
            task: task?,
            focus: focus?,
        })
    });
    let mistakes = checker.list(root, "mistakes", |checker, item, path| {
        let question_id = checker.string(item, path, "questionId");
        let topic = checker.string(item, path, "topic");
        let cause = checker.string(item, path, "cause");
        let solution = checker.string(item, path, "solution");
        Some(MistakeAnalysis {
            question_id: question_id?,
            topic: topic?,
            cause: cause?,
            solution: solution?,
        })
    });

    match (
        subject,
        estimated_score,
        total_score,
        summary,
        weaknesses,
        plan,
        mistakes,
    ) {
        (
            Some(subject),
            Some(estimated_score),
            Some(total_score),
            Some(summary),
            Some(weaknesses),
            Some(plan),
            Some(mistakes),
        ) if checker.violations.is_empty() => Ok(AnalysisResult {
            subject,
            estimated_score,
            total_score,
            summary,
            weaknesses,
            plan,
            mistakes,
        }),
        _ => Err(checker.into_error()),
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<SchemaViolation>,
}

impl Checker {
    fn push(&mut self, path: &str, problem: String) {
        self.violations.push(SchemaViolation {
            path: path.to_string(),
            problem,
        });
    }

    fn into_error(self) -> SchemaError {
        SchemaError {
            violations: self.violations,
        }
    }

    fn field<'a>(&mut self, obj: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
        let key = path.rsplit('.').next().unwrap_or(path);
        match obj.get(key) {
            Some(Value::Null) | None => {
                self.push(path, "missing required field".to_string());
                None
            }
            Some(value) => Some(value),
        }
    }

    fn string(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) -> Option<String> {
        let path = join_path(parent, key);
        let value = self.field(obj, &path)?;
        match value.as_str() {
            Some(text) => Some(text.to_string()),
            None => {
                self.push(&path, format!("expected string, found {}", type_name(value)));
                None
            }
        }
    }

    fn number(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) -> Option<f64> {
        let path = join_path(parent, key);
        let value = self.field(obj, &path)?;
        match value.as_f64().filter(|number| number.is_finite()) {
            Some(number) => Some(number),
            None => {
                self.push(&path, format!("expected number, found {}", type_name(value)));
                None
            }
        }
    }

    fn severity(&mut self, obj: &Map<String, Value>, parent: &str, key: &str) -> Option<u8> {
        let raw = self.number(obj, parent, key)?;
        if raw.fract() != 0.0 || !(0.0..=f64::from(SEVERITY_MAX)).contains(&raw) {
            self.push(
                &join_path(parent, key),
                format!("expected integer between 0 and {SEVERITY_MAX}, found {raw}"),
            );
            return None;
        }
        Some(raw as u8)
    }

    fn list<T>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        mut item: impl FnMut(&mut Self, &Map<String, Value>, &str) -> Option<T>,
    ) -> Option<Vec<T>> {
        let value = self.field(obj, key)?;
        let Some(items) = value.as_array() else {
            self.push(key, format!("expected array, found {}", type_name(value)));
            return None;
        };

        let mut out = Vec::with_capacity(items.len());
        let mut complete = true;
        for (idx, raw) in items.iter().enumerate() {
            let path = format!("{key}[{idx}]");
            let Some(entry) = raw.as_object() else {
                self.push(&path, format!("expected object, found {}", type_name(raw)));
                complete = false;
                continue;
            };
            match item(self, entry, &path) {
                Some(parsed) => out.push(parsed),
                None => complete = false,
            }
        }
        complete.then_some(out)
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
