use std::fmt::Write as _;

use wisestudy_contracts::analysis::{AnalysisResult, SEVERITY_MAX};

const BAR_WIDTH: usize = 20;
const HIGHLIGHTED_WEAKNESSES: usize = 3;

/// Plain-text report for a terminal. Read-only view over the result.
pub fn render_report(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let overview = result.score_overview();

    let _ = writeln!(out, "== {}学情分析报告 ==", result.subject);
    if !result.summary.trim().is_empty() {
        let _ = writeln!(out, "{}", result.summary.trim());
    }
    let _ = writeln!(
        out,
        "\n预估得分: {} / {} ({}%)",
        trim_float(overview.estimated),
        trim_float(overview.total),
        overview.percentage
    );
    if overview.over_total {
        let _ = writeln!(out, "注意: 预估得分高于试卷总分，请核对原卷。");
    } else if overview.potential_gain > 0.0 {
        let _ = writeln!(
            out,
            "提分空间: {} 分。攻克下列薄弱知识点，预估分数有望显著提升。",
            trim_float(overview.potential_gain)
        );
    }

    let _ = writeln!(out, "\n-- 薄弱点透视 --");
    if result.weaknesses.is_empty() {
        let _ = writeln!(out, "(未发现明显薄弱点)");
    }
    for weakness in &result.weaknesses {
        let _ = writeln!(
            out,
            "{:<12} {} {:>3}",
            weakness.topic,
            severity_bar(weakness.severity),
            weakness.severity
        );
    }
    let highlighted = result.weaknesses_by_severity();
    for (idx, weakness) in highlighted.iter().take(HIGHLIGHTED_WEAKNESSES).enumerate() {
        let _ = writeln!(out, "  {}. {}: {}", idx + 1, weakness.topic, weakness.description);
    }

    let _ = writeln!(out, "\n-- 个性化提分计划 --");
    for (idx, item) in result.plan.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", idx + 1, item.stage, item.task);
        let _ = writeln!(out, "   重点: {}", item.focus);
    }

    let _ = writeln!(out, "\n-- 错题深度解析 --");
    if result.mistakes.is_empty() {
        let _ = writeln!(out, "(未识别到错题)");
    }
    for mistake in &result.mistakes {
        let _ = writeln!(out, "{} [{}]", mistake.question_id, mistake.topic);
        let _ = writeln!(out, "   错因: {}", mistake.cause);
        let _ = writeln!(out, "   解法: {}", mistake.solution);
    }

    out
}

fn severity_bar(severity: u8) -> String {
    let filled = usize::from(severity.min(SEVERITY_MAX)) * BAR_WIDTH / usize::from(SEVERITY_MAX);
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn trim_float(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
