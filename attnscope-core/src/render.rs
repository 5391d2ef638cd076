//! Visualization formatter.
//!
//! Maps tokens, their aligned weights, and the ranked candidates onto what the
//! page shows: a red-scaled background per token, a proportional progress bar,
//! and a check that the weights sum to one. All functions are pure.

use serde::Serialize;

use crate::config::RenderConfig;
use crate::types::{AggregationMode, AnalysisResult, Prediction, Token};

const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

/// Green/blue channel value for a weight: `round(255 * (1 - weight))`.
///
/// Weights outside `[0, 1]` are clamped so the color stays valid.
pub fn color_intensity(weight: f32) -> u8 {
    let w = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 };
    (255.0 * (1.0 - w)).round() as u8
}

/// CSS background for a token: full red channel, fading to white at weight 0.
pub fn token_color(weight: f32) -> String {
    let i = color_intensity(weight);
    format!("rgb(255, {i}, {i})")
}

/// Progress bar length: `round(weight / max_weight * width)`, capped at `width`.
pub fn bar_length(weight: f32, max_weight: f32, width: usize) -> usize {
    if max_weight.is_nan() || max_weight <= 0.0 || !weight.is_finite() || weight <= 0.0 {
        return 0;
    }
    let len = ((weight / max_weight) * width as f32).round() as usize;
    len.min(width)
}

/// Render a bar of `filled` cells padded with empty cells to `width`.
pub fn progress_bar(filled: usize, width: usize) -> String {
    let filled = filled.min(width);
    std::iter::repeat_n(BAR_FILLED, filled)
        .chain(std::iter::repeat_n(BAR_EMPTY, width - filled))
        .collect()
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    text.chars().fold(String::with_capacity(text.len()), |mut out, c| {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
        out
    })
}

/// Outcome of comparing the weight sum against 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightCheck {
    pub sum: f32,
    pub within_tolerance: bool,
}

pub fn check_weight_sum(weights: &[f32], tolerance: f32) -> WeightCheck {
    let sum: f32 = weights.iter().sum();
    WeightCheck {
        sum,
        within_tolerance: (sum - 1.0).abs() < tolerance,
    }
}

/// One token as it appears on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenView {
    pub index: usize,
    pub text: String,
    pub id: u32,
    pub weight: f32,
    pub intensity: u8,
    pub color: String,
    pub bar_length: usize,
    pub bar: String,
}

/// Build the per-token rows. `tokens` and `weights` are zipped by index.
pub fn token_views(tokens: &[Token], weights: &[f32], bar_width: usize) -> Vec<TokenView> {
    let max_weight = weights.iter().copied().fold(0.0f32, f32::max);
    tokens
        .iter()
        .zip(weights)
        .enumerate()
        .map(|(index, (token, &weight))| {
            let len = bar_length(weight, max_weight, bar_width);
            TokenView {
                index,
                text: token.text.clone(),
                id: token.id,
                weight,
                intensity: color_intensity(weight),
                color: token_color(weight),
                bar_length: len,
                bar: progress_bar(len, bar_width),
            }
        })
        .collect()
}

/// One ranked candidate as it appears in the prediction tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    pub rank: usize,
    pub token: String,
    pub token_id: u32,
    pub probability: f64,
    pub percent: String,
}

pub fn candidate_views(prediction: &Prediction) -> Vec<CandidateView> {
    prediction
        .top_candidates
        .iter()
        .map(|c| CandidateView {
            rank: c.rank,
            token: c.token.clone(),
            token_id: c.token_id,
            probability: c.probability,
            percent: format_percent(c.probability),
        })
        .collect()
}

/// Everything needed to draw one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visualization {
    pub tokens: Vec<TokenView>,
    pub weight_check: WeightCheck,
    pub mode: AggregationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

impl Visualization {
    pub fn build(result: &AnalysisResult, config: &RenderConfig) -> Self {
        Self {
            tokens: token_views(&result.tokens, &result.weights, config.bar_width),
            weight_check: check_weight_sum(&result.weights, config.sum_tolerance),
            mode: result.mode,
            prediction: result.prediction.clone(),
        }
    }

    /// Inline token strip: each token on a background scaled by its weight.
    pub fn token_strip_html(&self) -> String {
        self.tokens
            .iter()
            .map(|t| {
                format!(
                    r#"<span class="token" style="background-color: {}" title="weight: {:.3}">{}</span>"#,
                    t.color,
                    t.weight,
                    escape_html(&t.text)
                )
            })
            .collect()
    }

    /// Per-token detail rows with id, weight, and progress bar, followed by
    /// the weight-sum check.
    pub fn token_details_html(&self) -> String {
        let rows: String = self
            .tokens
            .iter()
            .map(|t| {
                format!(
                    concat!(
                        r#"<div class="token-row">"#,
                        r#"<span class="token-index">[{}]</span> "#,
                        r#"<span class="token-text">"{}"</span> "#,
                        r#"<span class="token-id">(ID: {})</span><br>"#,
                        r#"<span class="token-weight">weight: {:.3}</span> "#,
                        r#"<span class="token-bar">{}</span>"#,
                        "</div>"
                    ),
                    t.index,
                    escape_html(&t.text),
                    t.id,
                    t.weight,
                    t.bar
                )
            })
            .collect();

        // Column-sum weights are rescaled, so their sum carries no meaning.
        let check = if self.mode.sums_to_one() {
            let (icon, class) = if self.weight_check.within_tolerance {
                ("✓", "sum-ok")
            } else {
                ("⚠", "sum-off")
            };
            format!(
                r#"<div class="weight-sum"><strong>weight sum: {:.3}</strong> <span class="{class}">{icon}</span></div>"#,
                self.weight_check.sum
            )
        } else {
            format!(
                r#"<div class="weight-sum"><strong>weight sum: {:.3}</strong> <span class="sum-na">(min-max scaled)</span></div>"#,
                self.weight_check.sum
            )
        };

        rows + &check
    }

    /// The predicted next token chip with a tooltip listing every candidate.
    pub fn prediction_html(&self) -> String {
        let Some(prediction) = &self.prediction else {
            return String::new();
        };
        let items: String = candidate_views(prediction)
            .iter()
            .map(|c| {
                format!(
                    r#"<div class="candidate-item"><span class="candidate-rank">{}.</span><span class="candidate-token">"{}"</span><span class="candidate-prob">{}</span></div>"#,
                    c.rank,
                    escape_html(&c.token),
                    c.percent
                )
            })
            .collect();
        format!(
            r#"<span class="token prediction-token">{}({})<div class="tooltip"><div><strong>Top-{} candidates:</strong></div>{}</div></span>"#,
            escape_html(&prediction.token),
            format_percent(prediction.probability),
            prediction.top_candidates.len(),
            items
        )
    }
}

/// Probability as a percentage with one decimal, e.g. `42.1%`.
pub fn format_percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// A self-contained HTML document for one analysis, written by `attnscope render`.
pub fn standalone_page(text: &str, viz: &Visualization) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Attention Visualization</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        .token {{ padding: 2px 4px; margin: 1px; border-radius: 3px; display: inline-block; }}
        .info {{ margin: 20px 0; color: #666; }}
        .prediction-token {{ background-color: #87CEEB; border: 2px solid #4682B4; margin-left: 5px; position: relative; }}
        .tooltip {{ display: none; position: absolute; bottom: 125%; left: 0; width: 300px; background: #333; color: #fff; padding: 12px; border-radius: 6px; font-size: 12px; z-index: 1; }}
        .prediction-token:hover .tooltip {{ display: block; }}
        .candidate-rank {{ color: #87CEEB; font-weight: bold; display: inline-block; width: 24px; }}
        .candidate-token {{ font-weight: bold; margin: 0 8px; }}
        .candidate-prob {{ color: #ccc; }}
        .token-row {{ font-family: monospace; margin: 3px 0; padding: 5px; background: #f8f9fa; border-left: 4px solid #007bff; }}
        .token-bar {{ color: #007bff; margin-left: 10px; }}
        .weight-sum {{ margin-top: 15px; padding: 10px; background: #e9ecef; font-family: monospace; }}
        .sum-ok {{ color: #28a745; }}
        .sum-off {{ color: #dc3545; }}
    </style>
</head>
<body>
    <h1>Attention Weights</h1>
    <div class="info">Input: "{}" ({} tokens, mode: {})</div>
    <div class="visualization">{}{}</div>
    <div class="info">Hover a token to see its weight.</div>
    <div class="details">{}</div>
</body>
</html>
"#,
        escape_html(text),
        viz.tokens.len(),
        viz.mode,
        viz.token_strip_html(),
        viz.prediction_html(),
        viz.token_details_html()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candidate, TokenizerInfo};
    use pretty_assertions::assert_eq;

    fn result(weights: Vec<f32>, mode: AggregationMode) -> AnalysisResult {
        let tokens = weights
            .iter()
            .enumerate()
            .map(|(i, _)| Token::new(format!("t{i}"), i as u32 + 100))
            .collect();
        AnalysisResult {
            tokens,
            weights,
            mode,
            tokenizer_info: TokenizerInfo {
                model_name: "test".into(),
                tokenizer_type: "Fake".into(),
                vocab_size: Some(4),
                special_tokens_count: 0,
            },
            prediction: Prediction::from_candidates(vec![Candidate {
                token: "<b>".into(),
                token_id: 7,
                probability: 0.4213,
                rank: 1,
            }]),
        }
    }

    #[test]
    fn test_color_intensity_formula() {
        assert_eq!(color_intensity(0.0), 255);
        assert_eq!(color_intensity(1.0), 0);
        assert_eq!(color_intensity(0.5), 128);
        assert_eq!(color_intensity(1.7), 0);
        assert_eq!(color_intensity(-0.2), 255);
        assert_eq!(token_color(0.25), "rgb(255, 191, 191)");
    }

    #[test]
    fn test_bar_length_proportional_to_max() {
        assert_eq!(bar_length(0.5, 0.5, 15), 15);
        assert_eq!(bar_length(0.25, 0.5, 15), 8);
        assert_eq!(bar_length(0.0, 0.5, 15), 0);
        assert_eq!(bar_length(0.3, 0.0, 15), 0);
    }

    #[test]
    fn test_progress_bar_width() {
        let bar = progress_bar(4, 10);
        assert_eq!(bar.chars().count(), 10);
        assert_eq!(bar, "████░░░░░░");
        assert_eq!(progress_bar(20, 5), "█████");
    }

    #[test]
    fn test_escape_html_ampersand_first() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
        assert_eq!(escape_html("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_weight_check_tolerance() {
        assert!(check_weight_sum(&[0.2, 0.3, 0.4995], 0.001).within_tolerance);
        assert!(!check_weight_sum(&[0.2, 0.3, 0.49], 0.001).within_tolerance);
    }

    #[test]
    fn test_visualization_build() {
        let viz = Visualization::build(
            &result(vec![0.1, 0.2, 0.7], AggregationMode::LastTokenDistribution),
            &RenderConfig::default(),
        );
        assert_eq!(viz.tokens.len(), 3);
        assert_eq!(viz.tokens[2].bar_length, 15);
        assert_eq!(viz.tokens[0].bar_length, 2);
        assert!(viz.weight_check.within_tolerance);

        let strip = viz.token_strip_html();
        assert_eq!(strip.matches("class=\"token\"").count(), 3);
        assert!(strip.contains("weight: 0.700"));

        let details = viz.token_details_html();
        assert!(details.contains("(ID: 102)"));
        assert!(details.contains("sum-ok"));
    }

    #[test]
    fn test_column_sum_mode_skips_sum_flag() {
        let viz = Visualization::build(
            &result(vec![0.0, 1.0, 0.5], AggregationMode::ColumnSumNormalized),
            &RenderConfig::default(),
        );
        let details = viz.token_details_html();
        assert!(details.contains("min-max scaled"));
        assert!(!details.contains("sum-off"));
    }

    #[test]
    fn test_prediction_html_escapes_candidates() {
        let viz = Visualization::build(
            &result(vec![1.0], AggregationMode::LastTokenDistribution),
            &RenderConfig::default(),
        );
        let html = viz.prediction_html();
        assert!(html.contains("&lt;b&gt;(42.1%)"));
        assert!(html.contains("Top-1 candidates"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_candidate_views() {
        let res = result(vec![1.0], AggregationMode::LastTokenDistribution);
        let views = candidate_views(res.prediction.as_ref().unwrap());
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].rank, 1);
        assert_eq!(views[0].token_id, 7);
        assert_eq!(views[0].percent, "42.1%");
    }

    #[test]
    fn test_standalone_page_contains_sections() {
        let viz = Visualization::build(
            &result(vec![0.5, 0.5], AggregationMode::LastTokenDistribution),
            &RenderConfig::default(),
        );
        let page = standalone_page("Hello <world>", &viz);
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Hello &lt;world&gt;"));
        assert!(page.contains("2 tokens"));
    }
}
