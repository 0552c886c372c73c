//! Debate metrics: agreement, convergence, sensitivity, bias and drift.
//!
//! Two estimators are provided. [`HeuristicEstimator`] is a closed-form
//! placeholder that needs no backend. [`DelegatedEstimator`] asks a model to
//! read the full transcript and return a JSON verdict, which is parsed
//! strictly; anything unusable yields baseline metrics with `success = false`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DebateError;
use crate::generator::{Generator, SamplingParams};
use crate::transcript::TranscriptEntry;

/// Upper bound of the agreement scale.
pub const MAX_AGREEMENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricsStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceStatus {
    Converging,
    Diverging,
    Stable,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BiasLevel {
    Low,
    Neutral,
    High,
}

macro_rules! case_insensitive_enum {
    ($ty:ident { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!("invalid {} value '{}'", stringify!($ty), other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($ty::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

case_insensitive_enum!(ConvergenceStatus {
    "converging" => Converging,
    "diverging" => Diverging,
    "stable" => Stable,
    "unknown" => Unknown,
});

case_insensitive_enum!(SensitivityLevel {
    "low" => Low,
    "medium" => Medium,
    "high" => High,
});

case_insensitive_enum!(BiasLevel {
    "low" => Low,
    "neutral" => Neutral,
    "high" => High,
});

/// Snapshot of where a debate stands. Replaced wholesale at each checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateMetrics {
    #[serde(alias = "iteration")]
    pub round: u32,
    pub status: MetricsStatus,
    /// 0 (total disagreement) to 10 (complete agreement).
    pub agreement_score: f64,
    pub convergence: ConvergenceStatus,
    pub emotional_sensitivity: SensitivityLevel,
    pub bias_level: BiasLevel,
    pub topic_drift: SensitivityLevel,
}

impl DebateMetrics {
    /// Zero agreement, unknown convergence, every ordinal at its lowest.
    pub fn baseline(round: u32) -> Self {
        Self {
            round,
            status: MetricsStatus::InProgress,
            agreement_score: 0.0,
            convergence: ConvergenceStatus::Unknown,
            emotional_sensitivity: SensitivityLevel::Low,
            bias_level: BiasLevel::Low,
            topic_drift: SensitivityLevel::Low,
        }
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.agreement_score >= threshold
    }
}

/// Metrics plus whether they came from a successful analysis.
///
/// `success = false` distinguishes "baseline because analysis degraded" from a
/// real estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub metrics: DebateMetrics,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Analysis {
    pub fn ok(metrics: DebateMetrics) -> Self {
        Self {
            metrics,
            success: true,
            error: None,
        }
    }

    pub fn degraded(round: u32, error: &DebateError) -> Self {
        Self {
            metrics: DebateMetrics::baseline(round),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Produces metrics for a transcript. Never fails outright; failures surface
/// through [`Analysis::success`].
#[async_trait]
pub trait MetricsEstimator: Send + Sync {
    async fn analyze(&self, topic: &str, entries: &[TranscriptEntry], round: u32) -> Analysis;
}

/// Closed-form estimate: agreement creeps up half a point per round.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn estimate(round: u32) -> DebateMetrics {
        let agreement_score = (5.0 + 0.5 * round as f64).min(MAX_AGREEMENT);
        DebateMetrics {
            round,
            status: MetricsStatus::InProgress,
            agreement_score,
            convergence: if agreement_score > 7.0 {
                ConvergenceStatus::Converging
            } else {
                ConvergenceStatus::Diverging
            },
            emotional_sensitivity: SensitivityLevel::Medium,
            bias_level: BiasLevel::Neutral,
            topic_drift: SensitivityLevel::Low,
        }
    }
}

#[async_trait]
impl MetricsEstimator for HeuristicEstimator {
    async fn analyze(&self, _topic: &str, _entries: &[TranscriptEntry], round: u32) -> Analysis {
        Analysis::ok(Self::estimate(round))
    }
}

/// Asks a model to score the transcript.
pub struct DelegatedEstimator {
    generator: Arc<dyn Generator>,
    model: String,
    timeout: Duration,
}

impl DelegatedEstimator {
    pub fn new(generator: Arc<dyn Generator>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            generator,
            model: model.into(),
            timeout,
        }
    }

    async fn request(&self, prompt: &str) -> Result<String, DebateError> {
        let params = SamplingParams::analysis();
        let call = self.generator.generate(prompt, &self.model, &params);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DebateError::Generation(format!(
                "analysis timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl MetricsEstimator for DelegatedEstimator {
    async fn analyze(&self, topic: &str, entries: &[TranscriptEntry], round: u32) -> Analysis {
        let prompt = analysis_prompt(topic, entries);
        debug!(
            entries = entries.len(),
            chars = prompt.len(),
            model = %self.model,
            "requesting transcript analysis"
        );

        let result = self
            .request(&prompt)
            .await
            .and_then(|response| parse_analysis(&response, round));

        match result {
            Ok(metrics) => Analysis::ok(metrics),
            Err(e) => {
                warn!("Analysis fell back to baseline metrics: {}", e);
                Analysis::degraded(round, &e)
            }
        }
    }
}

fn analysis_prompt(topic: &str, entries: &[TranscriptEntry]) -> String {
    let conversation = entries
        .iter()
        .map(|entry| format!("{}: {}", entry.speaker, entry.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are analyzing a debate to generate metrics. Be objective and precise.

Topic: {topic}

Conversation:
{conversation}

Analyze the debate and provide the following metrics in JSON format:

{{
  "agreementScore": <number 0-10, where 0=total disagreement, 10=complete agreement>,
  "convergenceStatus": "<CONVERGING or DIVERGING or STABLE>",
  "emotionalSensitivity": "<LOW or MEDIUM or HIGH>",
  "biasLevel": "<LOW or NEUTRAL or HIGH>",
  "topicDrift": "<LOW or MEDIUM or HIGH>"
}}

Analysis criteria:
- agreementScore: How much do participants agree on core points? Look for shared positions.
- convergenceStatus: Are positions getting closer (CONVERGING), further apart (DIVERGING), or staying same (STABLE)?
- emotionalSensitivity: Intensity of emotional language, charged words, personal attacks.
- biasLevel: Degree of one-sided arguments, partisan language, ignoring counterpoints.
- topicDrift: How much has discussion wandered from the original topic?

Respond ONLY with the JSON object, no explanation."#
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    agreement_score: f64,
    convergence_status: String,
    emotional_sensitivity: String,
    bias_level: String,
    topic_drift: String,
}

/// Parse the first JSON object in `response` that carries all five metrics.
///
/// Each `{` is tried as the start of a JSON value; the streaming deserializer
/// stops at the end of that value, so surrounding prose, code fences and
/// nested braces inside the object are all handled. The first candidate that
/// deserializes is validated, and validation failures are not retried against
/// later candidates.
pub fn parse_analysis(response: &str, round: u32) -> Result<DebateMetrics, DebateError> {
    let raw = response
        .match_indices('{')
        .find_map(|(start, _)| {
            serde_json::Deserializer::from_str(&response[start..])
                .into_iter::<RawAnalysis>()
                .next()
                .and_then(Result::ok)
        })
        .ok_or_else(|| {
            DebateError::AnalysisParse("no JSON object with the expected fields".to_string())
        })?;

    if !raw.agreement_score.is_finite() || !(0.0..=MAX_AGREEMENT).contains(&raw.agreement_score) {
        return Err(DebateError::AnalysisParse(format!(
            "agreementScore {} outside 0-10",
            raw.agreement_score
        )));
    }

    Ok(DebateMetrics {
        round,
        status: MetricsStatus::InProgress,
        agreement_score: raw.agreement_score,
        convergence: raw
            .convergence_status
            .parse()
            .map_err(DebateError::AnalysisParse)?,
        emotional_sensitivity: raw
            .emotional_sensitivity
            .parse()
            .map_err(DebateError::AnalysisParse)?,
        bias_level: raw.bias_level.parse().map_err(DebateError::AnalysisParse)?,
        topic_drift: raw.topic_drift.parse().map_err(DebateError::AnalysisParse)?,
    })
}
