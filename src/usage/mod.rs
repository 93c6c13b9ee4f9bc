//! Token usage aggregation.
//!
//! Providers report flat prompt/completion totals with optional nested
//! detail breakdowns. [`AggregatedUsage`] regroups those into categorized
//! counters (text, reasoning, audio), deriving plain-text counts by
//! subtracting the detailed categories from the flat totals.

use serde::{Deserialize, Serialize};

/// Vendor usage snapshot as reported on a response or a stream's final
/// delta: flat totals plus optional detail breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<PromptTokensDetails>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTokensDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_tokens: Option<u64>,
}

/// Categorized usage counters. A category is present only when at least one
/// of its fields is nonzero, so serialized output carries no empty objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextUsage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningUsage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<u64>,
}

fn nonzero(value: u64) -> Option<u64> {
    (value > 0).then_some(value)
}

impl AggregatedUsage {
    /// Fold a vendor snapshot into categorized counters.
    ///
    /// Plain-text counts are what remains of the flat totals after the
    /// cached, reasoning, and audio breakdowns are subtracted out.
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Self {
        let cached = snapshot
            .prompt_tokens_details
            .as_ref()
            .and_then(|d| d.cached_tokens)
            .unwrap_or(0);
        let audio_input = snapshot
            .prompt_tokens_details
            .as_ref()
            .and_then(|d| d.audio_tokens)
            .unwrap_or(0);
        let reasoning = snapshot
            .completion_tokens_details
            .as_ref()
            .and_then(|d| d.reasoning_tokens)
            .unwrap_or(0);
        let audio_output = snapshot
            .completion_tokens_details
            .as_ref()
            .and_then(|d| d.audio_tokens)
            .unwrap_or(0);

        let text_input = snapshot.prompt_tokens.saturating_sub(cached + audio_input);
        let text_output = snapshot
            .completion_tokens
            .saturating_sub(reasoning + audio_output);

        let text = TextUsage {
            input: nonzero(text_input),
            output: nonzero(text_output),
            cached: nonzero(cached),
        };
        let text = (text != TextUsage::default()).then_some(text);

        let reasoning = nonzero(reasoning).map(|output| ReasoningUsage {
            output: Some(output),
        });

        let audio = AudioUsage {
            input: nonzero(audio_input),
            output: nonzero(audio_output),
        };
        let audio = (audio != AudioUsage::default()).then_some(audio);

        Self {
            text,
            reasoning,
            audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flat_totals_only() {
        let usage = AggregatedUsage::from_snapshot(&UsageSnapshot {
            prompt_tokens: 100,
            completion_tokens: 50,
            ..Default::default()
        });

        assert_eq!(
            usage,
            AggregatedUsage {
                text: Some(TextUsage {
                    input: Some(100),
                    output: Some(50),
                    cached: None,
                }),
                reasoning: None,
                audio: None,
            }
        );
    }

    #[test]
    fn test_cached_and_reasoning_subtracted() {
        let usage = AggregatedUsage::from_snapshot(&UsageSnapshot {
            prompt_tokens: 100,
            completion_tokens: 50,
            prompt_tokens_details: Some(PromptTokensDetails {
                cached_tokens: Some(20),
                audio_tokens: None,
            }),
            completion_tokens_details: Some(CompletionTokensDetails {
                reasoning_tokens: Some(10),
                audio_tokens: None,
            }),
        });

        assert_eq!(
            usage,
            AggregatedUsage {
                text: Some(TextUsage {
                    input: Some(80),
                    output: Some(40),
                    cached: Some(20),
                }),
                reasoning: Some(ReasoningUsage { output: Some(10) }),
                audio: None,
            }
        );
    }

    #[test]
    fn test_audio_tokens_split_out() {
        let usage = AggregatedUsage::from_snapshot(&UsageSnapshot {
            prompt_tokens: 30,
            completion_tokens: 25,
            prompt_tokens_details: Some(PromptTokensDetails {
                cached_tokens: None,
                audio_tokens: Some(30),
            }),
            completion_tokens_details: Some(CompletionTokensDetails {
                reasoning_tokens: None,
                audio_tokens: Some(5),
            }),
        });

        // All prompt tokens were audio, so there is no text.input at all.
        assert_eq!(
            usage,
            AggregatedUsage {
                text: Some(TextUsage {
                    input: None,
                    output: Some(20),
                    cached: None,
                }),
                reasoning: None,
                audio: Some(AudioUsage {
                    input: Some(30),
                    output: Some(5),
                }),
            }
        );
    }

    #[test]
    fn test_empty_snapshot_yields_no_categories() {
        let usage = AggregatedUsage::from_snapshot(&UsageSnapshot::default());
        assert_eq!(usage, AggregatedUsage::default());
    }

    #[test]
    fn test_details_exceeding_totals_saturate() {
        // Some providers report cached tokens that already include the
        // prompt total; the subtraction must not underflow.
        let usage = AggregatedUsage::from_snapshot(&UsageSnapshot {
            prompt_tokens: 10,
            completion_tokens: 0,
            prompt_tokens_details: Some(PromptTokensDetails {
                cached_tokens: Some(15),
                audio_tokens: None,
            }),
            completion_tokens_details: None,
        });

        assert_eq!(
            usage.text,
            Some(TextUsage {
                input: None,
                output: None,
                cached: Some(15),
            })
        );
    }

    #[test]
    fn test_serialized_output_omits_empty_categories() {
        let usage = AggregatedUsage::from_snapshot(&UsageSnapshot {
            prompt_tokens: 100,
            completion_tokens: 50,
            ..Default::default()
        });

        let json = serde_json::to_string(&usage).unwrap();
        assert!(json.contains("\"text\""));
        assert!(!json.contains("\"reasoning\""));
        assert!(!json.contains("\"audio\""));
    }

    #[test]
    fn test_snapshot_deserializes_from_wire_shape() {
        let snapshot: UsageSnapshot = serde_json::from_str(
            r#"{
                "prompt_tokens": 100,
                "completion_tokens": 50,
                "prompt_tokens_details": {"cached_tokens": 20},
                "completion_tokens_details": {"reasoning_tokens": 10}
            }"#,
        )
        .unwrap();

        assert_eq!(
            snapshot.prompt_tokens_details,
            Some(PromptTokensDetails {
                cached_tokens: Some(20),
                audio_tokens: None,
            })
        );
        assert_eq!(snapshot.completion_tokens, 50);
    }
}
