//! Decoding parameters sent with every generation request.
//!
//! Two profiles cover the trade-off between latency and answer length:
//! [`DecodingOptions::fast`] caps output at 256 tokens within 30 seconds,
//! [`DecodingOptions::detailed`] allows 512 tokens within 60 seconds.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sampling options in Ollama's `options` object naming.
///
/// `timeout` is not part of the payload; it bounds the whole HTTP exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodingOptions {
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum number of tokens to generate.
    pub num_predict: u32,
    /// Context window size in tokens.
    pub num_ctx: u32,
    /// Generation halts at any of these strings.
    pub stop: Vec<String>,
    pub repeat_penalty: f32,
    /// Extra sampler settings pinned by the fast profile.
    #[serde(flatten)]
    pub tuning: Option<SamplerTuning>,
    #[serde(skip)]
    pub timeout: Duration,
}

/// Sampler knobs the fast profile sets explicitly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerTuning {
    /// `-1` picks a random seed per request.
    pub seed: i64,
    pub tfs_z: f32,
    pub num_keep: u32,
    pub typical_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// `0` disables Mirostat sampling.
    pub mirostat: u8,
    pub mirostat_tau: f32,
    pub mirostat_eta: f32,
    pub penalize_newline: bool,
    pub numa: bool,
}

impl Default for SamplerTuning {
    fn default() -> Self {
        Self {
            seed: -1,
            tfs_z: 1.0,
            num_keep: 0,
            typical_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            mirostat: 0,
            mirostat_tau: 5.0,
            mirostat_eta: 0.1,
            penalize_newline: true,
            numa: false,
        }
    }
}

impl DecodingOptions {
    /// Short answers: 256 tokens, 30 second deadline.
    pub fn fast() -> Self {
        Self {
            num_predict: 256,
            tuning: Some(SamplerTuning::default()),
            timeout: Duration::from_secs(30),
            ..Self::base()
        }
    }

    /// Longer answers: 512 tokens, 60 second deadline.
    pub fn detailed() -> Self {
        Self { num_predict: 512, timeout: Duration::from_secs(60), ..Self::base() }
    }

    fn base() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            num_predict: 256,
            num_ctx: 2048,
            stop: vec!["User:".to_string(), "Human:".to_string()],
            repeat_penalty: 1.1,
            tuning: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self::fast()
    }
}

/// Named [`DecodingOptions`] presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodingProfile {
    #[default]
    Fast,
    Detailed,
}

impl DecodingProfile {
    /// The options this profile stands for.
    pub fn options(self) -> DecodingOptions {
        match self {
            Self::Fast => DecodingOptions::fast(),
            Self::Detailed => DecodingOptions::detailed(),
        }
    }
}

impl fmt::Display for DecodingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Detailed => f.write_str("detailed"),
        }
    }
}

impl FromStr for DecodingProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!("unknown decoding profile '{other}' (expected fast or detailed)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fast_profile_serializes_flat_ollama_options() {
        let value = serde_json::to_value(DecodingOptions::fast()).unwrap();
        assert_eq!(value["num_predict"], json!(256));
        assert_eq!(value["num_ctx"], json!(2048));
        assert_eq!(value["stop"], json!(["User:", "Human:"]));
        assert_eq!(value["seed"], json!(-1));
        assert_eq!(value["mirostat"], json!(0));
        assert_eq!(value["penalize_newline"], json!(true));
        assert!(value.get("timeout").is_none());
        assert!(value.get("tuning").is_none());
    }

    #[test]
    fn detailed_profile_omits_tuning() {
        let options = DecodingOptions::detailed();
        assert_eq!(options.timeout, Duration::from_secs(60));
        let value = serde_json::to_value(options).unwrap();
        assert_eq!(value["num_predict"], json!(512));
        assert!(value.get("seed").is_none());
        assert!(value.get("mirostat_tau").is_none());
    }

    #[test]
    fn profile_parses_case_insensitively() {
        assert_eq!("Detailed".parse::<DecodingProfile>().unwrap(), DecodingProfile::Detailed);
        assert_eq!(DecodingProfile::Fast.to_string(), "fast");
        assert!("verbose".parse::<DecodingProfile>().is_err());
        assert_eq!(DecodingProfile::Detailed.options().num_predict, 512);
    }
}
