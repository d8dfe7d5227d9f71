//! # docchat-model
//!
//! Language model access for docchat.
//!
//! ## Overview
//!
//! - [`LanguageModel`] - the trait the chat orchestrator calls
//! - [`OllamaClient`] - a local Ollama server over HTTP
//! - [`MockModel`] - scripted replies, errors, and delays for tests
//! - [`DecodingOptions`] - sampling parameters with `fast` and `detailed` profiles
//!
//! Every failure is a [`ModelError`] whose [`apology`](ModelError::apology)
//! is the text shown to the user in place of an answer.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docchat_model::{DecodingOptions, GenerateRequest, LanguageModel, OllamaClient};
//!
//! let model = OllamaClient::new("http://localhost:11434", "llama3.1:8b")?;
//! let request = GenerateRequest::new("Why is the sky blue?", DecodingOptions::fast());
//! match model.generate(request).await {
//!     Ok(generation) => println!("{}", generation.text),
//!     Err(e) => println!("{}", e.apology()),
//! }
//! ```

pub mod error;
pub mod mock;
pub mod model;
pub mod ollama;
pub mod options;

pub use error::{HTTP_APOLOGY, ModelError, Result, TIMEOUT_APOLOGY, UNEXPECTED_APOLOGY};
pub use mock::MockModel;
pub use model::{
    ConnectionReport, GenerateRequest, Generation, LanguageModel, ModelAvailability, same_model,
    test_connection,
};
pub use ollama::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL, OllamaClient};
pub use options::{DecodingOptions, DecodingProfile, SamplerTuning};
