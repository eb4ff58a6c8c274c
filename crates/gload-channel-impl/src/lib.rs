//! Built-in channel types for gload.
//!
//! Gemini is the reference implementation; OpenAI and Anthropic follow the
//! same shape. [`build_registry`] wires all of them up for
//! [`gload_channel_core::ChannelFactory`].

pub mod auth_extractor;
pub mod envelope;
pub mod providers;
pub mod registry;

pub use envelope::parse_upstream_error;
pub use providers::{AnthropicChannel, GeminiChannel, OpenAIChannel};
pub use registry::{build_registry, builtin_constructors, register_builtin_channels};
