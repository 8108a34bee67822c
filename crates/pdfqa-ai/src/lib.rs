pub mod llm_factory;
pub mod llm_provider;
pub mod openai_chat_provider;

pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use openai_chat_provider::{OpenAIChatConfig, OpenAIChatProvider};
