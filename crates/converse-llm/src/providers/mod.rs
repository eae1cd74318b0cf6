pub mod claude;
pub mod mistral;

pub use claude::ClaudeAdapter;
pub use mistral::{render_instruct_prompt, MistralAdapter};
