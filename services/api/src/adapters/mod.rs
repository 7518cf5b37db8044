pub mod db;
pub mod illustration;
pub mod memory;
pub mod story_llm;
pub mod tts;

pub use db::DbAdapter;
pub use illustration::OpenAiIllustrationAdapter;
pub use memory::MemoryStore;
pub use story_llm::OpenAiStoryAdapter;
pub use tts::OpenAiTtsAdapter;
