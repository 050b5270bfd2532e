pub mod ai;
pub mod context;
pub mod escalation;
pub mod session;
pub mod storage;

pub use ai::GeminiClient;
pub use session::ChatService;
pub use storage::S3Storage;
