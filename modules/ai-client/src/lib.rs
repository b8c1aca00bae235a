pub mod claude;
pub mod error;
pub mod openai;
pub mod retry;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::AiError;
pub use openai::OpenAi;
pub use retry::with_retries;
pub use traits::{EmbedAgent, GenerateAgent};
