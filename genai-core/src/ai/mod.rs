pub mod chatter;
pub mod evaluator;
pub mod session;


pub use chatter::{ChatService, Chatter, CHAT_SYSTEM_PROMPT};
pub use evaluator::{Evaluation, Evaluator, EvaluatorAgent};
pub use session::{ChatSession, SENTINELS};
