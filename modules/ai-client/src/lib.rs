pub mod claude;
pub mod gemini;
mod http;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use gemini::Gemini;
pub use traits::TextGenerator;
pub use util::{strip_code_blocks, truncate_chars};
