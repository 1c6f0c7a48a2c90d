pub mod errors;
pub mod http;
pub mod utils;

pub use errors::SuggestError;
pub use utils::StripHtml;
