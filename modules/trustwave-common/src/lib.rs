pub mod config;
pub mod drafts;
pub mod identity;
pub mod kinds;
pub mod parse;
pub mod types;

pub use config::Config;
pub use drafts::follow_list_draft;
pub use identity::Identity;
pub use parse::{parse_follow_set, parse_item, parse_list};
pub use types::*;
