//! Access control: one-time codes and the upload tokens they buy.

pub mod codes;
pub mod tokens;

pub use codes::{CodeStore, Redemption};
pub use tokens::{spawn_sweeper, MemoryTokenStore, TokenStore};
