// Authentication module
// Holds the OAuth credentials and the single cached session token

mod manager;
mod refresh;
mod types;

pub use manager::TokenManager;
pub use types::{Credentials, SessionToken};
