//! HTTP request handlers.

pub mod auth;
pub mod directories;
pub mod history;
pub mod notifications;
pub mod settings;
pub mod torrents;

pub use auth::*;
pub use directories::*;
pub use history::*;
pub use notifications::*;
pub use settings::*;
pub use torrents::*;
