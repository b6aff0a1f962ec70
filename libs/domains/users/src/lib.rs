//! User domain: the directory the notification pipeline resolves recipients
//! against.

pub mod directory;
pub mod error;
pub mod memory;
pub mod models;

pub use directory::{MockUserDirectory, UserDirectory};
pub use error::{UserError, UserResult};
pub use memory::InMemoryUserDirectory;
pub use models::User;
