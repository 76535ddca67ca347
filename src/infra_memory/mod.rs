//! Process-local adapters behind the `"memory"` storage backend.

mod friend_request_repo_memory;
mod friendship_repo_memory;
mod profile_directory_memory;
mod store;

pub use friend_request_repo_memory::*;
pub use friendship_repo_memory::*;
pub use profile_directory_memory::*;
pub use store::MemoryStore;
