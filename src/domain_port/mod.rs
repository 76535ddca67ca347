// repo

mod friend_request_repo;
mod friendship_repo;
mod profile_directory;

pub use friend_request_repo::*;
pub use friendship_repo::*;
pub use profile_directory::*;
