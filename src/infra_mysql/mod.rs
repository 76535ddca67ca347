mod friend_request_repo_mysql;
mod friendship_repo_mysql;
mod profile_directory_mysql;

pub use friend_request_repo_mysql::*;
pub use friendship_repo_mysql::*;
pub use profile_directory_mysql::*;

mod util;
