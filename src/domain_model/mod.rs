mod friend;
mod user;

pub use friend::*;
pub use user::*;
