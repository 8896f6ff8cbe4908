mod game;
mod user;

pub use game::*;
pub use user::*;
