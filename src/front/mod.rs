//! Tribbler social service built on bin storage.

mod frontend;
mod trib;

pub use frontend::{new_front, Front, FrontConfig, Server, USER_BIN};
pub use trib::{
    is_valid_username, Trib, MAX_FOLLOWING, MAX_TRIB_FETCH, MAX_TRIB_LEN,
    MAX_USERNAME_LEN, MIN_LIST_USER,
};
