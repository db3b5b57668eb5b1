pub mod attend;
pub mod events;
pub mod users;
