pub mod handler;
pub mod msg_ping_handler;
pub mod msg_room_handler;
pub mod ws_connection;

pub use handler::*;
