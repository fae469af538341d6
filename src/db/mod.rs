pub mod dbchat;

pub use dbchat::*;
