pub mod board;
pub mod client;
pub mod messages;
pub mod room;
pub mod server;

pub use server::{routes, Server};
