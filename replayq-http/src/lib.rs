pub mod handlers;
pub mod server;

pub use server::{build_router, open_worker, serve};
