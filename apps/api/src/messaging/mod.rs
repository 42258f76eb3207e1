pub mod handlers;
pub mod hub;
pub mod repository;
pub mod stream;
pub mod thread;
