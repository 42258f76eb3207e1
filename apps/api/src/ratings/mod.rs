pub mod handlers;
pub mod repository;
pub mod scoring;
