pub mod job;
pub mod messaging;
pub mod profile;
pub mod rating;
pub mod token;
