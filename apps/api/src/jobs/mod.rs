// Job listings: search and ranking, placeholder images, posting, photos,
// completion, expiry and the posting assistant.

pub mod assistant;
pub mod categories;
pub mod expiry;
pub mod handlers;
pub mod images;
pub mod listing;
pub mod placeholder;
pub mod posting;
pub mod prompts;
pub mod proximity;
pub mod repository;
