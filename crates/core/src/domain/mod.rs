pub mod conversation;
pub mod embedding;
pub mod history;
pub mod record;
pub mod results;
