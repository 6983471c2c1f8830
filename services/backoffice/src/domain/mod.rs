pub mod html;
pub mod repository;
pub mod sender;
pub mod types;
