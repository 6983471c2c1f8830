pub mod db;
pub mod lease;
pub mod mail;
pub mod payment;
pub mod ticket;
