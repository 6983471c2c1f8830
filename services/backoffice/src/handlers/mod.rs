pub mod campaigns;
pub mod checkin;
pub mod credentials;
pub mod health;
pub mod records;
