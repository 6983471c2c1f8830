pub mod campaigns;
pub mod purchase_records;
pub mod redemption_logs;
