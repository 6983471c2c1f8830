pub mod campaign;
pub mod credential;
pub mod dispatch;
pub mod ledger;
pub mod record;
pub mod redeem;
pub mod resync;
pub mod signature;
