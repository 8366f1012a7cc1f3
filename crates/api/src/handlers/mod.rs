pub mod applications;
pub mod clients;
pub mod email_logs;
pub mod houses;
pub mod reference;
pub mod responsible;
pub mod sync;
