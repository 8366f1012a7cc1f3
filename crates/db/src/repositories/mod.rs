//! Repository layer.
//!
//! Zero-sized structs grouping async query functions per table. Every
//! function takes the pool (or an open transaction) explicitly.

pub mod application_repo;
pub mod application_type_repo;
pub mod contact_repo;
pub mod deal_repo;
pub mod email_log_repo;
pub mod house_repo;
pub mod mirror_repo;
pub mod responsible_person_repo;

pub use application_repo::ApplicationRepo;
pub use application_type_repo::ApplicationTypeRepo;
pub use contact_repo::ContactRepo;
pub use deal_repo::DealRepo;
pub use email_log_repo::EmailLogRepo;
pub use house_repo::HouseRepo;
pub use mirror_repo::{MirrorError, MirrorRepo};
pub use responsible_person_repo::ResponsiblePersonRepo;
