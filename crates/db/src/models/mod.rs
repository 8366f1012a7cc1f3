//! Domain model structs and DTOs.
//!
//! Mirrored entities (`house`, `contact`, `sell`, `deal`) are read-only for
//! everything except the sync engine. The remaining modules back the
//! application lifecycle.

pub mod application;
pub mod application_type;
pub mod contact;
pub mod deal;
pub mod email_log;
pub mod house;
pub mod responsible_person;
pub mod sell;
