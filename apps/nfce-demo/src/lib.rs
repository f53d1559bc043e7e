//! # nfce-demo: Mock NFC-e Coupon Printer
//!
//! Host application around `nfce-core`: loads a station profile, issues one
//! coupon and prints it.
//!
//! ## Modules
//!
//! - [`config`] - `StationProfile` (station.toml)
//! - [`coupon`] - sale → totals → access key → Pix payload
//! - [`render`] - 48-column text and JSON output
//! - [`error`] - `AppError`

pub mod config;
pub mod coupon;
pub mod error;
pub mod render;

pub use config::StationProfile;
pub use coupon::{issue_coupon, Coupon, CouponRequest};
pub use error::{AppError, AppResult};
