//! Shared test harness modules for the parcel CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod credentials_unit;
mod download_unit;
mod helpers;
