//! Shared test harness modules for the Wayline CLI.

use super::*;

mod helpers;
mod steps;
