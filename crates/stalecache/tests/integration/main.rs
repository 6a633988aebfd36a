// See <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

pub mod get_set;
pub mod registry;
pub mod timeout;
pub mod utils;

pub use utils::*;
