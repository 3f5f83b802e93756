pub mod api;
pub mod config;
pub mod error;
pub mod migration;
pub mod schema;

#[cfg(test)]
mod test_utils;
