// Library entry shared by the console binary in src/main.rs and the
// integration tests

pub mod backends;
pub mod config;
pub mod constants;
pub mod models;
pub mod player;
pub mod utils;

#[cfg(test)]
mod test_utils;
