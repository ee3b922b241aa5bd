pub mod config;
pub mod content;
pub mod error;
pub mod git;
pub mod index;
pub mod logger;
pub mod post;
pub mod server;
pub mod text_utils;

#[cfg(test)]
mod test_data;
