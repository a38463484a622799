pub mod adapters;
pub mod config;
pub mod error;
pub mod features;
pub mod session;

#[cfg(test)]
mod test_support;
