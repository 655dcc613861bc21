// GW2 官方 API 访问

pub mod client;
pub mod types;

pub use client::Gw2ApiClient;
