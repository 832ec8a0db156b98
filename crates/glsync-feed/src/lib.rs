pub mod client;
pub mod retry;

pub use client::GitLabClient;
pub use retry::RetryPolicy;
