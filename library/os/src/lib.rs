//! os is the workspace's thin layer over the operating system. Today that is
//! asynchronous subprocess execution, which is how the promoter reaches the AWS CLI.

pub mod process;

#[doc(hidden)]
pub use tokio;
