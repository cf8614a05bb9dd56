pub mod client_info;
pub mod convert;
pub mod deploy;
pub mod health;
pub mod jobs;
pub mod stats;
pub mod task;
pub mod token;
