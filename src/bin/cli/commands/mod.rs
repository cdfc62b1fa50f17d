pub mod init;
pub mod stats;
pub mod study;
