pub mod env;
pub mod hook;
pub mod key;
pub mod remote;
pub mod start;
