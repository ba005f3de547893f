pub mod client;
pub mod persona;
pub mod services;
pub mod worker;
