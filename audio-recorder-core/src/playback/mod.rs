pub mod controller;
pub mod coordinator;
