pub mod bridge;
pub mod config;
pub mod instructions;
pub mod room_service;
