pub mod case_service;
pub mod config_service;
pub mod storage;
pub mod user_service;
