pub mod prelude;

pub mod case_attachments;
pub mod case_config;
pub mod cases;
pub mod users;
