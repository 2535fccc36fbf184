pub use super::case_attachments::Entity as CaseAttachments;
pub use super::case_config::Entity as CaseConfig;
pub use super::cases::Entity as Cases;
pub use super::users::Entity as Users;
