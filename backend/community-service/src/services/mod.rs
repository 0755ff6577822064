/// Business logic for moderation, reports, recipes and notifications
pub mod llm;
pub mod moderation;
pub mod notifications;
pub mod recipes;
pub mod reports;
pub mod substitutions;

pub use moderation::ContentModerator;
pub use notifications::Notifier;
pub use recipes::RecipeService;
pub use reports::ReportService;
