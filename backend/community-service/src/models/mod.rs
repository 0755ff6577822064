//! Domain models shared by the repositories, services and handlers

pub mod moderation;
pub mod post;
pub mod recipe;
pub mod user;

pub use moderation::{ModerationResult, PlatformStats};
pub use post::{
    CommunityPost, NewComment, NewPost, PostComment, PostOrder, PostReport, PostUpdate,
    ReportSummary,
};
pub use recipe::{NewSavedRecipe, Recipe, RecipeCache, RecipeResult, SavedRecipe};
pub use user::{NewUser, PublicUser, User};
