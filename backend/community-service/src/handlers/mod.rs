/// HTTP request handlers (REST API)
pub mod admin;
pub mod auth;
pub mod comments;
pub mod health;
pub mod posts;
pub mod recipes;
pub mod reports;

use actix_web::web;
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Room for a base64 `data:` image at the moderation size cap
const MAX_JSON_PAYLOAD_BYTES: usize = 8 * 1024 * 1024;

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Register every API route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health))
        .route("/ready", web::get().to(health::ready))
        .service(
            web::scope("/api")
                .app_data(web::JsonConfig::default().limit(MAX_JSON_PAYLOAD_BYTES))
                // Auth
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/admin/login", web::post().to(auth::admin_login))
                .route("/guest/login", web::post().to(auth::guest_login))
                .route("/logout", web::post().to(auth::logout))
                .route("/user", web::get().to(auth::current_user))
                // Recipes
                .route("/recipes", web::post().to(recipes::generate_recipes))
                .route(
                    "/substitutions/{ingredient}",
                    web::get().to(recipes::get_substitutions),
                )
                .route("/saved-recipes", web::get().to(recipes::list_saved_recipes))
                .route("/saved-recipes", web::post().to(recipes::save_recipe))
                .route(
                    "/saved-recipes/{id}",
                    web::delete().to(recipes::delete_saved_recipe),
                )
                // Community feed; fixed paths before `{id}`
                .route("/community-posts", web::get().to(posts::list_posts))
                .route("/community-posts", web::post().to(posts::create_post))
                .route(
                    "/community-posts/trending",
                    web::get().to(posts::trending_posts),
                )
                .route("/community-posts/recent", web::get().to(posts::recent_posts))
                .route("/community-posts/{id}", web::get().to(posts::get_post))
                .route("/community-posts/{id}", web::put().to(posts::update_post))
                .route("/community-posts/{id}", web::delete().to(posts::delete_post))
                .route("/community-posts/{id}/like", web::post().to(posts::toggle_like))
                .route("/community-posts/{id}/share", web::post().to(posts::share_post))
                .route("/community-posts/{id}/save", web::post().to(posts::save_post))
                .route(
                    "/community-posts/{id}/save",
                    web::delete().to(posts::unsave_post),
                )
                .route(
                    "/community-posts/{id}/comments",
                    web::get().to(comments::list_comments),
                )
                .route(
                    "/community-posts/{id}/comments",
                    web::post().to(comments::create_comment),
                )
                .route(
                    "/community-posts/{id}/report",
                    web::post().to(reports::report_post),
                )
                .route("/comments/{id}", web::delete().to(comments::delete_comment))
                .route("/saved-posts", web::get().to(posts::list_saved_posts))
                // Admin
                .route("/admin/reports", web::get().to(admin::list_reports))
                .route(
                    "/admin/community-posts/{id}",
                    web::delete().to(admin::delete_post),
                )
                .route("/admin/users", web::get().to(admin::list_users))
                .route("/admin/stats", web::get().to(admin::stats)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let default = Pagination::default();
        assert_eq!(default.limit(), 20);
        assert_eq!(default.offset(), 0);

        let wild = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(wild.limit(), 100);
        assert_eq!(wild.offset(), 0);
    }
}
