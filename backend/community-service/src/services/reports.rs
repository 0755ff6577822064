//! Post reports and automatic removal
//!
//! Each user may report a post once. Every accepted report bumps the post's
//! `reports` counter; when the counter reaches [`AUTO_REMOVAL_THRESHOLD`] the
//! post is deleted in the same request.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::{PostRepository, ReportRepository, Store, UserRepository};
use crate::error::{AppError, Result};
use crate::metrics::community::{POST_AUTO_REMOVALS_TOTAL, POST_REPORTS_TOTAL};
use crate::models::{NewUser, PostReport, User};
use crate::security::password;
use crate::services::notifications::{Notification, Notifier, UserRef};

/// Number of reports that removes a post
pub const AUTO_REMOVAL_THRESHOLD: i32 = 50;

/// Account that receives reports from unidentified reporters
pub const DEFAULT_REPORTER_ID: i32 = 1;
const DEFAULT_REPORTER_USERNAME: &str = "default_user";

/// Who is filing the report
#[derive(Debug, Clone)]
pub enum ReporterIdentity {
    /// Logged-in user from the session cookie
    Session(User),
    /// Anonymous request, optionally naming a user id in the body
    Requested(Option<i32>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub report: PostReport,
    pub reports_count: i32,
    pub auto_removed: bool,
}

pub struct ReportService {
    store: Arc<dyn Store>,
    notifier: Arc<Notifier>,
    threshold: i32,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<Notifier>) -> Self {
        Self {
            store,
            notifier,
            threshold: AUTO_REMOVAL_THRESHOLD,
        }
    }

    pub async fn report_post(
        &self,
        post_id: i32,
        reporter: ReporterIdentity,
        reason: Option<String>,
    ) -> Result<ReportOutcome> {
        let post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))?;

        let reporter = self.resolve_reporter(reporter).await?;

        if self.store.has_user_reported(post_id, reporter.id).await? {
            return Err(AppError::BadRequest(
                "لقد قمت بالإبلاغ عن هذا المنشور مسبقاً".to_string(),
            ));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let report = self
            .store
            .create_report(post_id, reporter.id, reason.as_deref())
            .await?
            // Lost a race with a concurrent report from the same user.
            .ok_or_else(|| {
                AppError::BadRequest("لقد قمت بالإبلاغ عن هذا المنشور مسبقاً".to_string())
            })?;

        let reports_count = self
            .store
            .increment_report_count(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("المنشور غير موجود".to_string()))?;

        POST_REPORTS_TOTAL.inc();
        info!(
            post_id,
            reporter_id = reporter.id,
            reports_count,
            "Post reported"
        );

        let author = match self.store.find_user_by_id(post.user_id).await {
            Ok(user) => user.as_ref().map(UserRef::from),
            Err(e) => {
                warn!(post_id, error = %e, "Could not load post author for notification");
                None
            }
        };

        // Snapshot the post with the new counter before it can be deleted.
        let mut snapshot = post;
        snapshot.reports = reports_count;

        self.notifier.dispatch(Notification::PostReported {
            post: snapshot.clone(),
            report: report.clone(),
            reporter: Some(UserRef::from(&reporter)),
            author: author.clone(),
            reports_count,
        });

        let mut auto_removed = false;
        if reports_count >= self.threshold {
            auto_removed = self.store.delete_post(post_id).await?;
            if auto_removed {
                POST_AUTO_REMOVALS_TOTAL.inc();
                warn!(
                    post_id,
                    reports_count,
                    threshold = self.threshold,
                    "Post removed after reaching report threshold"
                );
                self.notifier.dispatch(Notification::PostAutoRemoved {
                    post: snapshot,
                    author,
                    reports_count,
                });
            }
        }

        Ok(ReportOutcome {
            report,
            reports_count,
            auto_removed,
        })
    }

    async fn resolve_reporter(&self, identity: ReporterIdentity) -> Result<User> {
        match identity {
            ReporterIdentity::Session(user) => Ok(user),
            ReporterIdentity::Requested(Some(user_id)) => {
                match self.store.find_user_by_id(user_id).await? {
                    Some(user) => Ok(user),
                    None => self.default_reporter().await,
                }
            }
            ReporterIdentity::Requested(None) => self.default_reporter().await,
        }
    }

    async fn default_reporter(&self) -> Result<User> {
        if let Some(user) = self.store.find_user_by_id(DEFAULT_REPORTER_ID).await? {
            return Ok(user);
        }

        // Nobody can log in as this account: the password is random and discarded.
        let password_hash = password::hash_password(&password::random_secret())?;
        let user = self
            .store
            .ensure_user_with_id(
                DEFAULT_REPORTER_ID,
                NewUser {
                    username: DEFAULT_REPORTER_USERNAME.to_string(),
                    password_hash,
                    email: None,
                    is_admin: false,
                    is_guest: true,
                },
            )
            .await?;
        info!(user_id = user.id, "Created default reporter account");
        Ok(user)
    }
}
