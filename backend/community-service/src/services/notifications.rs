//! Discord webhook notifications
//!
//! Best-effort delivery of moderation events (new report, automatic removal)
//! and login events. Failures are logged and counted, never returned to the
//! request that triggered them.

use chrono::{DateTime, Utc};
use reqwest::Client as HttpClient;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::NotificationConfig;
use crate::metrics::community::NOTIFICATIONS_TOTAL;
use crate::models::{CommunityPost, PostReport, User};

const REPORT_COLOR: u32 = 0xFF0000;
const REMOVAL_COLOR: u32 = 0x000000;
const LOGIN_COLOR: u32 = 0x2ECC71;
const FOOTER_TEXT: &str = "نظام إدارة المحتوى - كويك ريسيبي";
const UNKNOWN_USER: &str = "مستخدم غير معروف";
const MAX_FIELD_CHARS: usize = 300;

/// Minimal user reference carried in notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i32,
    pub username: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Notification {
    PostReported {
        post: CommunityPost,
        report: PostReport,
        reporter: Option<UserRef>,
        author: Option<UserRef>,
        reports_count: i32,
    },
    PostAutoRemoved {
        post: CommunityPost,
        author: Option<UserRef>,
        reports_count: i32,
    },
    Login {
        user: UserRef,
        is_admin: bool,
        is_guest: bool,
    },
}

impl Notification {
    fn kind(&self) -> &'static str {
        match self {
            Notification::PostReported { .. } => "post_reported",
            Notification::PostAutoRemoved { .. } => "post_auto_removed",
            Notification::Login { .. } => "login",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub timestamp: String,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

fn field(name: &str, value: String, inline: bool) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value,
        inline,
    }
}

/// Limit post content to 300 characters (297 plus an ellipsis).
pub fn truncate_content(content: &str) -> String {
    if content.trim().is_empty() {
        return "بدون محتوى".to_string();
    }
    if content.chars().count() > MAX_FIELD_CHARS {
        let head: String = content.chars().take(MAX_FIELD_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

fn describe_user(user: Option<&UserRef>, fallback_id: Option<i32>) -> String {
    let username = user.map(|u| u.username.as_str()).unwrap_or(UNKNOWN_USER);
    let id = user
        .map(|u| u.id)
        .or(fallback_id)
        .map(|id| id.to_string())
        .unwrap_or_else(|| "غير متوفر".to_string());
    format!("**الاسم**: {}\n**المعرف**: {}", username, id)
}

fn post_title(post: &CommunityPost) -> &str {
    if post.title.trim().is_empty() {
        "بدون عنوان"
    } else {
        &post.title
    }
}

fn display_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Render a notification as a Discord webhook payload.
pub fn build_payload(notification: &Notification, app_url: &str, now: DateTime<Utc>) -> WebhookPayload {
    let timestamp = now.to_rfc3339();
    let footer = || EmbedFooter {
        text: FOOTER_TEXT.to_string(),
    };

    match notification {
        Notification::PostReported {
            post,
            report,
            reporter,
            author,
            reports_count,
        } => WebhookPayload {
            content: "⚠️ **تم الإبلاغ عن منشور جديد** ⚠️".to_string(),
            embeds: vec![Embed {
                title: format!("الإبلاغ عن منشور: {}", post_title(post)),
                color: REPORT_COLOR,
                timestamp,
                fields: vec![
                    field(
                        "📝 البلاغ",
                        report
                            .reason
                            .clone()
                            .filter(|r| !r.trim().is_empty())
                            .unwrap_or_else(|| "لم يتم تحديد سبب".to_string()),
                        false,
                    ),
                    field("🧾 محتوى المنشور", truncate_content(&post.content), false),
                    field(
                        "👤 معلومات المبلغ",
                        describe_user(reporter.as_ref(), Some(report.user_id)),
                        true,
                    ),
                    field(
                        "👤 منشئ المحتوى",
                        describe_user(author.as_ref(), Some(post.user_id)),
                        true,
                    ),
                    field(
                        "📊 الإحصائيات",
                        format!(
                            "**عدد البلاغات**: {}\n**تاريخ الإبلاغ**: {}",
                            reports_count,
                            display_time(report.created_at)
                        ),
                        false,
                    ),
                    field(
                        "🔗 روابط",
                        format!(
                            "[عرض المنشور]({}/community-posts/{})",
                            app_url.trim_end_matches('/'),
                            post.id
                        ),
                        false,
                    ),
                ],
                footer: footer(),
            }],
        },
        Notification::PostAutoRemoved {
            post,
            author,
            reports_count,
        } => WebhookPayload {
            content: "🚫 **تم حذف منشور تلقائيًا بسبب كثرة البلاغات** 🚫".to_string(),
            embeds: vec![Embed {
                title: format!("منشور محذوف: {}", post_title(post)),
                color: REMOVAL_COLOR,
                timestamp,
                fields: vec![
                    field("🧾 محتوى المنشور", truncate_content(&post.content), false),
                    field(
                        "👤 منشئ المحتوى",
                        describe_user(author.as_ref(), Some(post.user_id)),
                        true,
                    ),
                    field(
                        "📊 الإحصائيات",
                        format!(
                            "**عدد البلاغات**: {}\n**تاريخ الحذف**: {}",
                            reports_count,
                            display_time(now)
                        ),
                        true,
                    ),
                ],
                footer: footer(),
            }],
        },
        Notification::Login {
            user,
            is_admin,
            is_guest,
        } => {
            let role = if *is_admin {
                "مشرف"
            } else if *is_guest {
                "زائر"
            } else {
                "مستخدم"
            };
            WebhookPayload {
                content: "🔐 **تسجيل دخول جديد**".to_string(),
                embeds: vec![Embed {
                    title: format!("تسجيل دخول: {}", user.username),
                    color: LOGIN_COLOR,
                    timestamp,
                    fields: vec![
                        field("👤 المستخدم", describe_user(Some(user), None), true),
                        field("🏷️ النوع", role.to_string(), true),
                        field("🕒 الوقت", display_time(now), false),
                    ],
                    footer: footer(),
                }],
            }
        }
    }
}

/// Sends notifications to the configured Discord webhooks
#[derive(Clone)]
pub struct Notifier {
    client: HttpClient,
    report_webhook: Option<String>,
    login_webhook: Option<String>,
    app_url: String,
}

impl Notifier {
    pub fn new(client: HttpClient, config: &NotificationConfig, app_url: &str) -> Self {
        Self {
            client,
            report_webhook: config.report_webhook_url.clone(),
            login_webhook: config.login_webhook_url.clone(),
            app_url: app_url.to_string(),
        }
    }

    /// Notifier with no webhooks; every send is skipped.
    pub fn disabled() -> Self {
        Self {
            client: HttpClient::new(),
            report_webhook: None,
            login_webhook: None,
            app_url: String::new(),
        }
    }

    fn webhook_for(&self, notification: &Notification) -> Option<&str> {
        match notification {
            Notification::Login { .. } => self.login_webhook.as_deref(),
            _ => self.report_webhook.as_deref(),
        }
    }

    /// Deliver a notification; returns whether Discord accepted it.
    pub async fn send(&self, notification: &Notification) -> bool {
        let kind = notification.kind();
        let Some(url) = self.webhook_for(notification) else {
            warn!(kind, "Discord webhook URL is not configured, skipping notification");
            NOTIFICATIONS_TOTAL.with_label_values(&[kind, "skipped"]).inc();
            return false;
        };

        let payload = build_payload(notification, &self.app_url, Utc::now());
        let delivered = match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(kind, "Discord notification delivered");
                true
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                error!(kind, status, body = %body, "Discord webhook rejected notification");
                false
            }
            Err(e) => {
                error!(kind, error = %e, "Error sending Discord notification");
                false
            }
        };

        NOTIFICATIONS_TOTAL
            .with_label_values(&[kind, if delivered { "sent" } else { "failed" }])
            .inc();
        delivered
    }

    /// Fire-and-forget delivery on the runtime.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.send(&notification).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(content: &str) -> CommunityPost {
        let now = Utc::now();
        CommunityPost {
            id: 42,
            user_id: 3,
            title: "فول مدمس".to_string(),
            content: content.to_string(),
            image_url: None,
            likes: 0,
            comments: 0,
            shares: 0,
            reports: 50,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_truncate_content() {
        assert_eq!(truncate_content("short"), "short");

        let long = "ب".repeat(400);
        let truncated = truncate_content(&long);
        assert_eq!(truncated.chars().count(), 300);
        assert!(truncated.ends_with("..."));

        let exact = "a".repeat(300);
        assert_eq!(truncate_content(&exact), exact);
    }

    #[test]
    fn test_report_payload() {
        let report = PostReport {
            id: 1,
            post_id: 42,
            user_id: 9,
            reason: Some("spam".to_string()),
            created_at: Utc::now(),
        };
        let payload = build_payload(
            &Notification::PostReported {
                post: post("content"),
                report,
                reporter: Some(UserRef {
                    id: 9,
                    username: "reporter".into(),
                }),
                author: None,
                reports_count: 3,
            },
            "https://quickrecipe.app/",
            Utc::now(),
        );

        let embed = &payload.embeds[0];
        assert_eq!(embed.color, 0xFF0000);
        assert_eq!(embed.fields[0].value, "spam");
        assert!(embed.fields[2].value.contains("reporter"));
        assert!(embed.fields[3].value.contains(UNKNOWN_USER));
        assert!(embed.fields[4].value.contains("3"));
        assert!(embed.fields[5]
            .value
            .contains("https://quickrecipe.app/community-posts/42"));
    }

    #[test]
    fn test_removal_payload_is_black() {
        let payload = build_payload(
            &Notification::PostAutoRemoved {
                post: post(&"x".repeat(500)),
                author: None,
                reports_count: 50,
            },
            "",
            Utc::now(),
        );
        let embed = &payload.embeds[0];
        assert_eq!(embed.color, 0x000000);
        assert!(embed.fields[0].value.ends_with("..."));
        assert!(embed.fields[2].value.contains("50"));
    }

    #[tokio::test]
    async fn test_missing_webhook_returns_false() {
        let notifier = Notifier::disabled();
        let sent = notifier
            .send(&Notification::Login {
                user: UserRef {
                    id: 1,
                    username: "mona".into(),
                },
                is_admin: false,
                is_guest: false,
            })
            .await;
        assert!(!sent);
    }
}
