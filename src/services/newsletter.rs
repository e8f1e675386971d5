//! Newsletter service
//!
//! Implements subscriber signup and newsletter notices:
//! - Public signup with normalized, de-duplicated addresses
//! - Notice CRUD; saving a notice with `send_notice` set mails every
//!   subscriber, one message at a time
//! - Email rendering shared by the send flow and the admin preview
//!
//! A send that fails part way leaves the notice unsent. Messages that were
//! already delivered are not recalled.

use crate::config::NewsletterConfig;
use crate::db::repositories::{EpisodeRepository, NoticeRepository, SubscriberRepository};
use crate::models::{
    ListParams, Media, NewsletterNotice, NewsletterSubscriber, NoticeAppearance, NoticeEmail,
    NoticeInput, PagedResult, SubscriberInput, DEFAULT_ARCHIVE_PATH,
};
use crate::services::email::{create_mailer, Mailer, OutgoingEmail};
use crate::services::globals::{resolve_url, to_absolute_url};
use crate::services::markdown::escape_html;
use crate::services::media::MediaService;
use crate::services::revalidation::MutationContext;
use crate::services::validation::{is_valid_email, normalize_email};
use anyhow::Context;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

pub const MISSING_CONTENT: &str = "Subject and message are required to send a newsletter notice.";
pub const INVALID_EMAIL: &str = "Please enter a valid email address.";

const PREVIEW_MESSAGE: &str = "Your newsletter message preview will appear here.";
const PREVIEW_SUBJECT: &str = "Newsletter notice subject";

#[derive(Debug, thiserror::Error)]
pub enum NewsletterServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Email already subscribed: {0}")]
    DuplicateEmail(String),

    #[error("{0}")]
    ValidationError(String),

    /// The configured provider cannot send (missing credentials)
    #[error("{0}")]
    MailerUnavailable(String),

    /// A provider rejected a message
    #[error("{0}")]
    DeliveryFailed(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a public signup
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOutcome {
    Created(NewsletterSubscriber),
    AlreadySubscribed,
    InvalidEmail,
}

pub struct NewsletterService {
    subscribers: Arc<dyn SubscriberRepository>,
    notices: Arc<dyn NoticeRepository>,
    episodes: Arc<dyn EpisodeRepository>,
    media: Arc<MediaService>,
    config: NewsletterConfig,
    server_url: String,
    mailer: Option<Arc<dyn Mailer>>,
}

impl NewsletterService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        notices: Arc<dyn NoticeRepository>,
        episodes: Arc<dyn EpisodeRepository>,
        media: Arc<MediaService>,
        config: NewsletterConfig,
        server_url: &str,
    ) -> Self {
        Self {
            subscribers,
            notices,
            episodes,
            media,
            config,
            server_url: server_url.trim_end_matches('/').to_string(),
            mailer: None,
        }
    }

    /// Use `mailer` instead of the configured provider
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    // ---- subscribers ----

    /// Public signup
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, NewsletterServiceError> {
        let email = normalize_email(email);
        if email.is_empty() || !is_valid_email(&email) {
            return Ok(SubscribeOutcome::InvalidEmail);
        }

        if self
            .subscribers
            .get_by_email(&email)
            .await
            .context("Failed to look up subscriber")?
            .is_some()
        {
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let subscriber = self
            .subscribers
            .create(&email)
            .await
            .context("Failed to create subscriber")?;
        tracing::info!("New newsletter subscriber {}", subscriber.id);
        Ok(SubscribeOutcome::Created(subscriber))
    }

    /// Admin create; duplicates are an error rather than a no-op
    pub async fn create_subscriber(
        &self,
        input: SubscriberInput,
    ) -> Result<NewsletterSubscriber, NewsletterServiceError> {
        match self.subscribe(&input.email).await? {
            SubscribeOutcome::Created(subscriber) => Ok(subscriber),
            SubscribeOutcome::AlreadySubscribed => Err(NewsletterServiceError::DuplicateEmail(
                normalize_email(&input.email),
            )),
            SubscribeOutcome::InvalidEmail => Err(NewsletterServiceError::ValidationError(
                INVALID_EMAIL.to_string(),
            )),
        }
    }

    pub async fn get_subscriber(&self, id: i64) -> Result<NewsletterSubscriber, NewsletterServiceError> {
        self.subscribers
            .get_by_id(id)
            .await
            .context("Failed to get subscriber")?
            .ok_or_else(|| NewsletterServiceError::NotFound(format!("Subscriber {}", id)))
    }

    pub async fn list_subscribers(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<NewsletterSubscriber>, NewsletterServiceError> {
        Ok(self
            .subscribers
            .list(params)
            .await
            .context("Failed to list subscribers")?)
    }

    pub async fn update_subscriber(
        &self,
        id: i64,
        input: SubscriberInput,
    ) -> Result<NewsletterSubscriber, NewsletterServiceError> {
        let mut subscriber = self.get_subscriber(id).await?;
        let email = normalize_email(&input.email);
        if !is_valid_email(&email) {
            return Err(NewsletterServiceError::ValidationError(
                INVALID_EMAIL.to_string(),
            ));
        }
        if let Some(other) = self
            .subscribers
            .get_by_email(&email)
            .await
            .context("Failed to look up subscriber")?
        {
            if other.id != id {
                return Err(NewsletterServiceError::DuplicateEmail(email));
            }
        }
        subscriber.email = email;
        Ok(self
            .subscribers
            .update(&subscriber)
            .await
            .context("Failed to update subscriber")?)
    }

    pub async fn delete_subscriber(&self, id: i64) -> Result<(), NewsletterServiceError> {
        self.get_subscriber(id).await?;
        self.subscribers
            .delete(id)
            .await
            .context("Failed to delete subscriber")?;
        Ok(())
    }

    // ---- notices ----

    pub async fn create_notice(
        &self,
        input: NoticeInput,
        ctx: MutationContext,
    ) -> Result<NewsletterNotice, NewsletterServiceError> {
        let now = Utc::now();
        let send = input.send_notice;
        let mut notice = NewsletterNotice {
            id: 0,
            subject: required(input.subject, "Subject")?,
            message: required(input.message, "Message")?,
            episode_id: input.episode_id.flatten(),
            archive_path: archive_path_or_default(input.archive_path),
            image_id: input.image_id.flatten(),
            send_notice: send,
            recipient_count: 0,
            sent_at: None,
            appearance: input.appearance.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        if send && !ctx.skip_newsletter_send {
            self.send_notice(&mut notice).await?;
        }

        Ok(self
            .notices
            .create(&notice)
            .await
            .context("Failed to create newsletter notice")?)
    }

    pub async fn get_notice(&self, id: i64) -> Result<NewsletterNotice, NewsletterServiceError> {
        self.notices
            .get_by_id(id)
            .await
            .context("Failed to get newsletter notice")?
            .ok_or_else(|| NewsletterServiceError::NotFound(format!("Newsletter notice {}", id)))
    }

    pub async fn list_notices(
        &self,
        params: &ListParams,
    ) -> Result<PagedResult<NewsletterNotice>, NewsletterServiceError> {
        Ok(self
            .notices
            .list(params)
            .await
            .context("Failed to list newsletter notices")?)
    }

    /// Update a notice; absent fields keep their stored values
    pub async fn update_notice(
        &self,
        id: i64,
        input: NoticeInput,
        ctx: MutationContext,
    ) -> Result<NewsletterNotice, NewsletterServiceError> {
        let mut notice = self.get_notice(id).await?;

        if let Some(subject) = input.subject.filter(|s| !s.trim().is_empty()) {
            notice.subject = subject.trim().to_string();
        }
        if let Some(message) = input.message.filter(|m| !m.trim().is_empty()) {
            notice.message = message;
        }
        if let Some(episode_id) = input.episode_id {
            notice.episode_id = episode_id;
        }
        if let Some(path) = input.archive_path.filter(|p| !p.trim().is_empty()) {
            notice.archive_path = path.trim().to_string();
        }
        if let Some(image_id) = input.image_id {
            notice.image_id = image_id;
        }
        if let Some(appearance) = input.appearance {
            notice.appearance = appearance;
        }
        notice.send_notice = input.send_notice;

        if input.send_notice && !ctx.skip_newsletter_send {
            self.send_notice(&mut notice).await?;
        }

        Ok(self
            .notices
            .update(&notice)
            .await
            .context("Failed to update newsletter notice")?)
    }

    pub async fn delete_notice(&self, id: i64) -> Result<(), NewsletterServiceError> {
        self.get_notice(id).await?;
        self.notices
            .delete(id)
            .await
            .context("Failed to delete newsletter notice")?;
        Ok(())
    }

    /// Render a draft without sending it; blank fields show placeholders
    pub async fn preview(&self, input: NoticeInput) -> Result<NoticeEmail, NewsletterServiceError> {
        let subject = input
            .subject
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| PREVIEW_SUBJECT.to_string());
        let message = input
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| PREVIEW_MESSAGE.to_string());
        let archive_path = archive_path_or_default(input.archive_path);
        let mut appearance = input.appearance.unwrap_or_default();
        fill_appearance_defaults(&mut appearance);

        let link = self
            .link_url(input.episode_id.flatten(), &archive_path)
            .await?;
        let image = self.image(input.image_id.flatten()).await?;
        Ok(render_notice_email(
            &subject,
            &message,
            &link,
            &appearance,
            image.as_ref().and_then(|m| to_absolute_url(&self.server_url, &m.url)).as_deref(),
        ))
    }

    /// Mail every subscriber and record the result on `notice`
    async fn send_notice(&self, notice: &mut NewsletterNotice) -> Result<(), NewsletterServiceError> {
        let mailer = self.mailer()?;

        if notice.subject.trim().is_empty() || notice.message.trim().is_empty() {
            return Err(NewsletterServiceError::ValidationError(
                MISSING_CONTENT.to_string(),
            ));
        }

        let recipients = self.collect_recipients().await?;
        let sent_at = Utc::now();

        if recipients.is_empty() {
            tracing::info!("Newsletter notice has no recipients");
            notice.send_notice = false;
            notice.recipient_count = 0;
            notice.sent_at = Some(sent_at);
            return Ok(());
        }

        let link = self.link_url(notice.episode_id, &notice.archive_path).await?;
        let image = self.image(notice.image_id).await?;
        let mut appearance = notice.appearance.clone();
        fill_appearance_defaults(&mut appearance);
        let rendered = render_notice_email(
            &notice.subject,
            &notice.message,
            &link,
            &appearance,
            image.as_ref().and_then(|m| to_absolute_url(&self.server_url, &m.url)).as_deref(),
        );

        for (sent, to) in recipients.iter().enumerate() {
            let email = OutgoingEmail {
                to: to.clone(),
                subject: rendered.subject.clone(),
                html: rendered.html.clone(),
                text: rendered.text.clone(),
            };
            if let Err(e) = mailer.send(&email).await {
                tracing::error!(
                    "Newsletter send stopped after {} of {} recipients: {}",
                    sent,
                    recipients.len(),
                    e
                );
                return Err(NewsletterServiceError::DeliveryFailed(e.to_string()));
            }
        }

        tracing::info!("Newsletter notice sent to {} recipients", recipients.len());
        notice.send_notice = false;
        notice.recipient_count = recipients.len() as i64;
        notice.sent_at = Some(sent_at);
        Ok(())
    }

    fn mailer(&self) -> Result<Arc<dyn Mailer>, NewsletterServiceError> {
        match &self.mailer {
            Some(mailer) => Ok(mailer.clone()),
            None => create_mailer(&self.config)
                .map_err(|e| NewsletterServiceError::MailerUnavailable(e.to_string())),
        }
    }

    /// Every subscriber address, normalized, in signup order, without duplicates
    async fn collect_recipients(&self) -> Result<Vec<String>, NewsletterServiceError> {
        let per_page = self.config.subscriber_page_size.clamp(1, 100) as u32;
        let mut seen = HashSet::new();
        let mut emails = Vec::new();
        let mut page = 1;

        loop {
            let result = self
                .subscribers
                .list(&ListParams::new(page, per_page))
                .await
                .context("Failed to list subscribers")?;
            for subscriber in &result.items {
                let email = normalize_email(&subscriber.email);
                if !email.is_empty() && seen.insert(email.clone()) {
                    emails.push(email);
                }
            }
            if page >= result.total_pages() {
                break;
            }
            page += 1;
        }
        Ok(emails)
    }

    /// Absolute link for the call to action
    async fn link_url(
        &self,
        episode_id: Option<i64>,
        archive_path: &str,
    ) -> Result<String, NewsletterServiceError> {
        let slug = match episode_id {
            Some(id) => self
                .episodes
                .get_by_id(id)
                .await
                .context("Failed to get notice episode")?
                .map(|e| e.episode.slug),
            None => None,
        };
        Ok(resolve_url(
            &self.server_url,
            &notice_link_path(slug.as_deref(), Some(archive_path)),
        ))
    }

    async fn image(&self, image_id: Option<i64>) -> Result<Option<Media>, NewsletterServiceError> {
        self.media
            .find(image_id)
            .await
            .map_err(|e| NewsletterServiceError::InternalError(anyhow::Error::new(e)))
    }
}

/// Episode page 1 when the episode has a slug, else a relative archive
/// path, else `/archive`
pub fn notice_link_path(episode_slug: Option<&str>, archive_path: Option<&str>) -> String {
    if let Some(slug) = episode_slug.filter(|s| !s.is_empty()) {
        return format!("/episode/{}/1", slug);
    }
    match archive_path {
        Some(path) if path.starts_with('/') => path.to_string(),
        _ => DEFAULT_ARCHIVE_PATH.to_string(),
    }
}

/// Build the subject, HTML and plain-text bodies of a notice email
pub fn render_notice_email(
    subject: &str,
    message: &str,
    link: &str,
    appearance: &NoticeAppearance,
    image_url: Option<&str>,
) -> NoticeEmail {
    let image = image_url
        .map(|url| {
            format!(
                r#"<img src="{}" alt="" style="display:block;width:100%;max-width:640px;height:auto;margin:0 0 16px;border-radius:8px;" />"#,
                escape_html(url)
            )
        })
        .unwrap_or_default();

    let html = format!(
        concat!(
            r#"<div style="background:{bg};color:{fg};padding:16px;border-radius:12px;font-family:Arial,Helvetica,sans-serif;">"#,
            "{image}",
            r#"<p style="margin:0 0 16px;line-height:1.6;white-space:pre-wrap;">{message}</p>"#,
            r#"<p style="margin:0;"><a href="{link}" style="display:inline-block;background:{button};color:{button_text};padding:12px 18px;border-radius:8px;text-decoration:none;font-weight:600;">{cta}</a></p>"#,
            "</div>"
        ),
        bg = escape_html(&appearance.background_color),
        fg = escape_html(&appearance.text_color),
        image = image,
        message = escape_html(message),
        link = escape_html(link),
        button = escape_html(&appearance.button_color),
        button_text = escape_html(&appearance.button_text_color),
        cta = escape_html(&appearance.cta_label),
    );

    NoticeEmail {
        subject: subject.to_string(),
        html,
        text: format!("{}\n\n{}: {}", message, appearance.cta_label, link),
    }
}

/// Blank appearance fields fall back to the defaults
fn fill_appearance_defaults(appearance: &mut NoticeAppearance) {
    let defaults = NoticeAppearance::default();
    let fill = |value: &mut String, default: String| {
        if value.trim().is_empty() {
            *value = default;
        }
    };
    fill(&mut appearance.background_color, defaults.background_color);
    fill(&mut appearance.text_color, defaults.text_color);
    fill(&mut appearance.button_color, defaults.button_color);
    fill(&mut appearance.button_text_color, defaults.button_text_color);
    fill(&mut appearance.cta_label, defaults.cta_label);
}

fn archive_path_or_default(path: Option<String>) -> String {
    path.map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_PATH.to_string())
}

fn required(value: Option<String>, field: &str) -> Result<String, NewsletterServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NewsletterServiceError::ValidationError(format!("{} is required", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::episode::sample_episode;
    use crate::db::repositories::media::media_input;
    use crate::db::repositories::{
        MediaRepository, SqlxEpisodeRepository, SqlxMediaRepository, SqlxNoticeRepository,
        SqlxSubscriberRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::EpisodePageInput;
    use crate::services::email::testing::RecordingMailer;
    use crate::services::email::MISSING_RESEND_CONFIG;

    struct Fixture {
        service: NewsletterService,
        subscribers: Arc<dyn SubscriberRepository>,
        episodes: Arc<dyn EpisodeRepository>,
        media: Arc<dyn MediaRepository>,
    }

    async fn fixture(page_size: i64) -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let subscribers = SqlxSubscriberRepository::boxed(pool.clone());
        let episodes = SqlxEpisodeRepository::boxed(pool.clone());
        let media = SqlxMediaRepository::boxed(pool.clone());
        let config = NewsletterConfig {
            subscriber_page_size: page_size,
            ..Default::default()
        };
        let service = NewsletterService::new(
            subscribers.clone(),
            SqlxNoticeRepository::boxed(pool),
            episodes.clone(),
            Arc::new(MediaService::new(media.clone(), UploadConfig::default(), None)),
            config,
            "https://comic.example.com",
        );
        Fixture {
            service,
            subscribers,
            episodes,
            media,
        }
    }

    fn notice(send: bool) -> NoticeInput {
        NoticeInput {
            subject: Some("Episode 5 is live".to_string()),
            message: Some("The gate opens <tonight>.".to_string()),
            send_notice: send,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_subscribe_outcomes() {
        let f = fixture(100).await;
        assert_eq!(
            f.service.subscribe("not-an-email").await.unwrap(),
            SubscribeOutcome::InvalidEmail
        );
        assert_eq!(f.service.subscribe("   ").await.unwrap(), SubscribeOutcome::InvalidEmail);

        let SubscribeOutcome::Created(created) =
            f.service.subscribe("  Reader@Example.COM ").await.unwrap()
        else {
            panic!("expected a new subscriber");
        };
        assert_eq!(created.email, "reader@example.com");
        assert_eq!(
            f.service.subscribe("reader@example.com").await.unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );
    }

    #[tokio::test]
    async fn test_admin_create_rejects_duplicates() {
        let f = fixture(100).await;
        let input = || SubscriberInput {
            email: "reader@example.com".to_string(),
        };
        f.service.create_subscriber(input()).await.unwrap();
        assert!(matches!(
            f.service.create_subscriber(input()).await,
            Err(NewsletterServiceError::DuplicateEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_send_pages_through_all_subscribers() {
        let f = fixture(2).await;
        for email in ["a@example.com", "b@example.com", "c@example.com", "d@example.com", "e@example.com"] {
            f.subscribers.create(email).await.unwrap();
        }
        let mailer = Arc::new(RecordingMailer::default());
        let service = f.service.with_mailer(mailer.clone());

        let saved = service
            .create_notice(notice(true), MutationContext::default())
            .await
            .unwrap();
        assert!(!saved.send_notice);
        assert_eq!(saved.recipient_count, 5);
        assert!(saved.sent_at.is_some());

        let sent = mailer.sent.lock().await;
        let to: Vec<&str> = sent.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(to, vec!["a@example.com", "b@example.com", "c@example.com", "d@example.com", "e@example.com"]);
        assert_eq!(
            sent[0].text,
            "The gate opens <tonight>.\n\nRead now: https://comic.example.com/archive"
        );
        assert!(sent[0].html.contains("The gate opens &lt;tonight&gt;."));
        assert!(sent[0].html.contains(r#"href="https://comic.example.com/archive""#));
    }

    #[tokio::test]
    async fn test_zero_recipients_marks_sent() {
        let f = fixture(100).await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = f.service.with_mailer(mailer.clone());
        let saved = service
            .create_notice(notice(true), MutationContext::default())
            .await
            .unwrap();
        assert!(!saved.send_notice);
        assert_eq!(saved.recipient_count, 0);
        assert!(saved.sent_at.is_some());
        assert!(mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_skip_flag_and_unchecked_box_do_not_send() {
        let f = fixture(100).await;
        f.subscribers.create("a@example.com").await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let service = f.service.with_mailer(mailer.clone());

        let skipped = service
            .create_notice(
                notice(true),
                MutationContext {
                    skip_newsletter_send: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(skipped.send_notice);
        assert!(skipped.sent_at.is_none());

        service
            .create_notice(notice(false), MutationContext::default())
            .await
            .unwrap();
        assert!(mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_provider_config_fails_send() {
        let f = fixture(100).await;
        let err = f
            .service
            .create_notice(notice(true), MutationContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), MISSING_RESEND_CONFIG);
        assert_eq!(f.service.list_notices(&ListParams::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_notice_unsent() {
        let f = fixture(100).await;
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            f.subscribers.create(email).await.unwrap();
        }
        let draft = f
            .service
            .create_notice(notice(false), MutationContext::default())
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer {
            fail_for: vec!["b@example.com".to_string()],
            ..Default::default()
        });
        let service = f.service.with_mailer(mailer.clone());
        let err = service
            .update_notice(
                draft.id,
                NoticeInput {
                    send_notice: true,
                    ..Default::default()
                },
                MutationContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Resend error (422)"));
        assert_eq!(mailer.sent.lock().await.len(), 1);

        let stored = service.get_notice(draft.id).await.unwrap();
        assert!(stored.sent_at.is_none());
        assert_eq!(stored.recipient_count, 0);
    }

    #[tokio::test]
    async fn test_episode_link_and_image() {
        let f = fixture(100).await;
        f.subscribers.create("a@example.com").await.unwrap();
        let image = f.media.create(&media_input("banner.png")).await.unwrap();
        let episode = f
            .episodes
            .create(
                &sample_episode(5),
                &[EpisodePageInput {
                    image_id: image.id,
                    alt_text: None,
                    page_title: None,
                    caption: None,
                }],
            )
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let service = f.service.with_mailer(mailer.clone());
        let mut input = notice(true);
        input.episode_id = Some(Some(episode.episode.id));
        input.image_id = Some(Some(image.id));
        service
            .create_notice(input, MutationContext::default())
            .await
            .unwrap();

        let sent = mailer.sent.lock().await;
        assert!(sent[0].text.ends_with("Read now: https://comic.example.com/episode/episode-5/1"));
        assert!(sent[0]
            .html
            .contains(r#"src="https://comic.example.com/uploads/banner.png""#));
    }

    #[tokio::test]
    async fn test_preview_placeholders() {
        let f = fixture(100).await;
        let preview = f.service.preview(NoticeInput::default()).await.unwrap();
        assert_eq!(preview.subject, "Newsletter notice subject");
        assert_eq!(
            preview.text,
            "Your newsletter message preview will appear here.\n\nRead now: https://comic.example.com/archive"
        );
        assert!(preview.html.contains("background:#ffffff"));
        assert!(preview.html.contains("color:#111827"));
    }

    #[test]
    fn test_notice_link_path() {
        assert_eq!(notice_link_path(Some("the-gate"), Some("/news")), "/episode/the-gate/1");
        assert_eq!(notice_link_path(None, Some("/news")), "/news");
        assert_eq!(notice_link_path(Some(""), Some("news")), "/archive");
        assert_eq!(notice_link_path(None, None), "/archive");
    }

    #[test]
    fn test_custom_cta_label() {
        let appearance = NoticeAppearance {
            cta_label: "Start reading".to_string(),
            ..Default::default()
        };
        let email = render_notice_email("s", "m", "https://x.io/archive", &appearance, None);
        assert_eq!(email.text, "m\n\nStart reading: https://x.io/archive");
        assert!(email.html.contains(">Start reading</a>"));
        assert!(!email.html.contains("<img"));
    }
}
