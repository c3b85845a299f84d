mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};

use common::{restaurant, BrokenRepository, RecordingMailer, StalledMailer};
use subdesk::dashboard;
use subdesk::db::{MemoryRestaurants, RestaurantRepository};
use subdesk::models::{NewRestaurant, Plan, RestaurantPatch};
use subdesk::notify::{DeliveryStatus, ExpiryNotificationJob};
use subdesk::subscription::status::{classify, Phase, StatusView};
use subdesk::subscription::validation::{evaluate, SubscriptionValidator, ValidationError, Verdict};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
}

// ── Dashboard classification ────────────────────────────────────

#[test]
fn classify_without_subscription_is_trial_regardless_of_activation() {
    let mut r = restaurant("Trattoria", now() - Duration::days(40));
    assert_eq!(classify(&r, now()), Phase::Trial);

    r.is_active = false;
    assert_eq!(classify(&r, now()), Phase::Trial);
}

#[test]
fn classify_boundaries() {
    let mut r = restaurant("Bistro", now() - Duration::days(100));

    r.subscription_end = Some(now() - Duration::seconds(1));
    assert_eq!(classify(&r, now()), Phase::Expired);

    r.subscription_end = Some(now());
    assert_eq!(classify(&r, now()), Phase::Expiring);

    r.subscription_end = Some(now() + Duration::seconds(1));
    assert_eq!(classify(&r, now()), Phase::Expiring);

    r.subscription_end = Some(now() + Duration::days(14));
    assert_eq!(classify(&r, now()), Phase::Expiring);

    r.subscription_end = Some(now() + Duration::days(15));
    assert_eq!(classify(&r, now()), Phase::Active);
}

#[test]
fn status_view_keeps_activation_separate() {
    let mut r = restaurant("Diner", now());
    r.subscription_end = Some(now() + Duration::days(90));
    r.is_active = false;

    let view = StatusView::of(&r, now());
    assert_eq!(view.phase, Phase::Active);
    assert!(!view.is_active);
}

// ── Entitlement evaluation ──────────────────────────────────────

#[test]
fn deactivated_wins_over_dates() {
    let mut r = restaurant("Closed", now());
    r.is_active = false;
    assert_eq!(evaluate(&r, now()), Verdict::Deactivated);

    r.subscription_end = Some(now() + Duration::days(200));
    r.plan = Some(Plan::OneYear);
    assert_eq!(evaluate(&r, now()), Verdict::Deactivated);
}

#[test]
fn trial_counts_down_from_trial_start() {
    let start = now();
    let r = restaurant("Newcomer", start);

    assert_eq!(
        evaluate(&r, start + Duration::days(13)),
        Verdict::Trial { days_remaining: 1 }
    );
    assert_eq!(
        evaluate(&r, start + Duration::days(14)),
        Verdict::Trial { days_remaining: 0 }
    );
    assert_eq!(evaluate(&r, start + Duration::days(15)), Verdict::TrialExpired);
}

#[test]
fn paid_subscription_is_binary() {
    let mut r = restaurant("Paid", now() - Duration::days(300));
    let end = now() + Duration::days(3);
    r.subscription_end = Some(end);
    r.plan = Some(Plan::SixMonths);

    // Three days left is still plainly active for the caller
    assert_eq!(
        evaluate(&r, now()),
        Verdict::Active {
            plan: Some(Plan::SixMonths),
            days_remaining: 3,
            expires_at: end,
        }
    );
    assert_eq!(evaluate(&r, end), Verdict::Active {
        plan: Some(Plan::SixMonths),
        days_remaining: 0,
        expires_at: end,
    });
    assert_eq!(evaluate(&r, end + Duration::seconds(1)), Verdict::Expired);
}

#[test]
fn verdict_messages() {
    assert!(Verdict::Trial { days_remaining: 3 }.is_valid());
    assert!(!Verdict::Expired.is_valid());
    assert_eq!(Verdict::TrialExpired.status(), "trial_expired");
    assert_eq!(Verdict::Expired.message(), Some("Subscription has expired."));
    assert_eq!(Verdict::Trial { days_remaining: 3 }.message(), None);
}

#[tokio::test]
async fn validator_distinguishes_missing_unknown_and_deactivated() {
    let repo = Arc::new(MemoryRestaurants::new());
    let mut closed = restaurant("Closed", now());
    closed.linked_project_id = Some("proj-closed".to_string());
    closed.is_active = false;
    repo.insert(closed).await.unwrap();

    let validator = SubscriptionValidator::new(repo, StdDuration::from_secs(1));

    assert!(matches!(
        validator.validate(None, now()).await,
        Err(ValidationError::MissingProjectId)
    ));
    assert!(matches!(
        validator.validate(Some(""), now()).await,
        Err(ValidationError::MissingProjectId)
    ));
    // Only an empty id counts as missing; whitespace is looked up as sent.
    assert!(matches!(
        validator.validate(Some("  "), now()).await,
        Err(ValidationError::NotFound)
    ));
    assert!(matches!(
        validator.validate(Some("proj-unknown"), now()).await,
        Err(ValidationError::NotFound)
    ));
    assert_eq!(
        validator.validate(Some("proj-closed"), now()).await.unwrap(),
        Verdict::Deactivated
    );
}

#[tokio::test]
async fn validator_surfaces_repository_failures() {
    let validator = SubscriptionValidator::new(Arc::new(BrokenRepository), StdDuration::from_secs(1));

    assert!(matches!(
        validator.validate(Some("proj"), now()).await,
        Err(ValidationError::Repository(_))
    ));
}

// ── Subscription extension ──────────────────────────────────────

#[test]
fn extension_resets_end_from_now() {
    let mut r = restaurant("Extend", now() - Duration::days(30));
    r.subscription_end = Some(now() + Duration::days(300));

    RestaurantPatch::extension(Plan::SixMonths, now()).apply(&mut r);
    assert_eq!(r.plan, Some(Plan::SixMonths));
    assert_eq!(
        r.subscription_end,
        Some(Utc.with_ymd_and_hms(2025, 9, 15, 12, 0, 0).unwrap())
    );

    RestaurantPatch::extension(Plan::OneYear, now()).apply(&mut r);
    assert_eq!(r.plan, Some(Plan::OneYear));
    assert_eq!(
        r.subscription_end,
        Some(Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap())
    );
}

#[test]
fn extension_clamps_to_month_end() {
    let aug_31 = Utc.with_ymd_and_hms(2025, 8, 31, 9, 0, 0).unwrap();
    assert_eq!(
        Plan::SixMonths.end_from(aug_31),
        Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap()
    );
}

// ── Expiry notifications ────────────────────────────────────────

async fn seed_three(repo: &MemoryRestaurants) {
    let mut soon = restaurant("Soon", now() - Duration::days(200));
    soon.subscription_end = Some(now() + Duration::days(5));
    soon.contact_email = Some("soon@example.com".to_string());
    soon.domain = Some("soon.example.com".to_string());

    let mut later = restaurant("Later", now() - Duration::days(200));
    later.subscription_end = Some(now() + Duration::days(20));
    later.contact_email = Some("later@example.com".to_string());

    let mut gone = restaurant("Gone", now() - Duration::days(200));
    gone.subscription_end = Some(now() - Duration::days(1));
    gone.contact_email = Some("gone@example.com".to_string());

    for r in [soon, later, gone] {
        repo.insert(r).await.unwrap();
    }
}

#[tokio::test]
async fn job_selects_only_restaurants_inside_window() {
    let repo = Arc::new(MemoryRestaurants::new());
    seed_three(&repo).await;
    let mailer = Arc::new(RecordingMailer::default());

    let report = ExpiryNotificationJob::new(repo, mailer.clone())
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.results[0].restaurant, "Soon");
    assert_eq!(report.results[0].status, DeliveryStatus::Sent);
    assert_eq!(report.results[0].email.as_deref(), Some("soon@example.com"));

    let sent = mailer.deliveries();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Subscription Expiring Soon - Soon");
    assert!(sent[0].html.contains("5 days"));
    assert!(sent[0].html.contains("soon.example.com"));
    assert!(sent[0].html.contains("Mar 20, 2025"));
}

#[tokio::test]
async fn job_reports_failed_send_without_aborting() {
    let repo = Arc::new(MemoryRestaurants::new());
    seed_three(&repo).await;
    let mailer = Arc::new(RecordingMailer::default());
    mailer.fail_for("soon@example.com");

    let report = ExpiryNotificationJob::new(repo, mailer)
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.results[0].status, DeliveryStatus::Failed);
    assert!(report.results[0].error.as_deref().unwrap().contains("soon@example.com"));
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn job_isolates_failures_per_restaurant() {
    let repo = Arc::new(MemoryRestaurants::new());
    for (i, name) in ["First", "Second", "Third"].iter().enumerate() {
        let mut r = restaurant(name, now() - Duration::days(200));
        r.subscription_end = Some(now() + Duration::days(i as i64 + 1));
        r.contact_email = Some(format!("{}@example.com", name.to_lowercase()));
        repo.insert(r).await.unwrap();
    }
    let mailer = Arc::new(RecordingMailer::default());
    mailer.fail_for("second@example.com");

    let report = ExpiryNotificationJob::new(repo, mailer.clone())
        .with_concurrency(3)
        .run(now())
        .await
        .unwrap();

    let statuses: Vec<_> = report
        .results
        .iter()
        .map(|r| (r.restaurant.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("First", DeliveryStatus::Sent),
            ("Second", DeliveryStatus::Failed),
            ("Third", DeliveryStatus::Sent),
        ]
    );
    assert_eq!(mailer.deliveries().len(), 2);
    assert!(mailer
        .deliveries()
        .iter()
        .any(|d| d.to == "first@example.com" && d.html.contains("1 day<")));
}

#[tokio::test]
async fn job_skips_inactive_and_uncontactable() {
    let repo = Arc::new(MemoryRestaurants::new());
    let mut off = restaurant("Off", now() - Duration::days(200));
    off.subscription_end = Some(now() + Duration::days(2));
    off.contact_email = Some("off@example.com".to_string());
    off.is_active = false;

    let mut silent = restaurant("Silent", now() - Duration::days(200));
    silent.subscription_end = Some(now() + Duration::days(2));

    let mut edge = restaurant("Edge", now() - Duration::days(200));
    edge.subscription_end = Some(now() + Duration::days(14));
    edge.contact_email = Some("edge@example.com".to_string());

    for r in [off, silent, edge] {
        repo.insert(r).await.unwrap();
    }

    let report = ExpiryNotificationJob::new(repo, Arc::new(RecordingMailer::default()))
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.results[0].restaurant, "Edge");
}

#[tokio::test]
async fn job_times_out_stalled_sends() {
    let repo = Arc::new(MemoryRestaurants::new());
    seed_three(&repo).await;

    let report = ExpiryNotificationJob::new(repo, Arc::new(StalledMailer))
        .with_timeouts(StdDuration::from_secs(1), StdDuration::from_millis(50))
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.results[0].status, DeliveryStatus::Failed);
    assert!(report.results[0].error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn job_fails_when_query_fails() {
    let job = ExpiryNotificationJob::new(Arc::new(BrokenRepository), Arc::new(RecordingMailer::default()));
    assert!(job.run(now()).await.is_err());
}

#[tokio::test]
async fn notice_escapes_restaurant_name() {
    let repo = Arc::new(MemoryRestaurants::new());
    let mut r = restaurant("<b>Fish & Chips</b>", now() - Duration::days(200));
    r.subscription_end = Some(now() + Duration::days(3));
    r.contact_email = Some("fish@example.com".to_string());
    repo.insert(r).await.unwrap();
    let mailer = Arc::new(RecordingMailer::default());

    ExpiryNotificationJob::new(repo, mailer.clone())
        .run(now())
        .await
        .unwrap();

    let html = &mailer.deliveries()[0].html;
    assert!(!html.contains("<b>Fish"));
    assert!(!html.contains("</b>"));
    assert!(html.contains("&#60;b&#62;Fish &#38; Chips&#60;/b&#62;"));
    assert!(html.contains("N/A"));
}

// ── Dashboard aggregates ────────────────────────────────────────

#[test]
fn stats_count_each_phase() {
    let trial = restaurant("Trial", now());
    let mut active = restaurant("Active", now() - Duration::days(30));
    active.subscription_end = Some(now() + Duration::days(100));
    let mut expiring = restaurant("Expiring", now() - Duration::days(30));
    expiring.subscription_end = Some(now() + Duration::days(3));
    let mut expired = restaurant("Expired", now() - Duration::days(30));
    expired.subscription_end = Some(now() - Duration::days(3));
    expired.is_active = false;

    let stats = dashboard::stats(&[trial, active, expiring, expired], now());
    assert_eq!(stats.total, 4);
    assert_eq!(stats.trials, 1);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.expiring, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.deactivated, 1);
}

#[test]
fn search_matches_name_domain_and_email() {
    let mut r = restaurant("Golden Dragon", now());
    r.domain = Some("dragon.example.com".to_string());
    r.contact_email = Some("Owner@Golden.example".to_string());

    assert!(dashboard::matches_search(&r, "golden"));
    assert!(dashboard::matches_search(&r, "DRAGON.EXAMPLE"));
    assert!(dashboard::matches_search(&r, "owner@"));
    assert!(dashboard::matches_search(&r, ""));
    assert!(!dashboard::matches_search(&r, "pizza"));
}

#[test]
fn filter_by_phase_and_search() {
    let trial = restaurant("Pizza Trial", now());
    let mut paid = restaurant("Pizza Paid", now() - Duration::days(30));
    paid.subscription_end = Some(now() + Duration::days(100));
    let other = restaurant("Sushi", now());

    let rows = dashboard::filter(
        vec![trial, paid, other],
        Some("pizza"),
        Some(Phase::Trial),
        now(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Pizza Trial");
}

#[test]
fn trends_cover_six_months() {
    let mut old = restaurant("Old", Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap());
    old.subscription_end = Some(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap());
    let fresh = restaurant("Fresh", Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap());

    let points = dashboard::trends(&[old, fresh], now());
    let months: Vec<_> = points.iter().map(|p| p.month.as_str()).collect();
    assert_eq!(
        months,
        vec!["Oct 2024", "Nov 2024", "Dec 2024", "Jan 2025", "Feb 2025", "Mar 2025"]
    );

    // Old is active through January, when its subscription ends
    assert_eq!(points[3].active, 1);
    assert_eq!(points[3].expired, 1);
    assert_eq!(points[4].active, 0);
    // Fresh shows up as a trial in March only
    assert_eq!(points[4].trials, 0);
    assert_eq!(points[5].trials, 1);
    assert_eq!(points[5].active, 1);
}

#[test]
fn new_restaurant_defaults() {
    let created = NewRestaurant::named("Defaults").into_restaurant(now());
    assert!(created.is_active);
    assert_eq!(created.trial_start, now());
    assert_eq!(created.created_at, now());
    assert!(created.subscription_end.is_none());
    assert!(created.plan.is_none());
}
