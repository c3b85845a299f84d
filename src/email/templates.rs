use askama::Template;
use chrono::{DateTime, Utc};

#[derive(Template)]
#[template(path = "email/expiry_notice.html")]
struct ExpiryNotice<'a> {
    name: &'a str,
    domain: &'a str,
    days: i64,
    expiry_date: String,
}

pub fn expiry_subject(name: &str) -> String {
    format!("Subscription Expiring Soon - {name}")
}

pub fn render_expiry_notice(
    name: &str,
    domain: Option<&str>,
    days: i64,
    expires_at: DateTime<Utc>,
) -> Result<String, askama::Error> {
    ExpiryNotice {
        name,
        domain: domain.filter(|d| !d.is_empty()).unwrap_or("N/A"),
        days,
        expiry_date: expires_at.format("%b %-d, %Y").to_string(),
    }
    .render()
}
