use crate::campaigns::domain::{money, Collect, Payment};
use crate::config::CampaignConfig;

use super::{EmailMessage, NotificationKind};

const SIGNATURE: &str = "The Crowdfund team";
const DATE_FORMAT: &str = "%d.%m.%Y";
const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

fn message(
    config: &CampaignConfig,
    kind: NotificationKind,
    recipient: &str,
    subject: String,
    lines: Vec<String>,
) -> EmailMessage {
    let mut body = lines.join("\n");
    body.push_str("\n\n");
    body.push_str(SIGNATURE);

    EmailMessage {
        kind,
        from: config.from_email.clone(),
        recipient: recipient.to_string(),
        subject,
        body,
    }
}

/// Sent to the author once a collect has been opened.
pub fn collect_created(config: &CampaignConfig, collect: &Collect) -> EmailMessage {
    let target = collect
        .target_amount
        .map(|target| money(target).to_string())
        .unwrap_or_else(|| "Unlimited".to_string());

    message(
        config,
        NotificationKind::CollectCreated,
        &collect.author.email,
        format!("Collect \"{}\" has been created", collect.name),
        vec![
            format!("Hello, {}!", collect.author.username),
            String::new(),
            format!(
                "Your collect \"{}\" is now open for donations.",
                collect.name
            ),
            String::new(),
            "Details:".to_string(),
            format!("- Name: {}", collect.name),
            format!("- Occasion: {}", collect.occasion.label()),
            format!("- Target amount: {target}"),
            format!("- Ends on: {}", collect.end_datetime.format(DATE_FORMAT)),
            String::new(),
            format!("Link: {}", config.collect_url(collect.id.0)),
        ],
    )
}

/// Thank-you note for the donator, sent after the running total was updated.
pub fn donation_receipt(
    config: &CampaignConfig,
    collect: &Collect,
    payment: &Payment,
) -> EmailMessage {
    let mut lines = vec![
        format!("Hello, {}!", payment.donator.username),
        String::new(),
        format!(
            "Thank you for donating {} to \"{}\".",
            money(payment.amount),
            collect.name
        ),
        String::new(),
        format!("Your comment: \"{}\"", payment.comment_or_default()),
        format!(
            "Donated on: {}",
            payment.date_added.format(DATETIME_FORMAT)
        ),
        String::new(),
        format!(
            "The collect now totals {}.",
            money(collect.current_amount)
        ),
    ];
    if let Some(remaining) = collect.remaining() {
        lines.push(format!("Remaining to collect: {remaining}."));
    }

    message(
        config,
        NotificationKind::DonationReceipt,
        &payment.donator.email,
        "Thank you for your donation!".to_string(),
        lines,
    )
}

/// Notice for the author about an incoming donation. `None` when authors donate to
/// their own collect.
pub fn donation_received(
    config: &CampaignConfig,
    collect: &Collect,
    payment: &Payment,
) -> Option<EmailMessage> {
    if payment.donator.id == collect.author.id {
        return None;
    }

    let mut lines = vec![
        format!("Hello, {}!", collect.author.username),
        String::new(),
        format!("Your collect \"{}\" received a new donation.", collect.name),
        String::new(),
        format!("- Donator: {}", payment.donator.username),
        format!("- Amount: {}", money(payment.amount)),
        format!("- Comment: \"{}\"", payment.comment_or_default()),
        format!("- Date: {}", payment.date_added.format(DATETIME_FORMAT)),
        String::new(),
        format!("Current total: {}.", money(collect.current_amount)),
    ];
    if let Some(progress) = collect.progress_percent() {
        lines.push(format!("Progress: {progress:.1}%"));
    }

    Some(message(
        config,
        NotificationKind::DonationReceived,
        &collect.author.email,
        "New donation to your collect!".to_string(),
        lines,
    ))
}

/// Congratulates the author when the target is met.
pub fn goal_reached(config: &CampaignConfig, collect: &Collect, donors: usize) -> EmailMessage {
    let target = collect
        .target_amount
        .map(|target| money(target).to_string())
        .unwrap_or_default();

    message(
        config,
        NotificationKind::GoalReached,
        &collect.author.email,
        "Congratulations! Your target has been reached!".to_string(),
        vec![
            format!("Hello, {}!", collect.author.username),
            String::new(),
            format!(
                "Your collect \"{}\" reached its target of {target}.",
                collect.name
            ),
            String::new(),
            format!("Current total: {}", money(collect.current_amount)),
            format!("Donors: {donors}"),
            String::new(),
            format!(
                "The collect stays open until {}.",
                collect.end_datetime.format(DATE_FORMAT)
            ),
        ],
    )
}
