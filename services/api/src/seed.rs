use crate::infra::{DiscardMailer, LogMailer};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use crowdfund::campaigns::{
    CampaignRepository, CampaignService, CampaignServiceError, Collect, CollectDraft,
    InMemoryCampaignRepository, Notifier, Occasion, PaymentDraft, User, UserRegistration,
};
use crowdfund::config::AppConfig;
use crowdfund::error::AppError;
use crowdfund::telemetry;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

const COLLECT_NAMES: [&str; 10] = [
    "Help with treatment",
    "Surgery fund",
    "Birthday present",
    "Honeymoon trip",
    "Charity drive",
    "Family support",
    "Education project",
    "Creative project",
    "Sports team",
    "Ecology project",
];

const PAYMENT_COMMENTS: [&str; 10] = [
    "Good luck with the collect!",
    "Hope this helps",
    "From the bottom of my heart",
    "May it all work out",
    "Stay healthy",
    "Best of luck",
    "Thank you for your work",
    "Hoping for the best",
    "I believe in you",
    "With love",
];

const TARGETS: [Option<i64>; 5] = [None, Some(50_000), Some(100_000), Some(200_000), Some(500_000)];

#[derive(Args, Debug, Clone)]
pub(crate) struct SeedArgs {
    /// Number of sample users
    #[arg(long, default_value_t = 5)]
    pub(crate) users: usize,
    /// Number of sample collects
    #[arg(long, default_value_t = 20)]
    pub(crate) collects: usize,
    /// Number of sample payments
    #[arg(long, default_value_t = 50)]
    pub(crate) payments: usize,
    /// Log the notification emails produced while seeding
    #[arg(long)]
    pub(crate) notify: bool,
}

impl Default for SeedArgs {
    fn default() -> Self {
        Self {
            users: 5,
            collects: 20,
            payments: 50,
            notify: false,
        }
    }
}

/// Figures reported once seeding finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) users: usize,
    pub(crate) collects: usize,
    pub(crate) payments: usize,
    pub(crate) rejected_payments: usize,
    pub(crate) total_collected: Decimal,
    pub(crate) active_collects: usize,
}

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let notifier: Arc<dyn Notifier> = if args.notify {
        Arc::new(LogMailer)
    } else {
        Arc::new(DiscardMailer)
    };
    let service = CampaignService::new(
        Arc::new(InMemoryCampaignRepository::default()),
        notifier,
        config.campaigns.clone(),
    );

    println!("Seeding sample crowdfunding data");
    let summary = seed_campaigns(&service, &args, Utc::now())?;

    println!("\nStatistics");
    println!("  Users: {}", summary.users);
    println!("  Collects: {}", summary.collects);
    println!(
        "  Payments: {} ({} rejected by validation)",
        summary.payments, summary.rejected_payments
    );
    println!("  Total collected: {}", summary.total_collected);
    println!("  Active collects: {}", summary.active_collects);
    println!(
        "\nBrowse the data at {}/api/collects/",
        config.campaigns.public_base_url
    );

    Ok(())
}

/// Create sample users, collects and payments through the service so every payment
/// passes the same validation and running-total update as live traffic.
pub(crate) fn seed_campaigns<R, N>(
    service: &CampaignService<R, N>,
    plan: &SeedArgs,
    now: DateTime<Utc>,
) -> Result<SeedSummary, AppError>
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let users = seed_users(service, plan.users)?;
    let collects = seed_collects(service, &users, plan.collects, now)?;
    let (payments, rejected_payments) =
        seed_payments(service, &users, &collects, plan.payments, now)?;

    let mut total_collected = Decimal::ZERO;
    let mut active_collects = 0;
    for collect in &collects {
        let details = service.get_collect(collect.id)?;
        total_collected += details.collect.current_amount;
        if details.collect.is_active(now) {
            active_collects += 1;
        }
    }

    Ok(SeedSummary {
        users: users.len(),
        collects: collects.len(),
        payments,
        rejected_payments,
        total_collected,
        active_collects,
    })
}

fn seed_users<R, N>(service: &CampaignService<R, N>, count: usize) -> Result<Vec<User>, AppError>
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    let mut users = Vec::with_capacity(count);
    for index in 1..=count {
        let user = service.register_user(UserRegistration {
            username: format!("user{index}"),
            email: format!("user{index}@example.com"),
        })?;
        debug!(username = %user.username, "sample user created");
        users.push(user);
    }
    Ok(users)
}

fn seed_collects<R, N>(
    service: &CampaignService<R, N>,
    users: &[User],
    count: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Collect>, AppError>
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    if users.is_empty() {
        if count > 0 {
            warn!("no users to author sample collects, skipping");
        }
        return Ok(Vec::new());
    }

    let mut collects = Vec::with_capacity(count);
    for index in 0..count {
        let author = &users[index % users.len()];
        let name = COLLECT_NAMES[index % COLLECT_NAMES.len()];
        let days_open = 30 + ((index * 37) % 336) as i64;
        let draft = CollectDraft {
            name: format!("{name} #{}", index + 1),
            occasion: Occasion::ALL[index % Occasion::ALL.len()],
            description: format!(
                "Sample description for \"{name}\". We are raising money for an important cause \
                 and are grateful for any help!"
            ),
            target_amount: TARGETS[index % TARGETS.len()].map(Decimal::from),
            end_datetime: now + Duration::days(days_open),
        };
        collects.push(service.create_collect(author.id, draft, now)?);
    }
    Ok(collects)
}

fn seed_payments<R, N>(
    service: &CampaignService<R, N>,
    users: &[User],
    collects: &[Collect],
    count: usize,
    now: DateTime<Utc>,
) -> Result<(usize, usize), AppError>
where
    R: CampaignRepository + 'static,
    N: Notifier + ?Sized + 'static,
{
    if users.len() < 2 || collects.is_empty() {
        if count > 0 {
            warn!("sample payments need two users and one collect, skipping");
        }
        return Ok((0, 0));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for index in 0..count {
        let collect = &collects[(index * 7) % collects.len()];
        let author_slot = users
            .iter()
            .position(|user| user.id == collect.author.id)
            .unwrap_or(0);
        // Donators never fund their own collect.
        let donator = &users[(author_slot + 1 + index % (users.len() - 1)) % users.len()];
        let draft = PaymentDraft {
            collect: collect.id,
            amount: Decimal::from(100 + ((index * 1237) % 9_901) as i64),
            comment: Some(PAYMENT_COMMENTS[index % PAYMENT_COMMENTS.len()].to_string()),
        };

        match service.make_payment(donator.id, draft, now) {
            Ok(_) => accepted += 1,
            Err(CampaignServiceError::Validation(err)) => {
                debug!(collect_id = %collect.id, error = %err, "sample payment rejected");
                rejected += 1;
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok((accepted, rejected))
}
