use std::env;

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use doctrack::{
    auth::password,
    config::AppConfig,
    db::{self, PgPool},
    jobs, notifications, reminders,
    models::{NewUser, NewUserRole, Role, User},
    schema::{departments, roles, user_roles, users},
    workflow::RoleName,
};

const USAGE: &str = "Usage: maintenance <command>
  scan-reminders
  create-user <username> <email> <full name> <password> [department code]
  grant-role <username> <admin|document_controller|staff>
  queue-stats
  purge-jobs [days]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let pool = connect()?;
    match command.as_str() {
        "scan-reminders" => scan_reminders(&pool)?,
        "create-user" => create_user(&pool, &args[1..])?,
        "grant-role" => grant_role(&pool, &args[1..])?,
        "queue-stats" => queue_stats(&pool)?,
        "purge-jobs" => purge_jobs(&pool, args.get(1))?,
        other => {
            eprintln!("Unknown command: {other}\n{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    db::init_pool_with_size(&config.database_url, 1)
}

fn scan_reminders(pool: &PgPool) -> Result<()> {
    let mut conn = pool.get().context("failed to get database connection")?;
    let summary = reminders::scan(&mut conn, Utc::now().date_naive())
        .context("failed to scan for reminders")?;
    let dispatched = notifications::dispatch(&mut conn, &summary.notices);

    println!(
        "Scanned {} documents: {} due soon, {} overdue, {} expiry warnings ({} notices dispatched).",
        summary.scanned, summary.due_soon, summary.overdue, summary.expiry_warnings, dispatched
    );
    Ok(())
}

fn create_user(pool: &PgPool, args: &[String]) -> Result<()> {
    let [username, email, full_name, plain, rest @ ..] = args else {
        bail!("create-user needs <username> <email> <full name> <password>");
    };
    let mut conn = pool.get().context("failed to get database connection")?;

    let department_id = match rest.first() {
        Some(code) => Some(
            departments::table
                .filter(departments::code.eq(code.to_ascii_uppercase()))
                .select(departments::id)
                .first::<Uuid>(&mut conn)
                .optional()?
                .with_context(|| format!("unknown department code {code}"))?,
        ),
        None => None,
    };

    let password_hash = password::hash_password(plain)?;
    let user: User = diesel::insert_into(users::table)
        .values(&NewUser {
            id: Uuid::new_v4(),
            username: username.clone(),
            email: email.clone(),
            full_name: full_name.clone(),
            password_hash,
            department_id,
        })
        .get_result(&mut conn)
        .context("failed to create user")?;

    println!("Created user {} ({}).", user.username, user.id);
    Ok(())
}

fn grant_role(pool: &PgPool, args: &[String]) -> Result<()> {
    let [username, role_name, ..] = args else {
        bail!("grant-role needs <username> <role>");
    };
    let role_name: RoleName = role_name.parse().map_err(anyhow::Error::msg)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let user: User = users::table
        .filter(users::username.eq(username))
        .first(&mut conn)
        .optional()?
        .with_context(|| format!("unknown user {username}"))?;
    let role: Role = roles::table
        .filter(roles::name.eq(role_name.as_str()))
        .first(&mut conn)
        .context("role missing from database")?;

    let inserted = diesel::insert_into(user_roles::table)
        .values(&NewUserRole {
            user_id: user.id,
            role_id: role.id,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    if inserted == 0 {
        println!("{} already has role {}.", user.username, role.name);
    } else {
        println!("Granted {} to {}.", role.name, user.username);
    }
    Ok(())
}

fn queue_stats(pool: &PgPool) -> Result<()> {
    let mut conn = pool.get().context("failed to get database connection")?;
    let counts = jobs::queue_counts(&mut conn)?;
    if counts.is_empty() {
        println!("Job queue is empty.");
    }
    for (status, count) in counts {
        println!("{status:>12}  {count}");
    }
    Ok(())
}

fn purge_jobs(pool: &PgPool, days: Option<&String>) -> Result<()> {
    let days: i64 = match days {
        Some(value) => value.parse().context("days must be a whole number")?,
        None => 30,
    };
    let cutoff = Utc::now().naive_utc() - ChronoDuration::days(days);
    let mut conn = pool.get().context("failed to get database connection")?;
    let deleted = jobs::purge_succeeded(&mut conn, cutoff)?;
    println!("Purged {deleted} succeeded jobs older than {days} days.");
    Ok(())
}
