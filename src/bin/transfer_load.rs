//! Transfer load tool
//!
//! Fires concurrent random transfers at a ledger and checks that the total
//! balance is unchanged afterwards.
//!
//! Run with: cargo run --bin transfer_load --release -- --transfers 1000 --accounts 10 --concurrency 16
//! Uses STORE_BACKEND / DATABASE_URL like the server (memory when unset).

use std::time::Instant;

use futures::StreamExt;
use rand::Rng;
use rust_decimal::Decimal;

use atomic_ledger::config::{PoolConfig, StoreBackend};
use atomic_ledger::store::LedgerStore;
use atomic_ledger::{db, AccountId, ErrorKind, Ledger, MemoryLedgerStore, PgLedgerStore, RetryPolicy};

const INITIAL_BALANCE: i64 = 1000;

struct Args {
    transfers: usize,
    accounts: usize,
    concurrency: usize,
}

fn arg_or(args: &[String], flag: &str, default: usize) -> usize {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let raw: Vec<String> = std::env::args().collect();
    let args = Args {
        transfers: arg_or(&raw, "--transfers", 1000),
        accounts: arg_or(&raw, "--accounts", 10).max(2),
        concurrency: arg_or(&raw, "--concurrency", 16).max(1),
    };

    let backend = match std::env::var("STORE_BACKEND") {
        Ok(value) => value.parse::<StoreBackend>()?,
        Err(_) => StoreBackend::Memory,
    };

    match backend {
        StoreBackend::Memory => {
            println!("Using in-memory store");
            run(Ledger::new(MemoryLedgerStore::new()), &args).await
        }
        StoreBackend::Postgres => {
            let database_url = std::env::var("DATABASE_URL")?;
            println!("Connecting to database...");

            let pool_config = PoolConfig {
                max_connections: args.concurrency as u32,
                min_connections: 1,
                idle_timeout: std::time::Duration::from_secs(60),
                max_lifetime: std::time::Duration::from_secs(300),
                acquire_timeout: std::time::Duration::from_secs(5),
            };
            let pool = db::connect(&database_url, &pool_config).await?;
            db::ensure_schema(&pool).await?;

            let result = run(Ledger::new(PgLedgerStore::new(pool.clone())), &args).await;
            pool.close().await;
            result
        }
    }
}

async fn run<S: LedgerStore>(ledger: Ledger<S>, args: &Args) -> anyhow::Result<()> {
    let ledger = ledger.with_retry_policy(RetryPolicy {
        max_attempts: 5,
        ..RetryPolicy::default()
    });

    // Unique emails so repeated runs against one database don't collide
    let run_tag = uuid::Uuid::new_v4().simple().to_string();
    let mut ids: Vec<AccountId> = Vec::with_capacity(args.accounts);
    for i in 0..args.accounts {
        let account = ledger
            .create_account(
                &format!("load-{i}"),
                &format!("load-{i}-{run_tag}@load.test"),
                Decimal::from(INITIAL_BALANCE),
            )
            .await?;
        ids.push(account.id);
    }

    let before = total_of(&ledger, &ids).await?;
    println!(
        "Load Test - {} transfers across {} accounts, concurrency {}",
        args.transfers, args.accounts, args.concurrency
    );

    let plan = random_plan(&ids, args.transfers);

    let start = Instant::now();
    let outcomes: Vec<Result<(), ErrorKind>> = futures::stream::iter(plan)
        .map(|(from, to, amount)| {
            let ledger = &ledger;
            async move {
                ledger
                    .transfer(from, to, amount, None)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.kind())
            }
        })
        .buffer_unordered(args.concurrency)
        .collect()
        .await;
    let elapsed = start.elapsed();

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    let insufficient = outcomes
        .iter()
        .filter(|o| matches!(o, Err(ErrorKind::InsufficientFunds)))
        .count();
    let other_failures = outcomes.len() - succeeded - insufficient;

    let after = total_of(&ledger, &ids).await?;

    println!("\n=== Load Test Results ===");
    println!("Total transfers: {}", outcomes.len());
    println!("Committed: {}", succeeded);
    println!("Insufficient funds: {}", insufficient);
    println!("Other failures: {}", other_failures);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} transfers/sec",
        outcomes.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("Total before: {}  after: {}", before, after);

    if before != after {
        anyhow::bail!("balance total changed from {} to {}", before, after);
    }
    println!("Conservation check passed");

    Ok(())
}

/// Random distinct (from, to) pairs with amounts between 0.01 and 500.00
fn random_plan(ids: &[AccountId], transfers: usize) -> Vec<(AccountId, AccountId, Decimal)> {
    let mut rng = rand::thread_rng();
    (0..transfers)
        .map(|_| {
            let from = rng.gen_range(0..ids.len());
            let mut to = rng.gen_range(0..ids.len() - 1);
            if to >= from {
                to += 1;
            }
            let amount = Decimal::new(rng.gen_range(1..=50_000), 2);
            (ids[from], ids[to], amount)
        })
        .collect()
}

/// Sum of the balances of the accounts this run created
async fn total_of<S: LedgerStore>(ledger: &Ledger<S>, ids: &[AccountId]) -> anyhow::Result<Decimal> {
    let mut total = Decimal::ZERO;
    for id in ids {
        total += ledger.get_account(*id).await?.balance.value();
    }
    Ok(total)
}
