use std::env;
use std::net::SocketAddr;

use contracts::{
    KycStatus, PlatformConfig, UserProfile, WithdrawalMethod, WithdrawalRequest, SECONDS_PER_DAY,
};
use ledger_api::serve;
use ledger_core::providers::{InMemoryDirectory, PrefixVerifier, RecordingPayout};
use ledger_core::{ManualClock, RewardsEngine, SqliteLedgerStore, SystemClock, TaskCatalog};

fn print_usage() {
    println!("ledger-cli <command>");
    println!("commands:");
    println!("  serve [addr] [sqlite_path]");
    println!("    default addr: 127.0.0.1:8080");
    println!("    default sqlite_path: $LEDGER_SQLITE_PATH or credit_ledger.sqlite");
    println!("  demo");
    println!("    runs a scripted referral/earning/withdrawal flow in memory");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn default_sqlite_path() -> String {
    env::var("LEDGER_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "credit_ledger.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn profile(user_id: &str, referrer: Option<&str>) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        vip_level: 0,
        referrer_id: referrer.map(str::to_string),
        email_verified: false,
        kyc_status: KycStatus::Unverified,
        streak: 0,
    }
}

fn run_demo() -> Result<(), String> {
    let clock = ManualClock::new(1_700_000_000);
    let directory = InMemoryDirectory::new();
    directory.register(profile("alice", None));
    directory.register(profile("bob", Some("alice")));
    directory.register(profile("carol", Some("bob")));

    let store = SqliteLedgerStore::open_in_memory().map_err(|err| err.to_string())?;
    let mut engine = RewardsEngine::new(
        store,
        PlatformConfig::default(),
        TaskCatalog::stock(),
        Box::new(clock.clone()),
        Box::new(directory.clone()),
        Box::new(PrefixVerifier::default()),
        Box::new(RecordingPayout::new()),
    );

    println!("== signup: carol joins via bob's referral code");
    engine
        .record_signup("carol")
        .map_err(|err| err.to_string())?;

    println!("== carol completes tasks");
    for task_id in ["watch_ad", "daily_survey"] {
        engine
            .start_task("carol", task_id)
            .map_err(|err| err.to_string())?;
        let done = engine
            .complete_task("carol", task_id, "confirmed:demo")
            .map_err(|err| err.to_string())?;
        println!(
            "  {task_id}: +{} ({:?})",
            done.amount, done.entry_status
        );
    }

    let bonus = engine
        .claim_daily_bonus("carol")
        .map_err(|err| err.to_string())?;
    println!("  daily bonus: +{} (streak {})", bonus.amount, bonus.streak);

    println!("== one day later: credits vest, commissions cascade");
    clock.advance(SECONDS_PER_DAY);
    for user in ["carol", "bob", "alice"] {
        let balance = engine.get_balance(user).map_err(|err| err.to_string())?;
        println!(
            "  {user}: total={} pending={} withdrawable={}",
            balance.total_credits, balance.pending_credits, balance.withdrawable_credits
        );
    }

    println!("== carol verifies and withdraws");
    directory.update("carol", |p| {
        p.email_verified = true;
        p.kyc_status = KycStatus::Verified;
    });
    // Top up past the minimum so the payout goes through.
    engine
        .record_adjustment("carol", 100, "demo-topup", "demo promotional credit")
        .map_err(|err| err.to_string())?;
    let receipt = engine
        .request_withdrawal(
            "carol",
            &WithdrawalRequest {
                amount: 100,
                method: WithdrawalMethod::Upi,
                account_details: "carol@bank".to_string(),
            },
        )
        .map_err(|err| err.to_string())?;
    println!(
        "  accepted={} ref={:?} txn={:?}",
        receipt.accepted, receipt.withdrawal_ref, receipt.provider_transaction_id
    );

    let (history, total) = engine
        .history("carol", 0, 50)
        .map_err(|err| err.to_string())?;
    println!("== carol's ledger ({total} entries, newest first)");
    for entry in history {
        println!(
            "  #{} {:>6} {:<22} {:<10} {}",
            entry.entry_id,
            entry.amount,
            entry.kind.as_str(),
            entry.status.as_str(),
            entry.source_ref_id
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                let sqlite_path = parse_sqlite_path(args.get(3));
                let store = match SqliteLedgerStore::open(&sqlite_path) {
                    Ok(store) => store,
                    Err(err) => {
                        eprintln!("error: failed to open {sqlite_path}: {err}");
                        std::process::exit(1);
                    }
                };

                let directory = InMemoryDirectory::new();
                let engine = RewardsEngine::new(
                    store,
                    PlatformConfig::default(),
                    TaskCatalog::stock(),
                    Box::new(SystemClock),
                    Box::new(directory.clone()),
                    Box::new(PrefixVerifier::default()),
                    Box::new(RecordingPayout::new()),
                );

                println!("serving credit ledger api on http://{addr} (sqlite: {sqlite_path})");
                if let Err(err) = serve(addr, engine, directory).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        },
        Some("demo") => {
            if let Err(err) = run_demo() {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
