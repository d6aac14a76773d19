/// vale ledger - store credit with a hidden overdraft
use erp_ledger_rs::chrono::{TimeZone, Utc};
use erp_ledger_rs::{
    Event, Money, SafeTimeProvider, TimeSource, Uuid, ValeBalancePolicy, ValeMovement, ValeLedger,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erp_ledger_rs=warn".into()),
        )
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    ));
    let company = Uuid::new_v4();
    let client = Uuid::new_v4();
    let mut ledger = ValeLedger::new(company, ValeBalancePolicy::ClampAtZero);

    ledger.record(ValeMovement::credit(company, client, Money::from_major(100), Some("troca"), &time))?;
    let shown = ledger.record(ValeMovement::debit(company, client, Money::from_major(150), None, &time))?;

    println!("displayed balance: {}", shown);
    println!("signed balance:    {}", ledger.signed_balance(client));

    for event in ledger.events.take_events() {
        if let Event::ValeOverdrawn { masked_amount, .. } = event {
            println!("overdraft hidden by the display policy: {}", masked_amount);
        }
    }

    Ok(())
}
