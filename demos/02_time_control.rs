/// time control - loan accrual with a controlled clock
use erp_ledger_rs::chrono::{Duration, NaiveDate, TimeZone, Utc};
use erp_ledger_rs::loans::portfolio;
use erp_ledger_rs::{LoanOrCreditLine, LoanView, Money, Rate, SafeTimeProvider, TimeSource, Uuid};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erp_ledger_rs=info".into()),
        )
        .init();

    println!("=== time control example ===\n");

    // create controlled time for testing
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    println!("starting date: {}", time.now().format("%Y-%m-%d"));

    let company = Uuid::new_v4();
    let mut loan = LoanOrCreditLine::builder()
        .company(company)
        .counterparty("João")
        .description("capital de giro")
        .principal(Money::from_major(1_000))
        .monthly_rate(Rate::from_percentage(2))
        .build_with_time(&time)?;

    // advance three months
    controller.advance(Duration::days(91));
    let today = time.now().date_naive();
    let position = loan.accrue(today).rounded();
    println!("\nadvanced to: {}", today);
    println!("balance with interest: {}", position.balance_with_interest);
    println!("interest accrued:      {}", position.interest_accrued);

    // partial payment, then another four months
    loan.add_payment(today, Money::from_major(400))?;
    controller.advance(Duration::days(122));
    let today = time.now().date_naive();
    println!("\nadvanced to: {} (after paying 400)", today);
    println!("{}", LoanView::from_loan(&loan, today).to_json_pretty()?);

    let totals = portfolio::totals_now([&loan], &time).rounded();
    println!("\nportfolio pending interest: {}", totals.pending_interest);

    let end = NaiveDate::from_ymd_opt(2025, 1, 10).ok_or("bad date")?;
    println!("projected on {}: {}", end, loan.accrue(end).rounded().balance_with_interest);

    Ok(())
}
