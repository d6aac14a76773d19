/// settlement - close an acerto and persist it atomically
use erp_ledger_rs::chrono::{NaiveDate, TimeZone, Utc};
use erp_ledger_rs::{
    Allocation, Expense, LedgerConfig, LedgerStore, MemoryStore, Money, Participant, Rate,
    SafeTimeProvider, SaleLine, SaleLineInput, Settlement, SettlementView, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erp_ledger_rs=debug".into()),
        )
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap(),
    ));
    let company = Uuid::new_v4();
    let config = LedgerConfig::for_company(company);
    let store = MemoryStore::new();

    let ana = Participant::new("Ana").with_default_share(Rate::from_percentage(60));
    let bruno = Participant::new("Bruno").with_default_share(Rate::from_percentage(40));

    // seed the month's sales and expenses
    let june = |day| NaiveDate::from_ymd_opt(2024, 6, day).ok_or("bad date");
    for (day, value, cost) in [(3, 1_000, 500), (17, 500, 305)] {
        let input = SaleLineInput::new(
            Money::from_major(value),
            Rate::from_percentage(3),
            Rate::from_percentage(10),
            Money::from_major(cost),
        );
        let line = SaleLine::new(company, june(day)?, input, &time).with_client("Farmácia Central");
        store.insert_line(company, line)?;
    }
    store.insert_expense(company, Expense::shared(company, "aluguel", Money::from_major(50))?)?;
    store.insert_expense(
        company,
        Expense::individual(company, "combustível", Money::from_major(20), ana.id)?,
    )?;

    // build the settlement from what is still open
    let mut settlement = Settlement::open(company, june(30)?, &time).with_title("Acerto de junho");
    for line in store.unsettled_lines(company, None)? {
        settlement.include_line(&line)?;
    }
    for expense in store.pending_expenses(company)? {
        settlement.add_expense(expense)?;
    }
    settlement.set_allocations(
        vec![
            Allocation::new(ana.id, Rate::from_percentage(60)),
            Allocation::new(bruno.id, Rate::from_percentage(40)),
        ],
        &config,
    )?;

    let commit = settlement.close(&store.lines(company)?, &config, &time)?;
    store.commit_settlement(company, &commit)?;

    for distribution in settlement.distributions() {
        let name = if distribution.participant_id == ana.id { &ana.name } else { &bruno.name };
        println!(
            "{}: gross {} - individual {} = {}",
            name, distribution.gross_share, distribution.individual_deduction, distribution.net_payout
        );
    }

    let stored = store.settlement(company, settlement.id)?;
    println!("{}", SettlementView::from_settlement(&stored).to_json_pretty()?);
    println!("lines left to settle: {}", store.unsettled_lines(company, None)?.len());

    Ok(())
}
