/// quick start - cost one sale line
use erp_ledger_rs::{LineItemCalculator, Money, Rate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // sale of 1000 with 3% capital fee, 10% tax and 500 of merchandise
    let computed = LineItemCalculator::compute(
        Money::from_major(1_000),
        Rate::from_percentage(3),
        Rate::from_percentage(10),
        Money::from_major(500),
    );

    println!("capital fee: {}", computed.capital_fee_amount);
    println!("tax:         {}", computed.tax_amount);
    println!("total cost:  {}", computed.total_cost);
    println!("profit:      {} ({}%)", computed.profit_amount, computed.profit_percent);

    println!("{}", serde_json::to_string_pretty(&computed)?);

    Ok(())
}
