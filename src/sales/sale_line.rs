use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::types::{CompanyId, PaymentStatus, SaleLineId, SettlementId};

use super::line_item::{LineItemCalculator, SaleLineComputed, SaleLineInput};

/// one row of the sales ledger.
///
/// The derived figures are private and only ever produced by
/// [`LineItemCalculator`]; deserializing a line recomputes them from its
/// inputs instead of trusting stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSaleLine")]
pub struct SaleLine {
    pub id: SaleLineId,
    pub company_id: CompanyId,
    pub order_date: NaiveDate,
    pub order_number: Option<String>,
    pub dispensation_number: Option<String>,
    pub client: Option<String>,
    pub product: Option<String>,
    pub modality: Option<String>,
    input: SaleLineInput,
    computed: SaleLineComputed,
    pub received_date: Option<NaiveDate>,
    pub payment_status: PaymentStatus,
    settlement_id: Option<SettlementId>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// serialized shape of a sale line; `computed` is ignored on the way in
#[derive(Deserialize)]
struct StoredSaleLine {
    id: SaleLineId,
    company_id: CompanyId,
    order_date: NaiveDate,
    #[serde(default)]
    order_number: Option<String>,
    #[serde(default)]
    dispensation_number: Option<String>,
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    modality: Option<String>,
    input: SaleLineInput,
    #[serde(default)]
    received_date: Option<NaiveDate>,
    #[serde(default)]
    payment_status: PaymentStatus,
    #[serde(default)]
    settlement_id: Option<SettlementId>,
    #[serde(default)]
    color: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<StoredSaleLine> for SaleLine {
    fn from(stored: StoredSaleLine) -> Self {
        SaleLine {
            id: stored.id,
            company_id: stored.company_id,
            order_date: stored.order_date,
            order_number: stored.order_number,
            dispensation_number: stored.dispensation_number,
            client: stored.client,
            product: stored.product,
            modality: stored.modality,
            computed: LineItemCalculator::compute_input(&stored.input),
            input: stored.input,
            received_date: stored.received_date,
            payment_status: stored.payment_status,
            settlement_id: stored.settlement_id,
            color: stored.color,
            created_at: stored.created_at,
        }
    }
}

/// enumerated update of a sale line; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleLinePatch {
    pub sale_value: Option<Money>,
    pub capital_rate: Option<Rate>,
    pub tax_rate: Option<Rate>,
    pub merchandise_cost: Option<Money>,
    pub order_date: Option<NaiveDate>,
    pub order_number: Option<String>,
    pub dispensation_number: Option<String>,
    pub client: Option<String>,
    pub product: Option<String>,
    pub modality: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    /// `Some(None)` clears the received date
    pub received_date: Option<Option<NaiveDate>>,
    /// `Some(None)` clears the color tag
    pub color: Option<Option<String>>,
}

impl SaleLinePatch {
    /// whether the patch changes any figure the settlement depends on
    pub fn touches_financials(&self) -> bool {
        self.sale_value.is_some()
            || self.capital_rate.is_some()
            || self.tax_rate.is_some()
            || self.merchandise_cost.is_some()
            || self.order_date.is_some()
    }
}

impl SaleLine {
    /// create a new, unsettled sale line
    pub fn new(
        company_id: CompanyId,
        order_date: NaiveDate,
        input: SaleLineInput,
        time_provider: &SafeTimeProvider,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            order_date,
            order_number: None,
            dispensation_number: None,
            client: None,
            product: None,
            modality: None,
            computed: LineItemCalculator::compute_input(&input),
            input,
            received_date: None,
            payment_status: PaymentStatus::Pending,
            settlement_id: None,
            color: None,
            created_at: time_provider.now(),
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn with_order_number(mut self, order_number: impl Into<String>) -> Self {
        self.order_number = Some(order_number.into());
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    pub fn input(&self) -> &SaleLineInput {
        &self.input
    }

    pub fn computed(&self) -> &SaleLineComputed {
        &self.computed
    }

    pub fn sale_value(&self) -> Money {
        self.computed.sale_value
    }

    pub fn tax_amount(&self) -> Money {
        self.computed.tax_amount
    }

    pub fn profit_amount(&self) -> Money {
        self.computed.profit_amount
    }

    pub fn settlement_id(&self) -> Option<SettlementId> {
        self.settlement_id
    }

    pub fn is_settled(&self) -> bool {
        self.settlement_id.is_some()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Apply a patch, recomputing every derived figure when an input moved.
    ///
    /// Financial fields of a settled line are frozen; descriptive fields,
    /// payment status and color stay editable.
    pub fn apply_patch(&mut self, patch: SaleLinePatch, events: &mut EventStore) -> Result<()> {
        if patch.touches_financials() {
            if let Some(settlement_id) = self.settlement_id {
                return Err(LedgerError::SaleLineSettled {
                    id: self.id,
                    settlement_id,
                });
            }
        }

        let mut recompute = false;
        if let Some(sale_value) = patch.sale_value {
            self.input.sale_value = sale_value;
            recompute = true;
        }
        if let Some(capital_rate) = patch.capital_rate {
            self.input.capital_rate = capital_rate;
            recompute = true;
        }
        if let Some(tax_rate) = patch.tax_rate {
            self.input.tax_rate = tax_rate;
            recompute = true;
        }
        if let Some(merchandise_cost) = patch.merchandise_cost {
            self.input.merchandise_cost = merchandise_cost;
            recompute = true;
        }
        if let Some(order_date) = patch.order_date {
            self.order_date = order_date;
        }
        if let Some(order_number) = patch.order_number {
            self.order_number = Some(order_number);
        }
        if let Some(dispensation_number) = patch.dispensation_number {
            self.dispensation_number = Some(dispensation_number);
        }
        if let Some(client) = patch.client {
            self.client = Some(client);
        }
        if let Some(product) = patch.product {
            self.product = Some(product);
        }
        if let Some(modality) = patch.modality {
            self.modality = Some(modality);
        }
        if let Some(payment_status) = patch.payment_status {
            self.payment_status = payment_status;
        }
        if let Some(received_date) = patch.received_date {
            self.received_date = received_date;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }

        if recompute {
            self.computed = LineItemCalculator::compute_input(&self.input);
            tracing::debug!(
                line_id = %self.id,
                profit = %self.computed.profit_amount,
                "sale line recomputed"
            );
            events.emit(Event::SaleLineRecomputed {
                line_id: self.id,
                profit_amount: self.computed.profit_amount,
                total_cost: self.computed.total_cost,
            });
        }

        Ok(())
    }

    /// mark as consumed by a settlement
    pub fn mark_settled(&mut self, settlement_id: SettlementId) -> Result<()> {
        match self.settlement_id {
            Some(existing) if existing != settlement_id => Err(LedgerError::SaleLineSettled {
                id: self.id,
                settlement_id: existing,
            }),
            _ => {
                self.settlement_id = Some(settlement_id);
                Ok(())
            }
        }
    }

    /// return to the unsettled pool; the line must belong to `settlement_id`
    pub fn clear_settlement(&mut self, settlement_id: SettlementId) -> Result<()> {
        if self.settlement_id != Some(settlement_id) {
            return Err(LedgerError::InconsistentState {
                message: format!(
                    "sale line {} is not marked with settlement {}",
                    self.id, settlement_id
                ),
            });
        }
        self.settlement_id = None;
        Ok(())
    }
}
