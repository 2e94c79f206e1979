//! Shared deal bundle and the steps every deal-level calculation starts with.

use serde::{Deserialize, Serialize};

use crate::debt::amortization::{resolve_debt_service, DebtService};
use crate::error::ProFormaError;
use crate::market::MarketConditions;
use crate::operating::expenses::{operating_statement_for, OperatingInput, OperatingStatement};
use crate::operating::income::IncomeSource;
use crate::settings::AnalysisSettings;
use crate::types::{DealInputs, FinanceType, LoanTerms, OperatingAssumptions};
use crate::ProFormaResult;

/// Everything the Analyze workspace collects for one deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysisInput {
    pub deal: DealInputs,
    /// Absent for all-cash purchases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanTerms>,
    pub income: IncomeSource,
    pub operating: OperatingAssumptions,
    #[serde(default)]
    pub market: MarketConditions,
}

/// Validated operating statement and debt service for a deal.
#[derive(Debug, Clone)]
pub(crate) struct PreparedDeal {
    pub statement: OperatingStatement,
    pub debt: DebtService,
    pub market: MarketConditions,
}

pub(crate) fn prepare_deal(
    input: &DealAnalysisInput,
    settings: &AnalysisSettings,
    warnings: &mut Vec<String>,
) -> ProFormaResult<PreparedDeal> {
    settings.validate()?;
    input.deal.validate()?;

    let operating_input = OperatingInput {
        income: input.income.clone(),
        operation_type: input.deal.operation_type,
        property_type: input.deal.property_type,
        operating: input.operating.clone(),
    };
    let statement = operating_statement_for(&operating_input, settings.expense_basis, warnings)?;

    let principal = input.deal.loan_amount();
    let debt = match (&input.loan, principal.is_zero()) {
        (_, true) => DebtService::none(),
        (Some(terms), false) => resolve_debt_service(principal, terms, warnings)?,
        (None, false) => {
            return Err(ProFormaError::invalid(
                "loan",
                "Loan terms are required when the down payment is below the purchase price",
            ));
        }
    };

    if input.deal.finance_type == FinanceType::Cash && !principal.is_zero() {
        warnings.push(format!(
            "Finance type is Cash but {principal:.2} is financed; using the loan terms given"
        ));
    }

    Ok(PreparedDeal {
        statement,
        debt,
        market: input.market.sanitized(warnings),
    })
}

#[cfg(all(feature = "returns", feature = "risk"))]
pub use one_shot::{analyze_deal, DealAnalysisOutput, DealAnalysisRequest, RiskAssessment};

#[cfg(all(feature = "returns", feature = "risk"))]
mod one_shot {
    use serde::{Deserialize, Serialize};
    use std::time::Instant;

    use super::{prepare_deal, DealAnalysisInput};
    use crate::debt::amortization::DebtService;
    use crate::operating::expenses::OperatingStatement;
    use crate::returns::metrics::{metrics_for, ReturnMetricsBundle};
    use crate::risk::property_age::PropertyAgeFactors;
    use crate::risk::scoring::{score_risk, RiskFactors, RiskScoreInput, RiskScoreResult};
    use crate::settings::AnalysisSettings;
    use crate::types::{with_metadata, ComputationOutput};
    use crate::ProFormaResult;

    /// Risk inputs scored against the deal's own market conditions.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RiskAssessment {
        pub factors: RiskFactors,
        #[serde(default)]
        pub property_age: PropertyAgeFactors,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DealAnalysisRequest {
        #[serde(flatten)]
        pub input: DealAnalysisInput,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub risk: Option<RiskAssessment>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DealAnalysisOutput {
        pub statement: OperatingStatement,
        pub debt_service: DebtService,
        pub metrics: ReturnMetricsBundle,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub risk: Option<RiskScoreResult>,
    }

    /// Income, expenses, return metrics and (when factors are given) the risk
    /// score for one deal in a single pass.
    pub fn analyze_deal(
        request: &DealAnalysisRequest,
        settings: &AnalysisSettings,
    ) -> ProFormaResult<ComputationOutput<DealAnalysisOutput>> {
        let start = Instant::now();
        let mut warnings: Vec<String> = Vec::new();
        tracing::debug!(
            purchase_price = %request.input.deal.purchase_price,
            with_risk = request.risk.is_some(),
            "analyzing deal"
        );

        let prepared = prepare_deal(&request.input, settings, &mut warnings)?;
        let metrics = metrics_for(&request.input.deal, &prepared, settings, &mut warnings)?;
        let risk = request.risk.as_ref().map(|assessment| {
            let risk_input = RiskScoreInput {
                factors: assessment.factors.clone(),
                market: prepared.market.clone(),
                property_age: assessment.property_age.clone(),
            };
            score_risk(&risk_input, settings, &mut warnings)
        });

        let output = DealAnalysisOutput {
            statement: prepared.statement,
            debt_service: prepared.debt,
            metrics,
            risk,
        };

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Full Deal Analysis (operating statement, return metrics, risk score)",
            request,
            warnings,
            elapsed,
            output,
        ))
    }
}
