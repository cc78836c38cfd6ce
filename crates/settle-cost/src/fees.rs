//! MSP fee split.
//!
//! The vendor's non-custom-charge usage is the fee base `x`:
//!
//! - `m2 = x * 20%` is the fee invoiced to the end customer
//! - `m1` is the fee paid upstream: a flat floor below the threshold, 5% above
//! - `entity_usage_amount = m2 - m1` is kept by the intermediary (may be negative)

use crate::models::{CostSummary, MspFeeBreakdown};
use serde::{Deserialize, Serialize};

/// Invoice-side fee rate applied to the fee base.
pub const MSP_INVOICE_RATE: f64 = 0.20;

/// Resale-side fee rate above the floor threshold.
pub const MSP_RESALE_RATE: f64 = 0.05;

/// Fee bases strictly below this amount pay the floor fee.
pub const MSP_FLOOR_THRESHOLD_USD: f64 = 20_000.0;

/// Resale-side floor fee in USD.
pub const MSP_FLOOR_FEE_USD: f64 = 1_000.0;

/// Compute the fee split for a non-custom-charge amount.
pub fn compute_msp_fees(non_custom_charge_usd: f64) -> MspFeeBreakdown {
    let x = non_custom_charge_usd;
    let m2 = x * MSP_INVOICE_RATE;
    let m1 = if x < MSP_FLOOR_THRESHOLD_USD {
        MSP_FLOOR_FEE_USD
    } else {
        x * MSP_RESALE_RATE
    };

    MspFeeBreakdown {
        m2,
        m1,
        entity_usage_amount: m2 - m1,
    }
}

/// Input total minus resale total.
pub fn cross_stream_delta(input: &CostSummary, resale: &CostSummary) -> f64 {
    input.total_cost_usd - resale.total_cost_usd
}

/// Settlement figures derived from both streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub input_total_usd: f64,
    pub resale_total_usd: f64,
    /// Fee base taken from the input stream
    pub fee_base_usd: f64,
    pub fees: MspFeeBreakdown,
    pub cross_stream_delta: f64,
}

impl Settlement {
    /// Derive fees and delta; fees are based on the input stream.
    pub fn from_summaries(input: &CostSummary, resale: &CostSummary) -> Self {
        Self {
            input_total_usd: input.total_cost_usd,
            resale_total_usd: resale.total_cost_usd,
            fee_base_usd: input.non_custom_charge_usd,
            fees: compute_msp_fees(input.non_custom_charge_usd),
            cross_stream_delta: cross_stream_delta(input, resale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_below_threshold_pays_floor() {
        let fees = compute_msp_fees(100.0);
        assert_eq!(fees.m2, 20.0);
        assert_eq!(fees.m1, 1000.0);
        assert_eq!(fees.entity_usage_amount, -980.0);
    }

    #[test]
    fn test_threshold_boundary() {
        let below = compute_msp_fees(19_999.99);
        assert_eq!(below.m1, MSP_FLOOR_FEE_USD);

        // At the threshold both branches give 1000
        let at = compute_msp_fees(20_000.0);
        assert!((at.m1 - 1000.0).abs() < EPS);
        assert!((at.m2 - 4000.0).abs() < EPS);

        let above = compute_msp_fees(20_000.01);
        assert!((above.m1 - 1000.0005).abs() < EPS);
    }

    #[test]
    fn test_large_base() {
        let fees = compute_msp_fees(100_000.0);
        assert!((fees.m2 - 20_000.0).abs() < EPS);
        assert!((fees.m1 - 5_000.0).abs() < EPS);
        assert!((fees.entity_usage_amount - 15_000.0).abs() < EPS);
    }

    #[test]
    fn test_identities() {
        for x in [0.0, 1.0, 999.5, 19_999.0, 20_000.0, 54_321.77, -250.0] {
            let fees = compute_msp_fees(x);
            assert!((fees.m2 - x * MSP_INVOICE_RATE).abs() < EPS);
            assert!((fees.entity_usage_amount - (fees.m2 - fees.m1)).abs() < EPS);
        }
    }

    #[test]
    fn test_zero_and_negative_bases_pay_floor() {
        assert_eq!(compute_msp_fees(0.0).m1, MSP_FLOOR_FEE_USD);
        assert_eq!(compute_msp_fees(-50.0).m1, MSP_FLOOR_FEE_USD);
    }

    #[test]
    fn test_settlement_from_summaries() {
        let input = CostSummary {
            total_cost_usd: 120.0,
            custom_charge_usd: 20.0,
            non_custom_charge_usd: 100.0,
            ..Default::default()
        };
        let resale = CostSummary {
            total_cost_usd: 40.0,
            non_custom_charge_usd: 40.0,
            ..Default::default()
        };

        let settlement = Settlement::from_summaries(&input, &resale);

        assert_eq!(settlement.fee_base_usd, 100.0);
        assert_eq!(settlement.fees.m2, 20.0);
        assert_eq!(settlement.fees.entity_usage_amount, -980.0);
        assert_eq!(settlement.cross_stream_delta, 80.0);
        assert_eq!(cross_stream_delta(&resale, &input), -80.0);
    }
}
