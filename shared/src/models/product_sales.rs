//! Product-wise sales over orders

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::percentage;
use crate::types::DateRange;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSalesFilters {
    /// Order dates to include; `None` covers every order
    pub date_range: Option<DateRange>,
}

/// One product sold at one price pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSalesRow {
    pub product_id: String,
    pub product_name: String,
    pub sell_price: Decimal,
    pub cost_price: Decimal,
    pub quantity: i64,
    pub return_quantity: i64,
    pub total_cartons: Decimal,
    pub return_cartons: Decimal,
    pub net_cartons: Decimal,
    pub total_amount: Decimal,
    pub return_amount: Decimal,
    pub net_amount: Decimal,
    /// Net amount less the cost of the units kept
    pub profit: Decimal,
    /// Profit as a percentage of net amount, 0 when nothing was kept
    pub profit_margin: Decimal,
}

impl ProductSalesRow {
    /// Fill the derived columns from the summed ones
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_id: String,
        product_name: String,
        sell_price: Decimal,
        cost_price: Decimal,
        quantity: i64,
        return_quantity: i64,
        total_cartons: Decimal,
        return_cartons: Decimal,
        total_amount: Decimal,
        return_amount: Decimal,
    ) -> Self {
        let net_amount = total_amount - return_amount;
        let kept = Decimal::from(quantity - return_quantity);
        let profit = net_amount - kept.saturating_mul(cost_price);
        Self {
            product_id,
            product_name,
            sell_price,
            cost_price,
            quantity,
            return_quantity,
            total_cartons,
            return_cartons,
            net_cartons: total_cartons - return_cartons,
            total_amount,
            return_amount,
            net_amount,
            profit,
            profit_margin: margin(profit, net_amount),
        }
    }
}

fn margin(profit: Decimal, net_amount: Decimal) -> Decimal {
    if net_amount > Decimal::ZERO {
        percentage(profit, net_amount)
    } else {
        Decimal::ZERO
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductSalesSummary {
    pub total_cartons: Decimal,
    pub total_return_cartons: Decimal,
    pub total_net_cartons: Decimal,
    pub total_amount: Decimal,
    pub total_return_amount: Decimal,
    pub total_net_amount: Decimal,
    pub total_profit: Decimal,
    pub overall_profit_margin: Decimal,
}

impl ProductSalesSummary {
    pub fn from_rows(rows: &[ProductSalesRow]) -> Self {
        let mut summary = rows.iter().fold(Self::default(), |mut acc, row| {
            acc.total_cartons += row.total_cartons;
            acc.total_return_cartons += row.return_cartons;
            acc.total_net_cartons += row.net_cartons;
            acc.total_amount += row.total_amount;
            acc.total_return_amount += row.return_amount;
            acc.total_net_amount += row.net_amount;
            acc.total_profit += row.profit;
            acc
        });
        summary.overall_profit_margin = margin(summary.total_profit, summary.total_net_amount);
        summary
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductSalesReport {
    pub rows: Vec<ProductSalesRow>,
    pub summary: ProductSalesSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i64, returned: i64, cost: i64, sell: i64) -> ProductSalesRow {
        let (cost, sell) = (Decimal::from(cost), Decimal::from(sell));
        ProductSalesRow::new(
            "p1".to_string(),
            "P1".to_string(),
            sell,
            cost,
            quantity,
            returned,
            Decimal::from(quantity) / Decimal::from(24),
            Decimal::from(returned) / Decimal::from(24),
            Decimal::from(quantity) * sell,
            Decimal::from(returned) * sell,
        )
    }

    #[test]
    fn profit_counts_only_kept_units() {
        let r = row(48, 24, 100, 150);
        assert_eq!(r.net_amount, Decimal::from(3600));
        assert_eq!(r.net_cartons, Decimal::ONE);
        assert_eq!(r.profit, Decimal::from(1200));
        assert_eq!(r.profit_margin.round_dp(2), Decimal::new(3333, 2));
    }

    #[test]
    fn fully_returned_line_has_no_margin() {
        let r = row(24, 24, 100, 150);
        assert_eq!(r.net_amount, Decimal::ZERO);
        assert_eq!(r.profit, Decimal::ZERO);
        assert_eq!(r.profit_margin, Decimal::ZERO);
    }

    #[test]
    fn summary_adds_rows() {
        let summary = ProductSalesSummary::from_rows(&[row(48, 24, 100, 150), row(24, 0, 100, 150)]);
        assert_eq!(summary.total_amount, Decimal::from(10_800));
        assert_eq!(summary.total_return_amount, Decimal::from(3_600));
        assert_eq!(summary.total_net_amount, Decimal::from(7_200));
        assert_eq!(summary.total_profit, Decimal::from(2_400));
        assert_eq!(summary.total_net_cartons, Decimal::from(2));
        assert_eq!(ProductSalesSummary::from_rows(&[]), ProductSalesSummary::default());
    }
}
