//! Sales report aggregation.
//!
//! Orders are partitioned by status. `total_orders` counts every order in
//! the window, while `total_revenue` leaves canceled orders out: canceled
//! money never arrived, but the cancellations are still reported on their
//! own line.

use serde::{Deserialize, Serialize};

use super::{OrderStatus, Price};

/// Count and revenue for one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFigures {
    /// Number of orders.
    pub orders: u32,
    /// Sum of order totals.
    pub revenue: Price,
}

impl StatusFigures {
    fn record(&mut self, total: Price) {
        self.orders += 1;
        self.revenue += total;
    }
}

/// Per-status breakdown plus headline totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportFigures {
    /// Orders in every status.
    pub total_orders: u32,
    /// Revenue of all non-canceled orders.
    pub total_revenue: Price,
    /// Orders awaiting confirmation.
    pub pending: StatusFigures,
    /// Orders being put together.
    pub processing: StatusFigures,
    /// Orders on their way to the customer.
    pub delivering: StatusFigures,
    /// Delivered orders.
    pub completed: StatusFigures,
    /// Canceled orders, kept out of `total_revenue`.
    pub canceled: StatusFigures,
}

impl ReportFigures {
    /// Aggregate `(status, total)` pairs.
    ///
    /// Returns `None` when there is nothing to aggregate, so callers can tell
    /// "no orders" apart from a report full of zeros.
    #[must_use]
    pub fn from_orders<I>(orders: I) -> Option<Self>
    where
        I: IntoIterator<Item = (OrderStatus, Price)>,
    {
        let mut figures = Self::default();
        for (status, total) in orders {
            figures.status_mut(status).record(total);
            figures.total_orders += 1;
            if status != OrderStatus::Canceled {
                figures.total_revenue += total;
            }
        }
        (figures.total_orders > 0).then_some(figures)
    }

    /// Figures for one status.
    #[must_use]
    pub const fn for_status(&self, status: OrderStatus) -> &StatusFigures {
        match status {
            OrderStatus::Pending => &self.pending,
            OrderStatus::Processing => &self.processing,
            OrderStatus::Delivering => &self.delivering,
            OrderStatus::Completed => &self.completed,
            OrderStatus::Canceled => &self.canceled,
        }
    }

    const fn status_mut(&mut self, status: OrderStatus) -> &mut StatusFigures {
        match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Processing => &mut self.processing,
            OrderStatus::Delivering => &mut self.delivering,
            OrderStatus::Completed => &mut self.completed,
            OrderStatus::Canceled => &mut self.canceled,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_window_yields_none() {
        assert_eq!(ReportFigures::from_orders(Vec::new()), None);
    }

    #[test]
    fn test_canceled_revenue_excluded_from_total() {
        let orders = vec![
            (OrderStatus::Completed, price("10")),
            (OrderStatus::Completed, price("20")),
            (OrderStatus::Completed, price("30")),
            (OrderStatus::Canceled, price("50")),
        ];
        let figures = ReportFigures::from_orders(orders).unwrap();

        assert_eq!(figures.completed.orders, 3);
        assert_eq!(figures.completed.revenue, price("60"));
        assert_eq!(figures.canceled.orders, 1);
        assert_eq!(figures.canceled.revenue, price("50"));
        assert_eq!(figures.total_orders, 4);
        assert_eq!(figures.total_revenue, price("60"));
    }

    #[test]
    fn test_figures_partition_orders() {
        let orders = vec![
            (OrderStatus::Pending, price("12.50")),
            (OrderStatus::Processing, price("7.25")),
            (OrderStatus::Delivering, price("3.00")),
            (OrderStatus::Pending, price("1.00")),
            (OrderStatus::Canceled, price("99.99")),
        ];
        let figures = ReportFigures::from_orders(orders).unwrap();

        let count: u32 = OrderStatus::ALL
            .iter()
            .map(|s| figures.for_status(*s).orders)
            .sum();
        let revenue: Price = OrderStatus::ALL
            .iter()
            .filter(|s| **s != OrderStatus::Canceled)
            .map(|s| figures.for_status(*s).revenue)
            .sum();

        assert_eq!(count, figures.total_orders);
        assert_eq!(revenue, figures.total_revenue);
        assert_eq!(figures.pending.orders, 2);
        assert_eq!(figures.pending.revenue, price("13.50"));
    }
}
