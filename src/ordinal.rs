// Ordinal x-domain ordering

use crate::ir::XValue;
use crate::spec::{BinAgg, Direction, OrderBy};
use crate::split::XValueSums;
use indexmap::IndexSet;

/// Reorder an ordinal domain.
///
/// Without a policy, or with `BinAgg::None`, the first-seen order is kept.
/// `BinAgg::Sum` sorts by each value's accumulated sum; the direction flips
/// the comparison. Ties keep their first-seen order.
pub fn get_sorted_ordinal_x_values(
    x_values: IndexSet<XValue>,
    x_value_sums: &XValueSums,
    order_by: Option<&OrderBy>,
) -> IndexSet<XValue> {
    let Some(order_by) = order_by else {
        return x_values;
    };

    match order_by.bin_agg {
        BinAgg::None => x_values,
        BinAgg::Sum => {
            let mut sorted: Vec<(XValue, f64)> = x_values
                .into_iter()
                .map(|x| {
                    let sum = x_value_sums.get(&x).unwrap_or(0.0);
                    (x, sum)
                })
                .collect();
            sorted.sort_by(|(_, a), (_, b)| match order_by.direction {
                Direction::Ascending => a.total_cmp(b),
                Direction::Descending => b.total_cmp(a),
            });
            sorted.into_iter().map(|(x, _)| x).collect()
        }
    }
}
