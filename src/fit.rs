// Fit functions: imputing missing y1 values inside a series

use crate::ir::{DataSeriesDatum, XValue};
use crate::spec::{EndValue, FitConfig, FitFunction};
use indexmap::IndexSet;

/// Position of a datum along x: the numeric x when available, otherwise its
/// place in the domain, otherwise its place in the series.
fn position(datum: &DataSeriesDatum<'_>, index: usize, x_values: &IndexSet<XValue>) -> f64 {
    datum
        .x
        .as_f64()
        .or_else(|| x_values.get_index_of(&datum.x).map(|i| i as f64))
        .unwrap_or(index as f64)
}

struct Neighbour {
    position: f64,
    value: f64,
}

fn fit_value(
    fit: &FitConfig,
    here: f64,
    prev: Option<&Neighbour>,
    next: Option<&Neighbour>,
) -> Option<f64> {
    match fit.function {
        FitFunction::None => None,
        FitFunction::Zero => Some(0.0),
        FitFunction::Explicit => Some(fit.value.unwrap_or(0.0)),
        FitFunction::Carry => prev.map(|p| p.value),
        FitFunction::Lookahead => next.map(|n| n.value),
        FitFunction::Nearest => match (prev, next) {
            (Some(p), Some(n)) => {
                if (here - p.position).abs() <= (n.position - here).abs() {
                    Some(p.value)
                } else {
                    Some(n.value)
                }
            }
            (Some(p), None) => Some(p.value),
            (None, Some(n)) => Some(n.value),
            (None, None) => None,
        },
        FitFunction::Average => match (prev, next) {
            (Some(p), Some(n)) => Some((p.value + n.value) / 2.0),
            _ => None,
        },
        FitFunction::Linear => match (prev, next) {
            (Some(p), Some(n)) => {
                let span = n.position - p.position;
                if span == 0.0 {
                    Some(p.value)
                } else {
                    Some(p.value + (n.value - p.value) * (here - p.position) / span)
                }
            }
            _ => None,
        },
    }
}

fn end_value(end: Option<EndValue>, prev: Option<&Neighbour>, next: Option<&Neighbour>) -> Option<f64> {
    match end? {
        EndValue::Explicit(v) => Some(v),
        EndValue::Nearest => prev.or(next).map(|n| n.value),
    }
}

/// Fill null y1 values of a series (already ordered by x) per the fit policy.
///
/// Neighbours are the nearest points that had a value before fitting, so
/// filled values never feed further fills. Imputed values are recorded in
/// `filled.y1`; `initial_y1` is left alone.
pub fn fit_series(data: &mut [DataSeriesDatum<'_>], fit: &FitConfig, x_values: &IndexSet<XValue>) {
    if fit.function == FitFunction::None && fit.end_value.is_none() {
        return;
    }

    let known: Vec<Option<Neighbour>> = data
        .iter()
        .enumerate()
        .map(|(i, d)| {
            d.y1.map(|value| Neighbour {
                position: position(d, i, x_values),
                value,
            })
        })
        .collect();

    let mut prev_idx: Vec<Option<usize>> = Vec::with_capacity(data.len());
    let mut last = None;
    for (i, k) in known.iter().enumerate() {
        prev_idx.push(last);
        if k.is_some() {
            last = Some(i);
        }
    }
    let mut next_idx: Vec<Option<usize>> = vec![None; data.len()];
    let mut upcoming = None;
    for i in (0..data.len()).rev() {
        next_idx[i] = upcoming;
        if known[i].is_some() {
            upcoming = Some(i);
        }
    }

    for i in 0..data.len() {
        if known[i].is_some() {
            continue;
        }
        let prev = prev_idx[i].and_then(|p| known[p].as_ref());
        let next = next_idx[i].and_then(|n| known[n].as_ref());
        let here = position(&data[i], i, x_values);

        let value = fit_value(fit, here, prev, next).or_else(|| end_value(fit.end_value, prev, next));
        if let Some(value) = value {
            let datum = &mut data[i];
            datum.y1 = Some(value);
            datum.filled_mut().y1 = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[Option<f64>]) -> Vec<DataSeriesDatum<'static>> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DataSeriesDatum {
                x: XValue::number(i as f64),
                y1: *v,
                y0: None,
                initial_y1: *v,
                initial_y0: None,
                mark: None,
                filled: None,
                datum: None,
            })
            .collect()
    }

    fn fitted(values: &[Option<f64>], fit: FitConfig) -> Vec<Option<f64>> {
        let mut data = series(values);
        fit_series(&mut data, &fit, &IndexSet::new());
        data.iter().map(|d| d.y1).collect()
    }

    const GAPPY: [Option<f64>; 5] = [None, Some(1.0), None, Some(3.0), None];

    #[test]
    fn test_fit_none_leaves_gaps() {
        assert_eq!(fitted(&GAPPY, FitConfig::default()), GAPPY.to_vec());
    }

    #[test]
    fn test_fit_constant_policies() {
        assert_eq!(
            fitted(&GAPPY, FitConfig::new(FitFunction::Zero)),
            vec![Some(0.0), Some(1.0), Some(0.0), Some(3.0), Some(0.0)]
        );
        let explicit = FitConfig {
            function: FitFunction::Explicit,
            value: Some(9.0),
            end_value: None,
        };
        assert_eq!(
            fitted(&GAPPY, explicit),
            vec![Some(9.0), Some(1.0), Some(9.0), Some(3.0), Some(9.0)]
        );
    }

    #[test]
    fn test_fit_directional_policies() {
        assert_eq!(
            fitted(&GAPPY, FitConfig::new(FitFunction::Carry)),
            vec![None, Some(1.0), Some(1.0), Some(3.0), Some(3.0)]
        );
        assert_eq!(
            fitted(&GAPPY, FitConfig::new(FitFunction::Lookahead)),
            vec![Some(1.0), Some(1.0), Some(3.0), Some(3.0), None]
        );
        assert_eq!(
            fitted(&GAPPY, FitConfig::new(FitFunction::Nearest)),
            vec![Some(1.0), Some(1.0), Some(1.0), Some(3.0), Some(3.0)]
        );
    }

    #[test]
    fn test_fit_interior_policies_with_end_values() {
        assert_eq!(
            fitted(&GAPPY, FitConfig::new(FitFunction::Average)),
            vec![None, Some(1.0), Some(2.0), Some(3.0), None]
        );
        let linear = FitConfig {
            function: FitFunction::Linear,
            value: None,
            end_value: Some(EndValue::Nearest),
        };
        assert_eq!(
            fitted(&[Some(0.0), None, None, Some(3.0), None], linear),
            vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0), Some(3.0)]
        );
        let average = FitConfig {
            function: FitFunction::Average,
            value: None,
            end_value: Some(EndValue::Explicit(-1.0)),
        };
        assert_eq!(
            fitted(&GAPPY, average),
            vec![Some(-1.0), Some(1.0), Some(2.0), Some(3.0), Some(-1.0)]
        );
    }

    #[test]
    fn test_fit_marks_filled_values() {
        let mut data = series(&GAPPY);
        fit_series(&mut data, &FitConfig::new(FitFunction::Carry), &IndexSet::new());
        assert_eq!(data[2].filled.as_ref().and_then(|f| f.y1), Some(1.0));
        assert_eq!(data[2].initial_y1, None);
        assert!(data[1].filled.is_none());
        assert!(data[0].filled.is_none());
    }

    #[test]
    fn test_linear_uses_domain_position_for_ordinal_x() {
        let domain: IndexSet<XValue> = ["a", "b", "c", "d"].iter().map(|s| XValue::text(*s)).collect();
        let mut data = vec![
            DataSeriesDatum { x: XValue::text("a"), ..series(&[Some(0.0)]).remove(0) },
            DataSeriesDatum { x: XValue::text("c"), ..series(&[None]).remove(0) },
            DataSeriesDatum { x: XValue::text("d"), ..series(&[Some(3.0)]).remove(0) },
        ];
        fit_series(&mut data, &FitConfig::new(FitFunction::Linear), &domain);
        assert_eq!(data[1].y1, Some(2.0));
    }
}
