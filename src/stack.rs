// Stacking and fitting of series over the shared x domain

use crate::fit::fit_series;
use crate::ir::{DataSeries, DataSeriesDatum, ScalarValue, XValue};
use crate::spec::StackMode;
use indexmap::{IndexMap, IndexSet};

/// Sort every series' data by the position of its x in the final domain.
/// Points with equal x keep their record order.
pub fn sort_series_data(series: &mut [DataSeries<'_>], x_values: &IndexSet<XValue>) {
    for s in series.iter_mut() {
        s.data
            .sort_by_key(|d| x_values.get_index_of(&d.x).unwrap_or(usize::MAX));
    }
}

/// Rebuild a series so it has exactly one point per domain value, in domain
/// order. Missing x values become filler points; when a series has several
/// points at one x, the first one is kept.
fn align_to_domain(data: &mut Vec<DataSeriesDatum<'_>>, x_values: &IndexSet<XValue>) {
    let mut by_x = IndexMap::with_capacity(data.len());
    for datum in data.drain(..) {
        by_x.entry(datum.x.clone()).or_insert(datum);
    }
    data.extend(x_values.iter().map(|x| {
        by_x.swap_remove(x)
            .unwrap_or_else(|| DataSeriesDatum::filler(x.clone()))
    }));
}

/// d3 `stackOffsetWiggle` baseline for each x position
fn wiggle_baseline(values: &[Vec<f64>], n_x: usize) -> Vec<f64> {
    let mut baseline = vec![0.0; n_x];
    if n_x == 0 {
        return baseline;
    }
    let mut y = 0.0;
    for j in 1..n_x {
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        for (i, series) in values.iter().enumerate() {
            let sij0 = series[j];
            let sij1 = series[j - 1];
            let mut s3 = (sij0 - sij1) / 2.0;
            for below in &values[..i] {
                s3 += below[j] - below[j - 1];
            }
            s1 += sij0;
            s2 += s3 * sij0;
        }
        baseline[j - 1] = y;
        if s1 != 0.0 {
            y -= s2 / s1;
        }
    }
    baseline[n_x - 1] = y;
    baseline
}

/// Compute (lower, upper) bands for each series and x position.
///
/// `values[i][j]` is the y1 of series `i` at x `j` (null as 0), `lows[i][j]`
/// its y0 (0 for series without a baseline accessor). Every mode shares one
/// running sum per x; modes differ only in the baseline and the scaling.
fn compute_stack(values: &[Vec<f64>], lows: &[Vec<f64>], mode: StackMode) -> Vec<Vec<(f64, f64)>> {
    let n_x = values.first().map_or(0, Vec::len);
    let mut bands = vec![vec![(0.0, 0.0); n_x]; values.len()];

    let totals: Vec<f64> = (0..n_x).map(|j| values.iter().map(|s| s[j]).sum()).collect();
    let baseline = match mode {
        StackMode::Silhouette => totals.iter().map(|t| -t / 2.0).collect(),
        StackMode::Wiggle => wiggle_baseline(values, n_x),
        _ => vec![0.0; n_x],
    };

    for j in 0..n_x {
        let mut acc = baseline[j];
        for (i, series) in values.iter().enumerate() {
            bands[i][j] = (acc + lows[i][j], acc + series[j]);
            acc += series[j];
        }
        if mode == StackMode::Percentage && totals[j] != 0.0 {
            let scale = 1.0 / totals[j].abs();
            for band in bands.iter_mut() {
                band[j] = (band[j].0 * scale, band[j].1 * scale);
            }
        }
    }
    bands
}

fn stack_group(series: &mut [DataSeries<'_>], members: &[usize], x_values: &IndexSet<XValue>) {
    for &i in members {
        let s = &mut series[i];
        align_to_domain(&mut s.data, x_values);
        fit_series(&mut s.data, &s.spec.fit, x_values);
    }

    let mode = series[members[0]].stack_mode;
    let values: Vec<Vec<f64>> = members
        .iter()
        .map(|&i| series[i].data.iter().map(|d| d.y1.unwrap_or(0.0)).collect())
        .collect();
    let lows: Vec<Vec<f64>> = members
        .iter()
        .map(|&i| series[i].data.iter().map(|d| d.y0.unwrap_or(0.0)).collect())
        .collect();

    let bands = compute_stack(&values, &lows, mode);
    for (m, &i) in members.iter().enumerate() {
        for (datum, &(y0, y1)) in series[i].data.iter_mut().zip(&bands[m]) {
            datum.y0 = Some(y0);
            datum.y1 = datum.y1.map(|_| y1);
        }
    }
}

type StackGroupKey = (Option<ScalarValue>, Option<ScalarValue>, String);

/// Apply fitting to every series and stacking to stacked ones.
///
/// Input series must already be sorted by x (see [`sort_series_data`]).
/// Stacked series are grouped by (horizontal panel, vertical panel, group
/// id); each group uses the stack mode of its first series. Non-stacked
/// series only get their fit function. Series order is preserved.
pub fn format_data_series<'a>(
    mut series: Vec<DataSeries<'a>>,
    x_values: &IndexSet<XValue>,
) -> Vec<DataSeries<'a>> {
    let mut groups: IndexMap<StackGroupKey, Vec<usize>> = IndexMap::new();

    for (i, s) in series.iter_mut().enumerate() {
        if s.is_stacked {
            let key = (
                s.identifier.sm_h_accessor_value.clone(),
                s.identifier.sm_v_accessor_value.clone(),
                s.identifier.group_id.clone(),
            );
            groups.entry(key).or_default().push(i);
        } else {
            fit_series(&mut s.data, &s.spec.fit, x_values);
        }
    }

    for members in groups.values() {
        stack_group(&mut series, members, x_values);
    }

    tracing::debug!(
        series = series.len(),
        stack_groups = groups.len(),
        "formatted data series"
    );

    series
}
