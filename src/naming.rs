// Display names for series

use crate::ir::SeriesIdentifier;
use crate::spec::{SeriesName, SeriesNameConfig, SeriesNameConfigOptions, SeriesSpec};

/// Delimiter between name fragments when none is configured
pub const DEFAULT_NAME_DELIMITER: &str = " - ";

/// Evaluate structured naming rules against an identifier.
///
/// Rules run in `sort_index` order (rules without one last, ties in their
/// given order). A rule yields a fragment when the identifier's split value
/// for `accessor` equals `value` (the fragment is `name`, else the value), or
/// when `accessor` is the identifier's y accessor (`name`, else the accessor).
/// Fragments are joined with the configured delimiter. `None` when nothing
/// matched.
pub fn get_series_name_from_options(
    options: &SeriesNameConfigOptions,
    identifier: &SeriesIdentifier,
    delimiter: &str,
) -> Option<String> {
    let names = options.names.as_ref()?;

    let mut rules: Vec<&SeriesNameConfig> = names.iter().collect();
    rules.sort_by_key(|rule| (rule.sort_index.is_none(), rule.sort_index));

    let fragments: Vec<String> = rules
        .into_iter()
        .filter_map(|rule| name_fragment(rule, identifier))
        .filter(|fragment| !fragment.is_empty())
        .collect();

    if fragments.is_empty() {
        return None;
    }
    Some(fragments.join(options.delimiter.as_deref().unwrap_or(delimiter)))
}

fn name_fragment(rule: &SeriesNameConfig, identifier: &SeriesIdentifier) -> Option<String> {
    let split_value = identifier.split_accessors.get(&rule.accessor);
    if let (Some(actual), Some(expected)) = (split_value, rule.value.as_ref()) {
        if actual == expected {
            return Some(rule.name.clone().unwrap_or_else(|| expected.to_string()));
        }
    }
    if identifier.y_accessor == rule.accessor {
        return Some(rule.name.clone().unwrap_or_else(|| rule.accessor.clone()));
    }
    None
}

/// Name of a series as shown in legends and tooltips.
///
/// A naming function on the spec wins when it returns a name, then the
/// structured options. Otherwise the identifier's series keys are joined:
/// all of them for multi-accessor specs, the split values only for single
/// accessor specs. With nothing to join the spec's own name (or id) is used.
pub fn get_series_name(
    identifier: &SeriesIdentifier,
    has_single_series: bool,
    is_tooltip: bool,
    spec: Option<&SeriesSpec>,
) -> String {
    let custom = spec.and_then(|s| match &s.name {
        Some(SeriesName::Func(f)) => f(identifier, is_tooltip),
        Some(SeriesName::Options(options)) => {
            get_series_name_from_options(options, identifier, DEFAULT_NAME_DELIMITER)
        }
        _ => None,
    });
    if let Some(name) = custom {
        return name;
    }

    let multiple_y_accessors = spec.is_some_and(|s| s.y_accessors.len() > 1);
    let name_keys = if multiple_y_accessors {
        &identifier.series_keys[..]
    } else {
        let keep = identifier.series_keys.len().saturating_sub(1);
        &identifier.series_keys[..keep]
    };

    if !name_keys.is_empty() && (spec.is_some() || !has_single_series) {
        return name_keys
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(DEFAULT_NAME_DELIMITER);
    }

    match spec {
        None => String::new(),
        Some(SeriesSpec {
            name: Some(SeriesName::Text(name)),
            ..
        }) => name.clone(),
        Some(s) => s.id.clone(),
    }
}
