// Library exports for gramseries

pub mod accessor;
pub mod data;
pub mod ir;
pub mod spec;

// Pipeline phases
pub mod extract;
pub mod series_key;
pub mod split;
pub mod aggregate;
pub mod ordinal;
pub mod fit;
pub mod stack;
pub mod naming;
pub mod palette;
pub mod legend;
pub mod transform;

pub use accessor::{Accessor, AccessorError, AccessorValue};
pub use data::{records_from_csv, records_from_json};
pub use ir::{DataSeries, DataSeriesDatum, ScalarValue, SeriesIdentifier, SeriesKey, XValue};
pub use spec::{ChartConfig, SeriesSpec, StackMode};
pub use transform::{apply_transformations, SeriesModel};
