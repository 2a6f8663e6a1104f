//! Train / validation / test preparation.

use super::{prepare_time_series, DataError, PrepareOptions, RawFrame, Table};
use tracing::info;

/// A dataset divided into its evaluation splits.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplits<T> {
    pub train: T,
    pub validation: Option<T>,
    pub test: T,
}

impl<T> DatasetSplits<T> {
    /// Apply a fallible transform to every split.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<DatasetSplits<U>, E> {
        Ok(DatasetSplits {
            train: f(self.train)?,
            validation: self.validation.map(&mut f).transpose()?,
            test: f(self.test)?,
        })
    }
}

/// Load one year of a drift-task dataset through `loader` and prepare each
/// split with the same options.
pub fn load_and_prepare_dataset<F>(
    loader: F,
    year: i32,
    opts: &PrepareOptions,
) -> Result<DatasetSplits<Table>, DataError>
where
    F: FnOnce(i32) -> Result<DatasetSplits<RawFrame>, DataError>,
{
    let raw = loader(year)?;
    let prepared = raw.try_map(|frame| prepare_time_series(&frame, opts))?;

    info!(
        year,
        train = prepared.train.len(),
        validation = prepared.validation.as_ref().map_or(0, Table::len),
        test = prepared.test.len(),
        "Dataset splits prepared"
    );
    Ok(prepared)
}
