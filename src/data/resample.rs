//! Fixed-bucket mean resampling.
//!
//! Rows are tagged with their bucket number and averaged with a polars
//! group-by; buckets no row falls into stay `None`.

use super::{DataError, Table};
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use polars::prelude::{self as pl, IntoLazy, NamedFrom};

const BUCKET_COLUMN: &str = "__bucket";

/// Per-bucket sensor means. `None` marks a bucket with no samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub bucket: TimeDelta,
    pub buckets: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Vec<Option<f64>>)>,
}

impl Resampled {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Average every sensor over consecutive epoch-aligned buckets.
///
/// Buckets run from the one containing the first timestamp to the one
/// containing the last, so gaps in the data show up as `None`.
pub fn resample_mean(table: &Table, bucket: TimeDelta) -> Result<Resampled, DataError> {
    let width = bucket.num_seconds();
    if width <= 0 {
        return Err(DataError::InvalidParameter(format!(
            "resample bucket must be at least one second, got {bucket}"
        )));
    }

    let Some((first, last)) = table.time_range() else {
        return Ok(Resampled {
            bucket,
            buckets: Vec::new(),
            columns: table.sensor_names().into_iter().map(|n| (n, Vec::new())).collect(),
        });
    };

    let floor = |t: NaiveDateTime| t.and_utc().timestamp().div_euclid(width) * width;
    let origin = floor(first);
    let n_buckets = usize::try_from((floor(last) - origin) / width + 1).unwrap_or(0);

    let bucket_ids: Vec<i64> = table
        .index()
        .iter()
        .map(|t| (floor(*t) - origin) / width)
        .collect();

    let mut frame_columns: Vec<pl::Column> = Vec::with_capacity(table.sensors().len() + 1);
    frame_columns.push(pl::Series::new(BUCKET_COLUMN.into(), bucket_ids).into());
    for s in table.sensors() {
        frame_columns.push(pl::Series::new(s.name.as_str().into(), s.values.as_slice()).into());
    }
    let means: Vec<pl::Expr> = table
        .sensors()
        .iter()
        .map(|s| pl::col(s.name.as_str()).mean())
        .collect();
    let grouped = pl::DataFrame::new(frame_columns)?
        .lazy()
        .group_by([pl::col(BUCKET_COLUMN)])
        .agg(means)
        .collect()?;

    let ids = grouped.column(BUCKET_COLUMN)?.as_materialized_series().i64()?;
    let columns = table
        .sensors()
        .iter()
        .map(|s| {
            let group_means = grouped.column(&s.name)?.as_materialized_series().f64()?;
            let mut values = vec![None; n_buckets];
            for (id, mean) in ids.into_iter().zip(group_means) {
                let slot = id
                    .and_then(|b| usize::try_from(b).ok())
                    .and_then(|b| values.get_mut(b));
                if let Some(slot) = slot {
                    *slot = mean;
                }
            }
            Ok((s.name.clone(), values))
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    let buckets = (0..n_buckets)
        .filter_map(|i| {
            let secs = origin + width * i64::try_from(i).ok()?;
            DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
        })
        .collect();

    Ok(Resampled {
        bucket,
        buckets,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Series;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 7, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn hourly_means_with_gap() {
        let table = Table::from_parts(
            "Time",
            vec![at(0, 10), at(0, 50), at(2, 5)],
            vec![Series {
                name: "Tp".into(),
                values: vec![1.0, 3.0, 10.0],
            }],
            "EVENT",
            vec![false; 3],
        )
        .unwrap();

        let r = resample_mean(&table, TimeDelta::minutes(60)).unwrap();
        assert_eq!(r.buckets, vec![at(0, 0), at(1, 0), at(2, 0)]);
        assert_eq!(r.columns[0].1, vec![Some(2.0), None, Some(10.0)]);
    }

    #[test]
    fn bucket_means_follow_time_not_row_order() {
        let table = Table::from_parts(
            "Time",
            vec![at(0, 0), at(0, 10), at(0, 20), at(0, 30), at(0, 40)],
            vec![
                Series { name: "Tp".into(), values: vec![1.0, 2.0, 3.0, 4.0, 5.0] },
                Series { name: "pH".into(), values: vec![8.0, 8.0, 7.0, 7.0, 9.0] },
            ],
            "EVENT",
            vec![false; 5],
        )
        .unwrap();

        let r = resample_mean(&table, TimeDelta::minutes(20)).unwrap();
        assert_eq!(r.buckets, vec![at(0, 0), at(0, 20), at(0, 40)]);
        assert_eq!(r.columns[0], ("Tp".to_string(), vec![Some(1.5), Some(3.5), Some(5.0)]));
        assert_eq!(r.columns[1].1, vec![Some(8.0), Some(7.0), Some(9.0)]);
    }

    #[test]
    fn rejects_sub_second_bucket() {
        let table = Table::from_parts("Time", vec![], vec![], "EVENT", vec![]).unwrap();
        assert!(resample_mean(&table, TimeDelta::zero()).is_err());
    }
}
