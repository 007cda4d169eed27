use crate::Result;
use chrono::NaiveDate;
use ohno::IntoAppError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A date-indexed table of daily counts with one or more value columns.
///
/// Rows are kept in a `BTreeMap` so the dates are always in ascending
/// order, which is what every consumer of the CSV output expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySeries {
    index_name: String,
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<u64>>,
}

impl DailySeries {
    /// Build a single-column series by bucketing per-date counts.
    #[must_use]
    pub fn from_counts(index_name: &str, column: &str, counts: BTreeMap<NaiveDate, u64>) -> Self {
        Self {
            index_name: index_name.to_string(),
            columns: vec![column.to_string()],
            rows: counts.into_iter().map(|(date, count)| (date, vec![count])).collect(),
        }
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Rename the date index, used when a series indexed by one event kind
    /// (e.g. `commit_date`) becomes a general date-indexed table.
    pub fn rename_index(&mut self, name: &str) {
        self.index_name = name.to_string();
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The values for one date, if present.
    #[must_use]
    pub fn row(&self, date: NaiveDate) -> Option<&[u64]> {
        self.rows.get(&date).map(Vec::as_slice)
    }

    /// Insert a zero-valued row for every calendar day missing between the
    /// first and last date, so the series covers a contiguous range. A day
    /// without activity is a real observation of zero, not a gap.
    pub fn fill_calendar(&mut self) {
        let (Some(&first), Some(&last)) = (self.rows.keys().next(), self.rows.keys().next_back()) else {
            return;
        };

        let zeros = vec![0; self.columns.len()];
        let mut day = first;
        while day < last {
            let _ = self.rows.entry(day).or_insert_with(|| zeros.clone());
            let Some(next) = day.succ_opt() else {
                break;
            };
            day = next;
        }
    }

    /// Outer-join two series on their date index. The result carries the
    /// union of dates and both column sets; a date absent from one side
    /// gets zeros for that side's columns. The joined index is renamed to
    /// the neutral "date" since the inputs index different event kinds.
    #[must_use]
    pub fn outer_join(&self, other: &Self) -> Self {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let left_width = self.columns.len();
        let right_width = other.columns.len();

        let mut rows: BTreeMap<NaiveDate, Vec<u64>> = BTreeMap::new();

        for (&date, values) in &self.rows {
            let mut row = values.clone();
            row.resize(left_width + right_width, 0);
            let _ = rows.insert(date, row);
        }

        for (&date, values) in &other.rows {
            let row = rows.entry(date).or_insert_with(|| vec![0; left_width + right_width]);
            row[left_width..].copy_from_slice(values);
        }

        Self {
            index_name: "date".to_string(),
            columns,
            rows,
        }
    }

    /// Write the series as a CSV file, date index first. The file lands in
    /// a sibling temp file and is renamed into place.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&tmp_path).into_app_err_with(|| format!("unable to create '{}'", tmp_path.display()))?;

        let mut header = vec![self.index_name.clone()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (date, values) in &self.rows {
            let mut record = vec![date.format("%Y-%m-%d").to_string()];
            record.extend(values.iter().map(ToString::to_string));
            writer.write_record(&record)?;
        }

        writer.flush().into_app_err_with(|| format!("unable to flush '{}'", tmp_path.display()))?;
        drop(writer);

        fs::rename(&tmp_path, path).into_app_err_with(|| format!("unable to move '{}' into place", tmp_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(index: &str, column: &str, entries: &[(&str, u64)]) -> DailySeries {
        let counts = entries.iter().map(|&(d, n)| (date(d), n)).collect();
        DailySeries::from_counts(index, column, counts)
    }

    #[test]
    fn test_fill_calendar_inserts_zero_days() {
        let mut s = series("commit_date", "commit_count", &[("2024-01-01", 3), ("2024-01-04", 1)]);
        s.fill_calendar();

        assert_eq!(s.len(), 4);
        assert_eq!(s.row(date("2024-01-02")), Some(&[0][..]));
        assert_eq!(s.row(date("2024-01-03")), Some(&[0][..]));
        assert_eq!(s.row(date("2024-01-04")), Some(&[1][..]));
    }

    #[test]
    fn test_fill_calendar_on_empty_series() {
        let mut s = DailySeries::from_counts("commit_date", "commit_count", BTreeMap::new());
        s.fill_calendar();
        assert!(s.is_empty());
    }

    #[test]
    fn test_outer_join_zero_fills_missing_dates() {
        let left = series("forked_at", "forks_count", &[("2024-01-01", 2), ("2024-01-03", 1)]);
        let right = series("starred_at", "Stars_count", &[("2024-01-02", 5), ("2024-01-03", 7)]);

        let joined = left.outer_join(&right);

        assert_eq!(joined.index_name(), "date");
        assert_eq!(joined.columns(), &["forks_count".to_string(), "Stars_count".to_string()]);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.row(date("2024-01-01")), Some(&[2, 0][..]));
        assert_eq!(joined.row(date("2024-01-02")), Some(&[0, 5][..]));
        assert_eq!(joined.row(date("2024-01-03")), Some(&[1, 7][..]));
    }

    #[test]
    fn test_outer_join_chains_across_features() {
        let a = series("a", "col_a", &[("2024-01-01", 1)]);
        let b = series("b", "col_b", &[("2024-01-02", 2)]);
        let c = series("c", "col_c", &[("2024-01-01", 3)]);

        let joined = a.outer_join(&b).outer_join(&c);

        assert_eq!(joined.columns(), &["col_a".to_string(), "col_b".to_string(), "col_c".to_string()]);
        assert_eq!(joined.row(date("2024-01-01")), Some(&[1, 0, 3][..]));
        assert_eq!(joined.row(date("2024-01-02")), Some(&[0, 2, 0][..]));
    }

    #[test]
    fn test_write_csv() {
        let s = series("commit_date", "commit_count", &[("2024-01-01", 3), ("2024-01-02", 0)]);
        let path = std::env::temp_dir().join("repo_pulse_test_daily_series.csv");

        s.write_csv(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        assert!(text.starts_with("commit_date,commit_count\n"));
        assert!(text.contains("2024-01-01,3\n"));
        assert!(text.contains("2024-01-02,0\n"));
        assert!(!path.with_extension("csv.tmp").exists());

        let _ = fs::remove_file(&path);
    }
}
