//! GeoNames dump parsing.
//!
//! The dump is tab separated, UTF-8, without header and without quoting.
//! Each line has 19 positional fields, see
//! <http://download.geonames.org/export/dump/readme.txt>.

use std::io::Read;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};

use toponym::GeoRecord;

pub const FIELD_COUNT: usize = 19;

/// Streaming reader yielding one parsed record per dump line
pub struct DumpReader<R: Read> {
    inner: csv::Reader<R>,
    line: StringRecord,
}

impl<R: Read> DumpReader<R> {
    pub fn new(reader: R) -> Self {
        let inner = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_reader(reader);

        Self {
            inner,
            line: StringRecord::new(),
        }
    }

    /// Read the next record.
    ///
    /// `Ok(None)` at end of input; `Err` for a malformed line, after which
    /// reading can continue with the following line.
    pub fn next_record(&mut self) -> Result<Option<GeoRecord>> {
        if !self.inner.read_record(&mut self.line)? {
            return Ok(None);
        }

        let line_no = self.line.position().map(|p| p.line()).unwrap_or(0);
        parse_fields(&self.line)
            .map(Some)
            .with_context(|| format!("Malformed dump line {}", line_no))
    }
}

impl<R: Read> Iterator for DumpReader<R> {
    type Item = Result<GeoRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Parse one line already split into fields
pub fn parse_fields(fields: &StringRecord) -> Result<GeoRecord> {
    if fields.len() != FIELD_COUNT {
        bail!("expected {} fields, found {}", FIELD_COUNT, fields.len());
    }

    let field = |i: usize| fields.get(i).unwrap_or("").trim();

    let geonameid = field(0)
        .parse::<u64>()
        .with_context(|| format!("invalid geonameid '{}'", field(0)))?;
    let latitude = field(4)
        .parse::<f64>()
        .with_context(|| format!("invalid latitude '{}'", field(4)))?;
    let longitude = field(5)
        .parse::<f64>()
        .with_context(|| format!("invalid longitude '{}'", field(5)))?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        bail!("coordinates out of range ({}, {})", latitude, longitude);
    }

    let modification_date = NaiveDate::parse_from_str(field(18), "%Y-%m-%d")
        .with_context(|| format!("invalid modification date '{}'", field(18)))?;

    Ok(GeoRecord {
        geonameid,
        name: field(1).to_string(),
        asciiname: field(2).to_string(),
        alternatenames: split_list(field(3)),
        latitude,
        longitude,
        feature_class: field(6).to_string(),
        feature_code: field(7).to_string(),
        country_code: field(8).to_string(),
        cc2: split_list(field(9)),
        admin1_code: field(10).to_string(),
        admin2_code: field(11).to_string(),
        admin3_code: field(12).to_string(),
        admin4_code: field(13).to_string(),
        population: optional_number(field(14), "population")?,
        elevation: optional_number(field(15), "elevation")?,
        dem: optional_number(field(16), "dem")?,
        timezone: field(17).to_string(),
        modification_date,
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Empty numeric fields are absent, not zero
fn optional_number<T>(value: &str, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .with_context(|| format!("invalid {} '{}'", name, value))
}
