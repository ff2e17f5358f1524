// src/output.rs
use crate::mc::aggregator::SwaptionPrice;
use crate::models::swaption::SwaptionParams;
use bitflags::bitflags;
use std::fs::File;
use std::io::{self, Write};

bitflags! {
    /// Optional columns of the price CSV; `id` and `strike` are always written.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReportColumns: u32 {
        const PRICE         = 1 << 0;
        const STD_ERROR     = 1 << 1;
        const CONFIDENCE_95 = 1 << 2;
        const TRIALS        = 1 << 3;
    }
}

impl Default for ReportColumns {
    fn default() -> Self {
        ReportColumns::PRICE | ReportColumns::STD_ERROR
    }
}

/// `Swaption{i}: [SwaptionPrice: {mean} StdError: {stderr}]`, ten decimals.
pub fn format_price_line(index: usize, price: &SwaptionPrice) -> String {
    format!(
        "Swaption{}: [SwaptionPrice: {:.10} StdError: {:.10}]",
        index, price.mean, price.std_error
    )
}

pub fn write_price_lines<W: Write>(out: &mut W, prices: &[SwaptionPrice]) -> io::Result<()> {
    for (i, price) in prices.iter().enumerate() {
        writeln!(out, "{}", format_price_line(i, price))?;
    }
    Ok(())
}

fn csv_header(columns: ReportColumns) -> String {
    let mut header = vec!["id", "strike", "kind"];
    if columns.contains(ReportColumns::PRICE) {
        header.push("price");
    }
    if columns.contains(ReportColumns::STD_ERROR) {
        header.push("std_error");
    }
    if columns.contains(ReportColumns::CONFIDENCE_95) {
        header.extend(["ci95_low", "ci95_high"]);
    }
    if columns.contains(ReportColumns::TRIALS) {
        header.push("trials");
    }
    header.join(",")
}

fn csv_row(params: &SwaptionParams, price: &SwaptionPrice, columns: ReportColumns) -> String {
    let mut row = vec![
        params.id.to_string(),
        params.strike.to_string(),
        format!("{:?}", params.kind).to_lowercase(),
    ];
    if columns.contains(ReportColumns::PRICE) {
        row.push(price.mean.to_string());
    }
    if columns.contains(ReportColumns::STD_ERROR) {
        row.push(price.std_error.to_string());
    }
    if columns.contains(ReportColumns::CONFIDENCE_95) {
        let (lo, hi) = price
            .confidence_interval(0.95)
            .unwrap_or((f64::NAN, f64::NAN));
        row.push(lo.to_string());
        row.push(hi.to_string());
    }
    if columns.contains(ReportColumns::TRIALS) {
        row.push(price.trials.to_string());
    }
    row.join(",")
}

/// Write one row per swaption, preceded by a `# generated <timestamp>` line.
pub fn write_prices<W: Write>(
    out: &mut W,
    swaptions: &[SwaptionParams],
    prices: &[SwaptionPrice],
    columns: ReportColumns,
) -> io::Result<()> {
    if swaptions.len() != prices.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} swaptions but {} prices",
                swaptions.len(),
                prices.len()
            ),
        ));
    }
    writeln!(out, "# generated {}", chrono::Local::now().to_rfc3339())?;
    writeln!(out, "{}", csv_header(columns))?;
    for (params, price) in swaptions.iter().zip(prices) {
        writeln!(out, "{}", csv_row(params, price, columns))?;
    }
    Ok(())
}

pub fn write_prices_to_csv(
    filename: &str,
    swaptions: &[SwaptionParams],
    prices: &[SwaptionPrice],
    columns: ReportColumns,
) -> io::Result<()> {
    let mut file = File::create(filename)?;
    write_prices(&mut file, swaptions, prices, columns)
}

pub fn write_summary_to_csv(filename: &str, summary_data: &[(&str, &str)]) -> io::Result<()> {
    let mut file = File::create(filename)?;
    for (key, value) in summary_data {
        writeln!(file, "{},{}", key, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price() -> SwaptionPrice {
        SwaptionPrice {
            mean: 0.0123456789012,
            std_error: 0.0004,
            trials: 1000,
        }
    }

    #[test]
    fn test_price_line_format() {
        assert_eq!(
            format_price_line(3, &price()),
            "Swaption3: [SwaptionPrice: 0.0123456789 StdError: 0.0004000000]"
        );
    }

    #[test]
    fn test_price_lines_one_per_swaption() {
        let mut buf = Vec::new();
        write_price_lines(&mut buf, &[price(), price()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Swaption0: "));
    }

    #[test]
    fn test_csv_columns_follow_flags() {
        let swaptions = vec![SwaptionParams::reference(0, 0.05)];
        let mut buf = Vec::new();
        let columns = ReportColumns::PRICE | ReportColumns::TRIALS;
        write_prices(&mut buf, &swaptions, &[price()], columns).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("# generated "));
        assert_eq!(lines[1], "id,strike,kind,price,trials");
        assert_eq!(lines[2], "0,0.05,receiver,0.0123456789012,1000");

        let mut buf = Vec::new();
        write_prices(&mut buf, &swaptions, &[price()], ReportColumns::all()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(2).unwrap().split(',').count(), 8);
    }

    #[test]
    fn test_csv_rejects_length_mismatch() {
        let swaptions = vec![SwaptionParams::reference(0, 0.05)];
        let mut buf = Vec::new();
        assert!(write_prices(&mut buf, &swaptions, &[], ReportColumns::default()).is_err());
    }
}
