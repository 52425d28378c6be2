//! # Bookkeeping CSV
//!
//! Renders a [`Ledger`] the way Swedish spreadsheet software opens it without
//! an import dialog: UTF-8 with BOM, `;` separators, decimal comma.
//!
//! ```text
//! Ordernummer;Datum;Kund;Produkter;Belopp exkl. moms (SEK);Moms 6% (SEK);…;Avgiftsstatus
//! a1b2c3d4;2024-03-15;kund@example.se;Att bli till (1st);131,00;8,00;0,00;…;bekräftad
//!
//! TOTALT;;;;131,00;8,00;0,00;…;bekräftad
//! ```

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::accounting::{DateRange, FeeStatus, Ledger};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::VatRates;

const BOM: &[u8] = "\u{FEFF}".as_bytes();

fn fee_status_label(status: FeeStatus) -> &'static str {
    match status {
        FeeStatus::Settled => "bekräftad",
        FeeStatus::Pending => "väntar",
    }
}

fn amounts(values: [Money; 7]) -> impl Iterator<Item = String> {
    values.into_iter().map(|m| m.to_decimal_string())
}

/// Renders the ledger as CSV bytes.
///
/// Fields are quoted only when they contain the separator, a quote or a line
/// break. The totals row is preceded by one blank line.
pub fn render_csv(ledger: &Ledger, rates: &VatRates) -> CoreResult<Vec<u8>> {
    let header = [
        "Ordernummer".to_string(),
        "Datum".to_string(),
        "Kund".to_string(),
        "Produkter".to_string(),
        "Belopp exkl. moms (SEK)".to_string(),
        format!("Moms {} (SEK)", rates.reduced),
        format!("Moms {} (SEK)", rates.standard),
        "Total moms (SEK)".to_string(),
        "Belopp inkl. moms (SEK)".to_string(),
        "Avgift (SEK)".to_string(),
        "Nettoutbetalning (SEK)".to_string(),
        "Avgiftsstatus".to_string(),
    ];

    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(BOM.to_vec());

    writer.write_record(&header)?;

    for row in &ledger.rows {
        let mut fields = vec![
            row.order_number.clone(),
            row.date.format("%Y-%m-%d").to_string(),
            row.customer.clone(),
            row.products.clone(),
        ];
        fields.extend(amounts([
            row.amount_ex_tax,
            row.reduced_tax,
            row.standard_tax,
            row.total_tax,
            row.amount_inc_tax,
            row.processor_fee,
            row.net_payout,
        ]));
        fields.push(fee_status_label(row.fee_status).to_string());
        writer.write_record(&fields)?;
    }

    // bare newline between rows and totals, bypassing the record writer
    writer.flush().map_err(csv::Error::from)?;
    let mut buf = writer
        .into_inner()
        .map_err(|e| CoreError::Export(e.to_string()))?;
    buf.push(b'\n');
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(buf);

    let t = &ledger.totals;
    let mut totals = vec![
        "TOTALT".to_string(),
        String::new(),
        String::new(),
        String::new(),
    ];
    totals.extend(amounts([
        t.amount_ex_tax,
        t.reduced_tax,
        t.standard_tax,
        t.total_tax,
        t.amount_inc_tax,
        t.processor_fee,
        t.net_payout,
    ]));
    totals.push(if t.fees_pending == 0 {
        fee_status_label(FeeStatus::Settled).to_string()
    } else {
        format!("{} {}", t.fees_pending, fee_status_label(FeeStatus::Pending))
    });
    writer.write_record(&totals)?;

    writer
        .into_inner()
        .map_err(|e| CoreError::Export(e.to_string()))
}

/// `bokforing_{from}_till_{to}.csv` for a closed range, otherwise
/// `bokforing_{today}.csv`.
pub fn export_file_name(range: &DateRange, today: NaiveDate) -> String {
    match (range.from(), range.to()) {
        (Some(from), Some(to)) => format!("bokforing_{}_till_{}.csv", from, to),
        _ => format!("bokforing_{}.csv", today),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
