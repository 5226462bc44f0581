use std::io::Write;

use serde::Serialize;

use super::domain::Payment;

#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    payment_id: u64,
    donator: &'a str,
    amount: String,
    comment: &'a str,
    date_added: String,
}

/// Write donations as CSV, one row per payment, in the order given.
pub fn write_payments_csv<W: Write>(payments: &[Payment], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for payment in payments {
        csv_writer.serialize(PaymentRow {
            payment_id: payment.id.0,
            donator: &payment.donator.username,
            amount: payment.amount.to_string(),
            comment: payment.comment.as_deref().unwrap_or_default(),
            date_added: payment.date_added.to_rfc3339(),
        })?;
    }
    if payments.is_empty() {
        csv_writer.write_record([
            "payment_id",
            "donator",
            "amount",
            "comment",
            "date_added",
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
