use crate::domain::payment::PaymentRecord;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Serialize)]
struct PaymentRow<'a> {
    id: String,
    title: &'a str,
    description: &'a str,
    category: &'static str,
    amount: String,
    state: String,
    user_dni: &'a str,
    created_at: String,
    paid_at: String,
}

impl<'a> From<&'a PaymentRecord> for PaymentRow<'a> {
    fn from(record: &'a PaymentRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: &record.title,
            description: &record.description,
            category: record.category.as_str(),
            amount: record.amount.normalize().to_string(),
            state: record.state.to_string(),
            user_dni: &record.user_dni,
            created_at: record.created_at.format(TIMESTAMP_FORMAT).to_string(),
            paid_at: record
                .paid_at
                .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Writes payment records as CSV, header first.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a PaymentRecord>,
    {
        let mut empty = true;
        for record in records {
            self.writer.serialize(PaymentRow::from(record))?;
            empty = false;
        }
        if empty {
            self.write_header()?;
        }
        self.writer.flush()?;
        Ok(())
    }

    // serde only emits the header with the first row
    fn write_header(&mut self) -> Result<()> {
        self.writer.write_record([
            "id",
            "title",
            "description",
            "category",
            "amount",
            "state",
            "user_dni",
            "created_at",
            "paid_at",
        ])?;
        Ok(())
    }
}
