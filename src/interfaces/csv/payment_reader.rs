use crate::domain::validator::CreatePayment;
use crate::error::{PaymentError, Result};
use std::io::Read;

/// Reads payment creation requests from a CSV source.
///
/// Expects the header `title,description,category,amount,user_dni`. Fields are
/// trimmed and empty fields are read as absent, leaving it to the validator to
/// reject them.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<CreatePayment>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentCategory;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "title, description, category, amount, user_dni\n\
                    Licencia, Licencia 2025, federate, 10, 12345678A\n\
                    Cuota, Cuota anual, MEMBERSHIP, 35.5, 87654321B";
        let reader = PaymentReader::new(data.as_bytes());
        let results: Vec<Result<CreatePayment>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.title.as_deref(), Some("Licencia"));
        assert_eq!(first.category, Some(PaymentCategory::Federate));
        assert_eq!(first.amount, Some(dec!(10)));

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.category, Some(PaymentCategory::Membership));
        assert_eq!(second.amount, Some(dec!(35.5)));
        assert_eq!(second.user_dni.as_deref(), Some("87654321B"));
    }

    #[test]
    fn test_reader_empty_fields_are_absent() {
        let data = "title, description, category, amount, user_dni\n\
                    Cuota, , MEMBERSHIP, , 87654321B";
        let reader = PaymentReader::new(data.as_bytes());
        let request = reader.requests().next().unwrap().unwrap();

        assert_eq!(request.description, None);
        assert_eq!(request.amount, None);
    }

    #[test]
    fn test_reader_unknown_category() {
        let data = "title, description, category, amount, user_dni\n\
                    Donativo, Donativo, DONATION, 5, 87654321B";
        let reader = PaymentReader::new(data.as_bytes());
        let results: Vec<Result<CreatePayment>> = reader.requests().collect();

        assert!(results[0].is_err());
    }
}
