use std::fs::File;
use std::io::Error;
use std::path::Path;

#[allow(dead_code)]
pub const HEADER: [&str; 5] = ["title", "description", "category", "amount", "user_dni"];

/// Writes `rows` valid payment requests spread over `members` members.
#[allow(dead_code)]
pub fn generate_payments_csv(path: &Path, rows: usize, members: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;

    for i in 1..=rows {
        let title = format!("Cuota {i}");
        let dni = format!("{:08}X", i % members);
        wtr.write_record([
            title.as_str(),
            "Cuota mensual",
            "MEMBERSHIP",
            "12.5",
            dni.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Extracts the payment ids from the CSV printed by the binary.
#[allow(dead_code)]
pub fn ids_from_output(stdout: &[u8]) -> Vec<String> {
    let mut reader = csv::Reader::from_reader(stdout);
    reader
        .records()
        .map(|record| record.expect("Failed to read output record")[0].to_string())
        .collect()
}
