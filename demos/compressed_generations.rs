use rotalog::{Compression, LoggerBuilder, OutputMode, Severity};

/// Compression rate depends heavily on the log pattern.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = LoggerBuilder::new("compressed")
        .log_file_path("./logs/compression/gzip.log")
        .output_mode(OutputMode::FileOnly)
        .severity(Severity::Info)
        .max_file_size_bytes(1024 * 1024)
        .max_backup_count(2)
        .compression(Compression::Gzip)
        .build()?;

    for i in 1..=35_000 {
        rotalog::info!(logger, "Log entry #{i}: This is a sample log message that will contribute to file size");
    }

    println!("File | Bytes");
    for entry in std::fs::read_dir("./logs/compression")?.flatten() {
        println!("{:?} : {:?} Bytes", entry.file_name(), entry.metadata().map_or(0, |m| m.len()));
    }

    Ok(())
}
