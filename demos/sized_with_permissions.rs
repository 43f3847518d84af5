use rotalog::{RotatingFileSinkBuilder, RotationSize, Severity, Sink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = RotatingFileSinkBuilder::new("./logs/sized.log")
        .max_file_size(RotationSize::KB(64)) // Rotate at 64KB
        .max_backup_count(5) // Keep only last 5 files
        .file_mode(0o640) // Set file permissions to: owner rw, group r, others none
        .build()?;

    // Simulate writing logs that will trigger size-based rotation
    for i in 1..=5000 {
        sink.append(
            Severity::Info,
            &format!("Log entry #{i}: This is a sample log message that will contribute to file size"),
        )?;
    }

    for generation in sink.generations()? {
        println!("{}", generation.display());
    }

    Ok(())
}
