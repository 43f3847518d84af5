use rotalog::{LoggerBuilder, OutputMode, Severity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = LoggerBuilder::new("Demo App")
        .log_file_path("./logs/demoFile.log")
        .severity(Severity::Debug)
        .output_mode(OutputMode::FileAndConsole)
        .max_backup_count(10)
        .max_file_size_bytes(5 * 1024 * 1024)
        .build()?;

    logger.info("Demo Logger");
    logger.debug("Demo Logger");
    logger.warning("Demo Logger");
    logger.error("Demo Logger");
    logger.critical("Demo Logger");

    // Macros also record the calling function.
    rotalog::info!(logger, "Run again to see ./logs/demoFile.log archived as demoFile.log.1");

    Ok(())
}
