use anyhow::Result;
#[cfg(not(feature = "with-serde"))]
use anyhow::bail;

use smtp_probe::ProbeReport;

use crate::args::Format;

/// Exit codes: 0 accepted, 2 probe failed, 1 usage/fatal.
pub fn exit_code(report: &ProbeReport) -> i32 {
    if report.success { 0 } else { 2 }
}

/// Human output is streamed while the probe runs; only JSON is written here.
pub fn write_report(report: &ProbeReport, format: Format) -> Result<()> {
    match format {
        Format::Human => Ok(()),
        Format::Json => write_json(report),
    }
}

#[cfg(feature = "with-serde")]
fn write_json(report: &ProbeReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &ProbeReport) -> Result<()> {
    ensure_supported(Format::Json)
}

/// Fails before any network activity when the format cannot be produced.
pub fn ensure_supported(format: Format) -> Result<()> {
    #[cfg(not(feature = "with-serde"))]
    if format == Format::Json {
        bail!("format=json nécessite la feature 'with-serde'");
    }
    let _ = format;
    Ok(())
}
