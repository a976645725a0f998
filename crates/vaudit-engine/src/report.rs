//! Report sinks.
//!
//! Checks push every [`CheckResult`] to a [`ReportSink`]; the sink decides
//! presentation. Two formats are provided, selected once at startup:
//! a human-readable block format and a row-oriented CSV format.

use std::io::{self, Write};

use vaudit_model::CheckResult;

/// Fallback width when the output is not a terminal.
const DEFAULT_TRUNCATE_WIDTH: usize = 180;

/// Output formats for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Human,
    Csv,
}

/// Presentation options shared by the formats.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Truncate long lines to the terminal width.
    pub truncate: bool,
}

/// Receives the result stream of a check run.
///
/// `head` is called exactly once per run, before the first result; runs
/// covering several resources share one sink and one header.
pub trait ReportSink {
    fn head(&mut self) -> io::Result<()>;
    fn write(&mut self, result: &CheckResult) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Build the sink for the selected format.
pub fn create_sink(
    format: ReportFormat,
    out: Box<dyn Write>,
    options: &ReportOptions,
) -> Box<dyn ReportSink> {
    match format {
        ReportFormat::Human => Box::new(HumanReport::new(out, options)),
        ReportFormat::Csv => Box::new(CsvReport::new(out)),
    }
}

fn terminal_width() -> usize {
    let (_, cols) = console::Term::stdout().size();
    if cols == 0 {
        DEFAULT_TRUNCATE_WIDTH
    } else {
        cols as usize
    }
}

/// Block format for reading at a terminal.
pub struct HumanReport {
    out: Box<dyn Write>,
    truncate_width: Option<usize>,
}

impl HumanReport {
    pub fn new(out: Box<dyn Write>, options: &ReportOptions) -> Self {
        Self {
            out,
            truncate_width: options.truncate.then(terminal_width),
        }
    }

    fn emit(&mut self, line: &str) -> io::Result<()> {
        match self.truncate_width {
            Some(width) if line.chars().count() > width => {
                let cut: String = line.chars().take(width).collect();
                writeln!(self.out, "{cut}")
            }
            _ => writeln!(self.out, "{line}"),
        }
    }
}

impl ReportSink for HumanReport {
    fn head(&mut self) -> io::Result<()> {
        let line = "[Status] Object path => Physical path".to_string();
        self.emit(&line)
    }

    fn write(&mut self, result: &CheckResult) -> io::Result<()> {
        self.emit(&format!(
            "[{}] {} {} => {}",
            result.status, result.kind, result.logical_path, result.physical_path
        ))?;
        if result.resource.is_some() || result.replica_health.is_some() {
            let resource = result.resource.as_deref().unwrap_or("-");
            let health = result
                .replica_health
                .map(|h| h.as_str())
                .unwrap_or("N/A");
            self.emit(&format!("    resource: {resource}, replica: {health}"))?;
        }
        for (key, value) in result.observed.pairs() {
            self.emit(&format!("    {key}: {value}"))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Row-oriented format for post-processing.
pub struct CsvReport {
    out: Box<dyn Write>,
}

impl CsvReport {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }
}

/// Quote a field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl ReportSink for CsvReport {
    fn head(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "kind,status,logical_path,physical_path,resource,replica_health,\
             expected_filesize,observed_filesize,expected_checksum,observed_checksum"
        )
    }

    fn write(&mut self, result: &CheckResult) -> io::Result<()> {
        let observed = &result.observed;
        let row = [
            result.kind.as_str().to_string(),
            result.status.as_str().to_string(),
            csv_field(&result.logical_path),
            csv_field(&result.physical_path),
            csv_field(result.resource.as_deref().unwrap_or("")),
            result
                .replica_health
                .map(|h| h.as_str())
                .unwrap_or("N/A")
                .to_string(),
            observed
                .expected_filesize
                .map(|v| v.to_string())
                .unwrap_or_default(),
            observed
                .observed_filesize
                .map(|v| v.to_string())
                .unwrap_or_default(),
            csv_field(observed.expected_checksum.as_deref().unwrap_or("")),
            csv_field(observed.observed_checksum.as_deref().unwrap_or("")),
        ];
        writeln!(self.out, "{}", row.join(","))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use vaudit_model::{ObjectKind, ObservedValues, ReplicaHealth, Status};

    /// Writer handle that keeps the buffer inspectable after the sink
    /// takes ownership of the `Box<dyn Write>`.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn mismatch_result() -> CheckResult {
        CheckResult {
            kind: ObjectKind::DataObject,
            logical_path: "/tempZone/home/alice/a.bin".to_string(),
            physical_path: "/vault/home/alice/a.bin".to_string(),
            status: Status::FileSizeMismatch,
            replica_health: Some(ReplicaHealth::GoodReplica),
            observed: ObservedValues {
                expected_filesize: Some(50),
                observed_filesize: Some(40),
                expected_checksum: None,
                observed_checksum: None,
            },
            resource: Some("leafResc".to_string()),
        }
    }

    #[test]
    fn human_blocks_carry_status_and_observations() {
        let buf = SharedBuf::default();
        let mut sink = HumanReport::new(Box::new(buf.clone()), &ReportOptions::default());
        sink.head().unwrap();
        sink.write(&mismatch_result()).unwrap();
        sink.flush().unwrap();

        let output = buf.contents();
        assert!(output.starts_with("[Status] Object path => Physical path\n"));
        assert!(output.contains(
            "[FILE_SIZE_MISMATCH] dataobject /tempZone/home/alice/a.bin => /vault/home/alice/a.bin"
        ));
        assert!(output.contains("resource: leafResc, replica: GOOD_REPLICA"));
        assert!(output.contains("expected_filesize: 50"));
        assert!(output.contains("observed_filesize: 40"));
    }

    #[test]
    fn csv_rows_have_a_header_and_stable_columns() {
        let buf = SharedBuf::default();
        let mut sink = CsvReport::new(Box::new(buf.clone()));
        sink.head().unwrap();
        sink.write(&mismatch_result()).unwrap();

        let output = buf.contents();
        let mut lines = output.lines();
        assert!(lines.next().unwrap().starts_with("kind,status,logical_path"));
        assert_eq!(
            lines.next().unwrap(),
            "dataobject,FILE_SIZE_MISMATCH,/tempZone/home/alice/a.bin,\
             /vault/home/alice/a.bin,leafResc,GOOD_REPLICA,50,40,,"
        );
    }

    #[test]
    fn csv_quotes_fields_with_separators() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("has,comma"), "\"has,comma\"");
        assert_eq!(csv_field("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn collections_render_without_replica_details() {
        let buf = SharedBuf::default();
        let mut sink = HumanReport::new(Box::new(buf.clone()), &ReportOptions::default());
        let mut result = CheckResult::bare(
            ObjectKind::Collection,
            "/tempZone/home",
            "/vault/home",
            Status::Ok,
        );
        result.resource = Some("leafResc".to_string());
        sink.write(&result).unwrap();

        let output = buf.contents();
        assert!(output.contains("[OK] collection /tempZone/home => /vault/home"));
        assert!(output.contains("replica: N/A"));
        assert!(!output.contains("expected_filesize"));
    }
}
