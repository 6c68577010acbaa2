use crate::error::ReportError;
use crate::report::record::{Dialect, PeakPower, PowerFigures, PowerRecord};
use crate::model::HierarchyTree;
use regex::{Captures, Regex};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Marker line that opens the hierarchy table. The line after it is a
/// separator and is discarded.
const SECTION_MARKER: &str = "Hierarchy";

/// Header words only Prime Power prints.
const PRIME_POWER_MARKERS: [&str; 2] = ["Glitch", "X-tran"];

// Capture:
// 1) indent: leading whitespace, two columns per hierarchy level
// 2) name: instance name
// 3) type: optional parenthesized module type
// 4) nums: whitespace-separated tokens that start with a digit
const RECORD_LINE_RE: &str =
    r"^(?P<indent>\s*)(?P<name>[^\s()]+)(?:\s+\((?P<type>[^)]*)\))?(?P<nums>(?:\s+\d\S*)+)\s*$";

// 68.9913 or 3.7858e-02
const NUMBER_RE: &str = r"^\d+\.\d+(?:[eE][-+]?\d+)?$";
const WINDOW_RE: &str = r"^(\d+\.\d+(?:[eE][-+]?\d+)?)-(\d+\.\d+(?:[eE][-+]?\d+)?)$";

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Records deeper than this (0 = top level) are dropped.
    pub max_depth: Option<usize>,
    /// Report skipped body lines.
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub records: usize,
    pub skipped_lines: usize,
    pub depth_limited: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedReport {
    pub tree: HierarchyTree,
    pub stats: ParseStats,
}

/// Parse a hierarchical power report from disk.
pub fn parse_report_file(path: &str, opts: &ParseOptions) -> Result<ParsedReport, ReportError> {
    let file = File::open(path).map_err(|source| ReportError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_report(BufReader::new(file), path, opts)
}

/// Parse a hierarchical power report from any line source. `source` names the
/// input in diagnostics.
pub fn parse_report<R: BufRead>(
    reader: R,
    source: &str,
    opts: &ParseOptions,
) -> Result<ParsedReport, ReportError> {
    let mut session = ParseSession::new(source, opts)?;
    let io_err = |source_err: std::io::Error| ReportError::Io {
        path: source.to_string(),
        source: source_err,
    };

    let mut lines = reader.lines().enumerate();
    while let Some((lineno, line)) = lines.next() {
        let lno = lineno + 1;
        let line = line.map_err(io_err)?;

        match session.section {
            Section::Seeking => {
                if session.seek(&line) {
                    match lines.next() {
                        Some((_, separator)) => {
                            separator.map_err(io_err)?;
                        }
                        None => {
                            return Err(ReportError::TruncatedSection {
                                path: source.to_string(),
                                line: lno,
                                marker: SECTION_MARKER,
                            });
                        }
                    }
                }
            }
            Section::InBody => session.body_line(lno, &line)?,
        }
    }

    session.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Seeking,
    InBody,
}

/// State for one pass over one report.
struct ParseSession<'a> {
    source: &'a str,
    opts: &'a ParseOptions,
    record_re: Regex,
    number_re: Regex,
    window_re: Regex,

    section: Section,
    dialect: Dialect,
    /// Instance names from the top level down to the last accepted record.
    hier_path: Vec<String>,
    prev_level: isize,
    tree: HierarchyTree,
    stats: ParseStats,
}

impl<'a> ParseSession<'a> {
    fn new(source: &'a str, opts: &'a ParseOptions) -> Result<Self, ReportError> {
        Ok(Self {
            source,
            opts,
            record_re: compile(RECORD_LINE_RE)?,
            number_re: compile(NUMBER_RE)?,
            window_re: compile(WINDOW_RE)?,
            section: Section::Seeking,
            dialect: Dialect::default(),
            hier_path: Vec::new(),
            prev_level: -1,
            tree: HierarchyTree::new(Dialect::default()),
            stats: ParseStats::default(),
        })
    }

    /// Header scan. Returns true when the section marker was found; the
    /// dialect is latched at that point.
    fn seek(&mut self, line: &str) -> bool {
        if PRIME_POWER_MARKERS.iter().any(|m| line.contains(m)) {
            self.dialect = Dialect::PrimePower;
        }
        if !line.contains(SECTION_MARKER) {
            return false;
        }

        log::debug!("{}: reading {} hierarchy table", self.source, self.dialect);
        self.section = Section::InBody;
        self.tree = HierarchyTree::new(self.dialect);
        true
    }

    fn body_line(&mut self, lno: usize, line: &str) -> Result<(), ReportError> {
        let Some(caps) = self.record_re.captures(line) else {
            self.skip(lno, line);
            return Ok(());
        };

        let Some(figures) = self.figures(&caps, lno, line)? else {
            self.skip(lno, line);
            return Ok(());
        };

        let indent = caps.name("indent").map_or(0, |m| m.as_str().len());
        let level = indent / 2;
        if self.opts.max_depth.is_some_and(|max| level > max) {
            self.stats.depth_limited += 1;
            return Ok(());
        }

        let instance_name = caps.name("name").map_or("", |m| m.as_str()).to_string();
        let type_name = caps.name("type").map_or("", |m| m.as_str()).to_string();

        let level = level as isize;
        if level > self.prev_level + 1 {
            return Err(ReportError::IndentJump {
                path: self.source.to_string(),
                line: lno,
                instance: instance_name,
                level: level as usize,
                previous: self.prev_level,
            });
        }
        if level > self.prev_level {
            self.hier_path.push(instance_name.clone());
        } else if level < self.prev_level {
            let keep = self.hier_path.len() - (self.prev_level - level) as usize;
            self.hier_path.truncate(keep);
        }
        if let Some(last) = self.hier_path.last_mut() {
            *last = instance_name.clone();
        }

        let record = PowerRecord {
            instance_name,
            type_name,
            figures,
        };
        log::trace!("{}:{}: {}", self.source, lno, record);
        self.tree
            .insert(&self.hier_path, record)
            .map_err(|source| ReportError::AmbiguousTreeInsertion {
                path: self.source.to_string(),
                line: lno,
                hierarchy: self.hier_path.join("."),
                source,
            })?;

        self.prev_level = level;
        self.stats.records += 1;
        Ok(())
    }

    /// Extract the latched dialect's fields. `Ok(None)` means the token count
    /// does not fit this dialect and the line is not data.
    fn figures(
        &self,
        caps: &Captures<'_>,
        lno: usize,
        line: &str,
    ) -> Result<Option<PowerFigures>, ReportError> {
        let tokens: Vec<&str> = caps
            .name("nums")
            .map_or("", |m| m.as_str())
            .split_whitespace()
            .collect();
        let num = |idx: usize, field: &'static str| self.number(tokens[idx], field, lno, line);

        let figures = match (self.dialect, tokens.len()) {
            (Dialect::PowerCompiler, 5) => PowerFigures::PowerCompiler {
                switching: num(0, "switching power")?,
                internal: num(1, "internal power")?,
                leakage: num(2, "leakage power")?,
                total: num(3, "total power")?,
                pct: num(4, "percent of total")?,
            },
            (Dialect::PrimePower, 7) => PowerFigures::PrimePower {
                internal: num(0, "internal power")?,
                switching: num(1, "switching power")?,
                leakage: num(2, "leakage power")?,
                glitch: num(3, "glitch power")?,
                x_tran: num(4, "x-tran power")?,
                total: num(5, "total power")?,
                pct: num(6, "percent of total")?,
                peak: None,
            },
            (Dialect::PrimePower, 9) => PowerFigures::PrimePower {
                internal: num(0, "internal power")?,
                switching: num(1, "switching power")?,
                leakage: num(2, "leakage power")?,
                peak: Some(PeakPower {
                    power: num(3, "peak power")?,
                    window: self.window(tokens[4], lno, line)?,
                }),
                glitch: num(5, "glitch power")?,
                x_tran: num(6, "x-tran power")?,
                total: num(7, "total power")?,
                pct: num(8, "percent of total")?,
            },
            _ => return Ok(None),
        };
        Ok(Some(figures))
    }

    fn number(
        &self,
        token: &str,
        field: &'static str,
        lno: usize,
        line: &str,
    ) -> Result<f64, ReportError> {
        self.number_re
            .is_match(token)
            .then(|| token.parse::<f64>().ok())
            .flatten()
            .ok_or_else(|| self.mismatch(field, token, lno, line))
    }

    fn window(&self, token: &str, lno: usize, line: &str) -> Result<(f64, f64), ReportError> {
        let parsed = self.window_re.captures(token).and_then(|c| {
            let start = c.get(1)?.as_str().parse::<f64>().ok()?;
            let end = c.get(2)?.as_str().parse::<f64>().ok()?;
            Some((start, end))
        });
        parsed.ok_or_else(|| self.mismatch("peak time window", token, lno, line))
    }

    fn mismatch(&self, field: &'static str, token: &str, lno: usize, line: &str) -> ReportError {
        ReportError::StructuralMismatch {
            path: self.source.to_string(),
            line: lno,
            field,
            token: token.to_string(),
            content: line.trim_end().to_string(),
        }
    }

    fn skip(&mut self, lno: usize, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.stats.skipped_lines += 1;
        if self.opts.verbose {
            log::warn!(
                "no match at {}:{}: {:?}",
                self.source,
                lno,
                line.trim_end()
            );
        }
    }

    fn finish(self) -> Result<ParsedReport, ReportError> {
        if self.tree.is_empty() {
            return Err(ReportError::NoRecords {
                path: self.source.to_string(),
            });
        }
        log::debug!(
            "{}: {} records, {} skipped lines, {} below depth limit",
            self.source,
            self.stats.records,
            self.stats.skipped_lines,
            self.stats.depth_limited
        );
        Ok(ParsedReport {
            tree: self.tree,
            stats: self.stats,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, ReportError> {
    Regex::new(pattern).map_err(|source| ReportError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::PowerField;
    use crate::view::to_rows;
    use pretty_assertions::assert_eq;

    const POWER_COMPILER_RPT: &str = include_str!("../../testdata/power_compiler.rpt");
    const PRIME_POWER_RPT: &str = include_str!("../../testdata/prime_power.rpt");

    fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedReport, ReportError> {
        parse_report(text.as_bytes(), "test.rpt", opts)
    }

    fn body(lines: &[&str]) -> String {
        let mut text = String::from("Hierarchy   Power  Power  Power  Power  %\n---------\n");
        for l in lines {
            text.push_str(l);
            text.push('\n');
        }
        text
    }

    #[test]
    fn power_compiler_sample() {
        let parsed = parse(POWER_COMPILER_RPT, &ParseOptions::default()).unwrap();
        let tree = &parsed.tree;
        assert_eq!(tree.dialect, Dialect::PowerCompiler);
        assert_eq!(parsed.stats.records, 5);
        assert_eq!(tree.root_names(), vec!["chip_top"]);

        let alu = tree.get(&["chip_top", "u_core", "u_alu"]).unwrap();
        assert_eq!(alu.type_name, "alu");
        assert_eq!(alu.values(), vec![0.3, 1.0, 900.0, 2.2, 21.2]);

        let top = tree.get(&["chip_top"]).unwrap();
        assert_eq!(top.type_name, "");
        assert_eq!(top.get(PowerField::Leakage), Some(3450.0));
    }

    #[test]
    fn prime_power_sample_keeps_peak() {
        let parsed = parse(PRIME_POWER_RPT, &ParseOptions::default()).unwrap();
        let tree = &parsed.tree;
        assert_eq!(tree.dialect, Dialect::PrimePower);
        assert_eq!(parsed.stats.records, 4);

        let alu = tree.get(&["chip_top", "u_core", "u_alu"]).unwrap();
        assert_eq!(alu.get(PowerField::Glitch), Some(1.0e-4));
        assert_eq!(alu.get(PowerField::Pct), Some(23.9));
        match &alu.figures {
            PowerFigures::PrimePower { peak: Some(peak), .. } => {
                assert_eq!(peak.power, 3.0e-2);
                assert_eq!(peak.window, (1.5, 1.6));
            }
            other => panic!("unexpected figures {:?}", other),
        }
    }

    #[test]
    fn nested_hierarchy_round_trip() {
        let text = body(&[
            "A          1.0 1.0 1.0 3.0 100.0",
            "  B        0.5 0.5 0.5 1.5 50.0",
            "  C        0.5 0.5 0.5 1.5 50.0",
            "    D      0.5 0.5 0.5 1.5 50.0",
        ]);
        let tree = parse(&text, &ParseOptions::default()).unwrap().tree;

        let paths: Vec<(usize, String)> = tree
            .leaves()
            .map(|(p, _)| (p.len() - 1, p.join(".")))
            .collect();
        assert!(paths.contains(&(1, "A.B".to_string())));
        assert!(paths.contains(&(2, "A.C.D".to_string())));
        assert!(tree.get(&["A", "C", "D"]).is_some());
    }

    #[test]
    fn glitch_marker_latches_prime_power() {
        let text = "\
            Int Switch Leak Glitch X-tran Total\n\
            Hierarchy  Power Power Power Power Power Power %\n\
            ----\n\
            top   1.0 2.0 3.0 0.5 0.5 7.0 100.0\n\
            \x20 u_a  1.0 1.0 1.0 1.0 100.0\n\
            \x20 u_b  0.5 1.0 1.5 0.25 0.25 3.5 50.0\n";
        let parsed = parse(text, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.tree.dialect, Dialect::PrimePower);
        assert_eq!(parsed.stats.records, 2);
        assert_eq!(parsed.stats.skipped_lines, 1);
        assert!(parsed.tree.get(&["top", "u_a"]).is_none());
        assert_eq!(
            parsed.tree.get(&["top", "u_b"]).unwrap().get(PowerField::XTran),
            Some(0.25)
        );
    }

    #[test]
    fn max_depth_drops_deeper_records() {
        let opts = ParseOptions {
            max_depth: Some(1),
            verbose: false,
        };
        let parsed = parse(POWER_COMPILER_RPT, &opts).unwrap();
        assert_eq!(parsed.stats.depth_limited, 2);
        assert!(parsed.tree.get(&["chip_top", "u_core", "u_alu"]).is_none());
        assert!(parsed.tree.get(&["chip_top", "u_io"]).is_some());
        assert!(parsed.tree.leaves().all(|(p, _)| p.len() <= 2));

        let rows: Vec<String> = to_rows(&parsed.tree, true)
            .rows
            .into_iter()
            .filter_map(|r| r.hierarchy.into_iter().next().flatten())
            .collect();
        assert_eq!(rows, vec!["chip_top", "chip_top.u_core", "chip_top.u_io"]);
    }

    #[test]
    fn exponent_numbers_parse() {
        let text = body(&["top  1.5e-03 2.0E+01 3.25 4.0e0 100.0"]);
        let tree = parse(&text, &ParseOptions::default()).unwrap().tree;
        assert_eq!(
            tree.get(&["top"]).unwrap().values(),
            vec![1.5e-3, 20.0, 3.25, 4.0, 100.0]
        );
    }

    #[test]
    fn malformed_number_is_fatal() {
        let text = body(&["top  1.0 2.0 3.0.1 4.0 100.0"]);
        let err = parse(&text, &ParseOptions::default()).unwrap_err();
        match err {
            ReportError::StructuralMismatch {
                path,
                line,
                field,
                token,
                ..
            } => {
                assert_eq!(path, "test.rpt");
                assert_eq!(line, 3);
                assert_eq!(field, "leakage power");
                assert_eq!(token, "3.0.1");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn malformed_peak_window_is_fatal() {
        let text = "\
            Int Switch Leak Peak Peak Glitch X-tran Total\n\
            Hierarchy  Power Power Power Power Time Power Power Power %\n\
            ----\n\
            top   1.0 2.0 3.0 9.0 1.0-x 0.5 0.5 7.0 100.0\n";
        let err = parse(text, &ParseOptions::default()).unwrap_err();
        match err {
            ReportError::StructuralMismatch {
                line, field, token, ..
            } => {
                assert_eq!(line, 4);
                assert_eq!(field, "peak time window");
                assert_eq!(token, "1.0-x");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn decorative_lines_are_skipped() {
        let text = body(&[
            "top  1.0 2.0 3.0 4.0 100.0",
            "--------------------------",
            "",
            "Total Dynamic Power = 2.0 mW",
            "1",
        ]);
        let parsed = parse(&text, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.stats.records, 1);
        assert_eq!(parsed.stats.skipped_lines, 3);
    }

    #[test]
    fn skipped_level_is_fatal() {
        let text = body(&["top  1.0 2.0 3.0 4.0 100.0", "    u_deep  1.0 2.0 3.0 4.0 10.0"]);
        let err = parse(&text, &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::IndentJump {
                line: 4,
                level: 2,
                previous: 0,
                ..
            }
        ));
    }

    #[test]
    fn repeated_sibling_is_ambiguous() {
        let text = body(&[
            "top  1.0 2.0 3.0 4.0 100.0",
            "  u_a  1.0 2.0 3.0 4.0 50.0",
            "  u_a  1.0 2.0 3.0 4.0 50.0",
        ]);
        let err = parse(&text, &ParseOptions::default()).unwrap_err();
        match err {
            ReportError::AmbiguousTreeInsertion {
                line, hierarchy, ..
            } => {
                assert_eq!(line, 5);
                assert_eq!(hierarchy, "top.u_a");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn marker_at_end_of_input_is_truncated() {
        let err = parse("header\nHierarchy  Power  %\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::TruncatedSection { line: 2, .. }
        ));
    }

    #[test]
    fn report_without_records_is_empty() {
        let err = parse("no table here\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::NoRecords { .. }));

        let err = parse(&body(&["nothing useful"]), &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::NoRecords { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = parse_report_file("/nonexistent/power.rpt", &ParseOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/power.rpt"));
    }
}
