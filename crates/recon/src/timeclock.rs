// Jantar timeclock export: per-employee blocks of metadata rows, a "Dan"
// marker row, then daily detail rows. Parsed with a small state machine.

use std::sync::Arc;

use provjera_core::{Cell, RawSheet};

use crate::config::{BlankLabelRows, TimeclockConfig};
use crate::dates::parse_date_cell;
use crate::model::{Metadata, TimeclockFact, DATE_SLOT, STATUS_SLOT};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeclockParse {
    pub facts: Vec<TimeclockFact>,
    /// Detail rows seen before any section was active.
    pub dropped_rows: usize,
    /// Facts whose (forward-filled) date could not be parsed.
    pub undated: usize,
    pub sections: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum ParserState {
    AwaitingSection,
    InSection(Arc<Metadata>),
}

#[derive(Debug, PartialEq)]
enum RowKind<'a> {
    Metadata(&'a str),
    Skip,
    SectionStart,
    Detail,
}

struct TimeclockParser<'c> {
    config: &'c TimeclockConfig,
    metadata: Metadata,
    state: ParserState,
    facts: Vec<TimeclockFact>,
    dropped_rows: usize,
    sections: usize,
}

impl<'c> TimeclockParser<'c> {
    fn new(config: &'c TimeclockConfig) -> Self {
        Self {
            config,
            metadata: Metadata::default(),
            state: ParserState::AwaitingSection,
            facts: Vec::new(),
            dropped_rows: 0,
            sections: 0,
        }
    }

    fn classify<'r>(&self, label: &'r str) -> RowKind<'r> {
        if label.is_empty() {
            return match self.config.blank_label_rows {
                BlankLabelRows::Skip => RowKind::Skip,
                BlankLabelRows::Detail => RowKind::Detail,
            };
        }
        if self.config.metadata_keys.iter().any(|k| k == label) {
            RowKind::Metadata(label)
        } else if self.config.skip_labels.iter().any(|k| k == label) {
            RowKind::Skip
        } else if label == self.config.section_marker {
            RowKind::SectionStart
        } else {
            RowKind::Detail
        }
    }

    fn feed(&mut self, index: usize, row: &[Cell]) {
        let label = row.first().map(|c| c.to_string()).unwrap_or_default();
        match self.classify(label.trim()) {
            RowKind::Metadata(key) => {
                let value = row.get(1).cloned().unwrap_or_default();
                self.metadata.insert(key, value);
            }
            RowKind::Skip => {}
            RowKind::SectionStart => {
                self.state = if self.metadata.is_empty() {
                    ParserState::AwaitingSection
                } else {
                    self.sections += 1;
                    ParserState::InSection(Arc::new(self.metadata.clone()))
                };
            }
            RowKind::Detail => self.detail(index, row),
        }
    }

    fn detail(&mut self, index: usize, row: &[Cell]) {
        let ParserState::InSection(section) = &self.state else {
            self.dropped_rows += 1;
            return;
        };
        let fields: [Cell; 8] = std::array::from_fn(|i| row.get(i).cloned().unwrap_or_default());
        if fields.iter().all(Cell::is_blank) {
            return;
        }
        tracing::trace!(row = index, "timeclock detail row");
        let employee_name = section
            .get(&self.config.person_key)
            .and_then(Cell::trimmed_text)
            .map(|name| name.to_uppercase());
        let status_label = fields[STATUS_SLOT].trimmed_text();
        self.facts.push(TimeclockFact {
            metadata: Arc::clone(section),
            employee_name,
            date_cell: fields[DATE_SLOT].clone(),
            fields,
            date: None,
            status_label,
        });
    }

    fn finish(mut self) -> TimeclockParse {
        forward_fill_dates(&mut self.facts);
        let mut undated = 0;
        for fact in &mut self.facts {
            fact.date = parse_date_cell(&fact.date_cell);
            if fact.date.is_none() {
                undated += 1;
            }
        }
        if undated > 0 {
            tracing::debug!(undated, "timeclock facts without a parseable date");
        }
        tracing::info!(
            facts = self.facts.len(),
            sections = self.sections,
            dropped_rows = self.dropped_rows,
            "timeclock parsed"
        );
        TimeclockParse {
            facts: self.facts,
            dropped_rows: self.dropped_rows,
            undated,
            sections: self.sections,
        }
    }
}

/// Blank date slots take the most recent non-blank value above them, across
/// section boundaries. Leading blanks stay blank.
fn forward_fill_dates(facts: &mut [TimeclockFact]) {
    let mut last: Option<Cell> = None;
    for fact in facts {
        if fact.date_cell.is_blank() {
            if let Some(prev) = &last {
                fact.date_cell = prev.clone();
            }
        } else {
            last = Some(fact.date_cell.clone());
        }
    }
}

pub fn parse_timeclock(sheet: &RawSheet, config: &TimeclockConfig) -> TimeclockParse {
    let mut parser = TimeclockParser::new(config);
    for (index, row) in sheet.rows.iter().enumerate() {
        parser.feed(index, row);
    }
    parser.finish()
}
