use crate::journal::FailureRecord;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "Run")]
    run: i64,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Error")]
    error: String,
    #[tabled(rename = "Started")]
    started: String,
}

pub fn failures_table(records: &[FailureRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let rows: Vec<FailureRow> = records
        .iter()
        .map(|record| FailureRow {
            run: record.run_id,
            unit: record.key.to_string(),
            status: record.status.clone(),
            error: match (&record.error_kind, &record.error_message) {
                (Some(kind), Some(message)) => format!("[{kind}] {message}"),
                (Some(kind), None) => format!("[{kind}]"),
                _ => "interrupted before finishing".to_string(),
            },
            started: record.started_at.clone(),
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}
