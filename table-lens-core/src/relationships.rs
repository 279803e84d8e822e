use crate::table::{Column, ColumnKind, Table};
use serde::{Deserialize, Serialize};
use table_lens_common::RelationshipConfig;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `[i][j]` = pearson r; `None` when the pair shares fewer than two usable rows.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Reinforcing,
    Opposing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFinding {
    pub column_a: String,
    pub column_b: String,
    pub coefficient: f64,
    pub relation: Relation,
}

impl CorrelationFinding {
    pub fn sentence(&self) -> String {
        let movement = match self.relation {
            Relation::Reinforcing => "rise together",
            Relation::Opposing => "move in opposite directions",
        };
        format!(
            "{} and {} {movement} ({:?}, strength {:.2})",
            self.column_a,
            self.column_b,
            self.relation,
            self.coefficient.abs()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationships {
    pub matrix: CorrelationMatrix,
    pub findings: Vec<CorrelationFinding>,
    pub notes: Vec<String>,
}

impl Relationships {
    pub fn sentences(&self) -> Vec<String> {
        self.findings.iter().map(CorrelationFinding::sentence).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Discoverer {
    config: RelationshipConfig,
}

impl Discoverer {
    pub fn new(config: RelationshipConfig) -> Self {
        Self { config }
    }

    pub fn discover(&self, table: &Table) -> Relationships {
        let eligible: Vec<&Column> = table
            .columns()
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric && has_variation(c))
            .collect();
        if eligible.len() < 2 {
            return Relationships {
                matrix: CorrelationMatrix::default(),
                findings: Vec::new(),
                notes: vec![format!(
                    "insufficient numeric columns: {} with variation found, at least 2 are needed; no comparison was possible",
                    eligible.len()
                )],
            };
        }

        let n = eligible.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            values[i][i] = Some(1.0);
            for j in (i + 1)..n {
                let r = pearson(eligible[i], eligible[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        // upper triangle only: no self-pairs, no mirrored duplicates
        let mut candidates = Vec::new();
        for (i, row) in values.iter().enumerate() {
            for (j, r) in row.iter().enumerate().skip(i + 1) {
                if let Some(r) = *r {
                    if r.abs() > self.config.significance {
                        candidates.push(CorrelationFinding {
                            column_a: eligible[i].name.clone(),
                            column_b: eligible[j].name.clone(),
                            coefficient: r,
                            relation: if r > 0.0 { Relation::Reinforcing } else { Relation::Opposing },
                        });
                    }
                }
            }
        }
        // stable: ties keep column order
        candidates.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        let significant = candidates.len();
        candidates.truncate(self.config.max_findings);

        let mut notes = Vec::new();
        if significant == 0 {
            notes.push(format!(
                "no pair of columns exceeds the significance threshold of {:.2}",
                self.config.significance
            ));
        } else if significant > candidates.len() {
            notes.push(format!(
                "{significant} significant pairs found, showing the strongest {}",
                candidates.len()
            ));
        }
        tracing::debug!(columns = n, findings = candidates.len(), "correlation discovery finished");
        Relationships {
            matrix: CorrelationMatrix {
                columns: eligible.iter().map(|c| c.name.clone()).collect(),
                values,
            },
            findings: candidates,
            notes,
        }
    }
}

pub fn discover(table: &Table) -> Relationships {
    Discoverer::default().discover(table)
}

fn has_variation(column: &Column) -> bool {
    let mut values = column.numbers();
    match values.next() {
        Some(first) => values.any(|v| v != first),
        None => false,
    }
}

/// Pearson r over rows where both columns hold a number.
pub fn pearson(a: &Column, b: &Column) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .cells
        .iter()
        .zip(&b.cells)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
