use std::io::{self, Write};

use crossterm::style::{Attribute, Color, Stylize, style};

use crate::domain::Candidate;
use crate::squad::Squad;
use crate::transfer::TransferSuggestion;

/// One printable line for a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub position: String,
    pub name: String,
    pub form: f64,
    pub points_per_game: f64,
    pub weighted_points: Option<f64>,
    pub score: f64,
    pub selected_by_percent: f64,
    pub rank: String,
    pub price: String,
    pub opponent: String,
}

pub fn candidate_row(candidate: &Candidate, weighted_points: Option<f64>) -> CandidateRow {
    let mut name = candidate.player.name.clone();
    if candidate.most_captained {
        name.push_str(" (C)");
    }
    let venue = if candidate.fixture.home == candidate.club() {
        "H"
    } else {
        "A"
    };
    CandidateRow {
        position: candidate.position().short_name().to_string(),
        name,
        form: candidate.player.form,
        points_per_game: candidate.player.points_per_game,
        weighted_points,
        score: candidate.score,
        selected_by_percent: candidate.player.selected_by_percent,
        rank: candidate.rank_label(),
        price: candidate.player.price.to_string(),
        opponent: format!("{} ({venue})", candidate.opponent.short_name),
    }
}

pub fn squad_rows<F>(squad: &Squad, weighted_points: F) -> Vec<CandidateRow>
where
    F: Fn(&Candidate) -> Option<f64>,
{
    squad
        .iter()
        .map(|c| candidate_row(c, weighted_points(c)))
        .collect()
}

/// Which optional columns a table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub points_per_game: bool,
    pub weighted_points: bool,
    pub selected_by: bool,
    pub rank: bool,
}

impl Columns {
    pub const FULL: Columns = Columns {
        points_per_game: true,
        weighted_points: true,
        selected_by: true,
        rank: true,
    };

    pub const BRIEF: Columns = Columns {
        points_per_game: false,
        weighted_points: false,
        selected_by: false,
        rank: true,
    };
}

pub fn headers(columns: Columns) -> Vec<String> {
    let mut out = vec!["Pos", "Name", "Form"];
    if columns.points_per_game {
        out.push("PPG");
    }
    if columns.weighted_points {
        out.push("WPPG");
    }
    out.push("Score");
    if columns.selected_by {
        out.push("Picked");
    }
    if columns.rank {
        out.push("Rank");
    }
    out.extend(["Cost", "Opponent"]);
    out.into_iter().map(str::to_string).collect()
}

pub fn cells(row: &CandidateRow, columns: Columns) -> Vec<String> {
    let mut out = vec![
        row.position.clone(),
        row.name.clone(),
        format!("{:.1}", row.form),
    ];
    if columns.points_per_game {
        out.push(format!("{:.1}", row.points_per_game));
    }
    if columns.weighted_points {
        out.push(
            row.weighted_points
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    out.push(format!("{:.2}", row.score));
    if columns.selected_by {
        out.push(format!("{:.1}%", row.selected_by_percent));
    }
    if columns.rank {
        out.push(row.rank.clone());
    }
    out.push(row.price.clone());
    out.push(row.opponent.clone());
    out
}

/// Header line followed by one line of cells per row.
pub fn table_rows(rows: &[CandidateRow], columns: Columns) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(headers(columns));
    out.extend(rows.iter().map(|row| cells(row, columns)));
    out
}

pub fn render_table<W: Write>(
    out: &mut W,
    title: &str,
    rows: &[CandidateRow],
    columns: Columns,
    styled: bool,
) -> io::Result<()> {
    let table = table_rows(rows, columns);
    let mut widths = vec![0usize; table[0].len()];
    for line in &table {
        for (idx, cell) in line.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    writeln!(out)?;
    if styled {
        writeln!(out, "{}", style(title).attribute(Attribute::Bold))?;
    } else {
        writeln!(out, "{title}")?;
    }
    for (line_idx, line) in table.iter().enumerate() {
        let mut parts = Vec::with_capacity(line.len());
        for (idx, cell) in line.iter().enumerate() {
            let padded = format!("{cell:<width$}", width = widths[idx]);
            let rendered = if !styled {
                padded
            } else if line_idx == 0 {
                style(padded)
                    .with(Color::Green)
                    .attribute(Attribute::Underlined)
                    .to_string()
            } else if idx == 0 {
                style(padded).with(Color::Yellow).to_string()
            } else {
                padded
            };
            parts.push(rendered);
        }
        writeln!(out, "{}", parts.join("  ").trim_end())?;
    }
    Ok(())
}

pub fn render_transfer<W: Write>(
    out: &mut W,
    title: &str,
    suggestion: &TransferSuggestion,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title} (budget {})", suggestion.budget)?;
    for sold in &suggestion.sell {
        writeln!(
            out,
            "  OUT {} {} {} ({:.2})",
            sold.position().short_name(),
            sold.player.name,
            sold.player.price,
            sold.score
        )?;
    }
    for bought in &suggestion.buy {
        writeln!(
            out,
            "  IN  {} {} {} ({:.2})",
            bought.position().short_name(),
            bought.player.name,
            bought.player.price,
            bought.score
        )?;
    }
    writeln!(out, "  score gain {:+.2}", suggestion.score_gain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, Ranks, TeamId};
    use crate::fake_data::sample_candidate;

    #[test]
    fn captain_marker_and_rank_label() {
        let mut c = sample_candidate(1, Position::Forward, TeamId(1), 12.5);
        c.most_captained = true;
        c.ranks = Some(Ranks {
            overall: 1,
            position: 1,
        });
        let row = candidate_row(&c, Some(6.0));
        assert!(row.name.ends_with(" (C)"));
        assert_eq!(row.rank, "1st (1st)");
        assert_eq!(row.position, "FWD");
    }

    #[test]
    fn headers_and_cells_line_up() {
        let c = sample_candidate(1, Position::Forward, TeamId(1), 12.5);
        let row = candidate_row(&c, None);
        for columns in [Columns::FULL, Columns::BRIEF] {
            assert_eq!(headers(columns).len(), cells(&row, columns).len());
        }
        assert!(cells(&row, Columns::FULL).contains(&"-".to_string()));
    }

    #[test]
    fn plain_table_pads_columns() {
        let rows = vec![candidate_row(
            &sample_candidate(1, Position::Defender, TeamId(1), 3.0),
            None,
        )];
        let mut buf = Vec::new();
        render_table(&mut buf, "Best squad", &rows, Columns::BRIEF, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Best squad");
        assert!(lines[2].starts_with("Pos  Name"));
        assert!(lines[3].starts_with("DEF"));
    }

    #[test]
    fn styled_table_colours_header_and_position() {
        let rows = vec![candidate_row(
            &sample_candidate(1, Position::Midfielder, TeamId(1), 3.0),
            None,
        )];
        let mut buf = Vec::new();
        render_table(&mut buf, "Best squad", &rows, Columns::BRIEF, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("\u{1b}["), "title is bold");
        assert!(lines[2].contains("\u{1b}[") && lines[2].contains("Name"));
        assert!(lines[3].contains("MID"));
        if std::env::var_os("NO_COLOR").is_none() {
            assert!(lines[3].contains("\u{1b}["), "position column is coloured");
        }
    }
}
