//! Bordered text tables for terminal output.

use std::fmt;

/// A table of pre-formatted cells. Headers are centred; columns whose cells
/// are all numeric are right-aligned, the rest left-aligned.
#[derive(Debug, Clone)]
pub struct Table {
  headers: Vec<String>,
  rows:    Vec<Vec<String>>,
}

impl Table {
  pub fn new<I, S>(headers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self { headers: headers.into_iter().map(Into::into).collect(), rows: Vec::new() }
  }

  pub fn row<I, S>(&mut self, cells: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.rows.push(cells.into_iter().map(Into::into).collect());
    self
  }

  fn cell(&self, row: usize, col: usize) -> &str {
    self.rows[row].get(col).map_or("", String::as_str)
  }

  fn widths(&self) -> Vec<usize> {
    (0..self.headers.len())
      .map(|col| {
        (0..self.rows.len())
          .map(|row| width(self.cell(row, col)))
          .chain([width(&self.headers[col])])
          .max()
          .unwrap_or(0)
      })
      .collect()
  }

  fn numeric(&self, col: usize) -> bool {
    let mut cells = (0..self.rows.len())
      .map(|row| self.cell(row, col))
      .filter(|c| !c.is_empty())
      .peekable();
    cells.peek().is_some() && cells.all(|c| c.parse::<f64>().is_ok())
  }
}

fn width(s: &str) -> usize { s.chars().count() }

#[derive(Clone, Copy)]
enum Align {
  Left,
  Right,
  Center,
}

fn write_cell(f: &mut fmt::Formatter<'_>, text: &str, width: usize, align: Align) -> fmt::Result {
  let pad = width.saturating_sub(self::width(text));
  let (left, right) = match align {
    Align::Left => (0, pad),
    Align::Right => (pad, 0),
    Align::Center => (pad / 2, pad - pad / 2),
  };
  write!(f, " {:left$}{text}{:right$} |", "", "")
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let widths = self.widths();
    let aligns: Vec<Align> = (0..widths.len())
      .map(|col| if self.numeric(col) { Align::Right } else { Align::Left })
      .collect();

    let rule: String = widths.iter().fold(String::from("+"), |mut acc, w| {
      acc.push_str(&"-".repeat(w + 2));
      acc.push('+');
      acc
    });

    writeln!(f, "{rule}")?;
    write!(f, "|")?;
    for (header, &w) in self.headers.iter().zip(&widths) {
      write_cell(f, header, w, Align::Center)?;
    }
    writeln!(f)?;
    writeln!(f, "{rule}")?;

    for row in 0..self.rows.len() {
      write!(f, "|")?;
      for (col, &w) in widths.iter().enumerate() {
        write_cell(f, self.cell(row, col), w, aligns[col])?;
      }
      writeln!(f)?;
    }
    write!(f, "{rule}")
  }
}

/// Whole numbers without decimals, everything else with two.
pub fn number(value: f64) -> String {
  if value.fract() == 0.0 && value.abs() < 1e15 {
    format!("{}", value as i64)
  } else {
    format!("{value:.2}")
  }
}
