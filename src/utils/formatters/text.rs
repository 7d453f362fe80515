use super::TabularFormatter;
use std::convert::Infallible;

pub struct TextFormatter<'a, C> {
    _phantom: std::marker::PhantomData<C>,
    omit_fields: Vec<&'a str>,
    no_headers: bool,
    separator: &'a str,
}

impl<'a, C> TextFormatter<'a, C>
where
    C: std::string::ToString,
{
    pub fn new(omit_fields: Vec<&'a str>, no_headers: bool, separator: &'a str) -> Self {
        Self {
            _phantom: std::marker::PhantomData,
            omit_fields,
            no_headers,
            separator,
        }
    }
}

impl<C> TabularFormatter<C> for TextFormatter<'_, C>
where
    C: std::string::ToString,
{
    type Error = Infallible;

    fn format<'r, I, O>(&self, headers: &'r [&'r str], rows: O) -> Result<String, Self::Error>
    where
        C: 'r,
        I: IntoIterator<Item = C> + 'r,
        O: IntoIterator<Item = I> + 'r,
    {
        let columns: Vec<usize> = (0..headers.len())
            .filter(|i| !self.omit_fields.contains(&headers[*i]))
            .collect();
        let cells: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.to_string()).collect())
            .collect();
        let cell = |row: &[String], column: usize| row.get(column).cloned().unwrap_or_default();

        let widths: Vec<usize> = columns
            .iter()
            .map(|&column| {
                let longest_field = cells
                    .iter()
                    .map(|row| cell(row, column).len())
                    .max()
                    .unwrap_or(0);
                longest_field.max(headers[column].len())
            })
            .collect();

        let mut lines = Vec::new();
        if !self.no_headers && !columns.is_empty() {
            let titles: Vec<_> = columns
                .iter()
                .zip(&widths)
                .map(|(&column, &width)| {
                    let padding = " ".repeat(width - headers[column].len());
                    format!("\x1b[1m{}\x1b[0m{padding}", headers[column])
                })
                .collect();
            lines.push(titles.join(self.separator).trim_end().to_string());
            let rule = widths.iter().sum::<usize>() + (columns.len() - 1) * self.separator.len();
            lines.push("-".repeat(rule));
        }
        for row in &cells {
            let fields: Vec<_> = columns
                .iter()
                .zip(&widths)
                .map(|(&column, &width)| format!("{:width$}", cell(row, column)))
                .collect();
            lines.push(fields.join(self.separator).trim_end().to_string());
        }
        Ok(lines.join("\n"))
    }
}
