use super::TabularFormatter;
use serde_json::{Map, Value};

pub struct JsonFormatter<'a, C> {
    _phantom: std::marker::PhantomData<C>,
    omit_fields: Vec<&'a str>,
    no_headers: bool,
}

impl<'a, C> JsonFormatter<'a, C>
where
    C: std::string::ToString + serde::Serialize,
{
    pub fn new(omit_fields: Vec<&'a str>, no_headers: bool) -> Self {
        Self {
            _phantom: std::marker::PhantomData,
            omit_fields,
            no_headers,
        }
    }
}

impl<C> TabularFormatter<C> for JsonFormatter<'_, C>
where
    C: std::string::ToString + serde::Serialize,
{
    type Error = serde_json::Error;

    /// Objects keyed by header, or bare arrays when headers are disabled.
    fn format<'r, I, O>(&self, headers: &'r [&'r str], rows: O) -> Result<String, Self::Error>
    where
        C: 'r,
        I: IntoIterator<Item = C> + 'r,
        O: IntoIterator<Item = I> + 'r,
    {
        let mut json_rows = Vec::new();
        for row in rows {
            let kept = headers
                .iter()
                .zip(row)
                .filter(|(header, _)| !self.omit_fields.contains(*header));
            let json_row = if self.no_headers {
                Value::Array(
                    kept.map(|(_, field)| serde_json::to_value(field))
                        .collect::<Result<_, _>>()?,
                )
            } else {
                let mut object = Map::new();
                for (header, field) in kept {
                    object.insert(header.to_string(), serde_json::to_value(field)?);
                }
                Value::Object(object)
            };
            json_rows.push(json_row);
        }
        serde_json::to_string(&json_rows)
    }
}
