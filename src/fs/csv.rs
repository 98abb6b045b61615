//! Minimal CSV support for the log file: one record per line, fields quoted only when needed.

/// Quotes a field when it contains a separator, a quote or a line break. Quotes are doubled.
pub fn escape_field(s: &str) -> String {
    let needs_quote = s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r');
    if !needs_quote {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn join_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| escape_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits a single CSV line into its fields, undoing [escape_field]. Returns `None` when a quoted
/// field is left open.
pub fn split_record(line: &str) -> Option<Vec<String>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if current.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }

    if quoted {
        return None;
    }
    fields.push(current);
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_left_alone() {
        assert_eq!(join_record(["03/10/2024", "12", "0.5"]), "03/10/2024,12,0.5");
    }

    #[test]
    fn table_cells_are_quoted() {
        let cell = r#"{"ctrl + c": 12, "a": 340}"#;
        let line = join_record(["1", cell, "None"]);

        assert_eq!(line, r#"1,"{""ctrl + c"": 12, ""a"": 340}",None"#);
        assert_eq!(
            split_record(&line),
            Some(vec!["1".to_string(), cell.to_string(), "None".to_string()])
        );
    }

    #[test]
    fn separators_inside_labels_survive() {
        let cell = r#"{",": 3, "\"": 1}"#;
        let line = join_record([cell, ""]);
        assert_eq!(split_record(&line), Some(vec![cell.to_string(), String::new()]));
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        assert_eq!(split_record(r#"1,"{""a"": 1"#), None);
    }
}
