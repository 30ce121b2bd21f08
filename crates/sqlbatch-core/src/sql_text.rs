//! Helpers for working with raw SQL command text

/// Split a compound command into its individual statements.
///
/// Splits on `;` while respecting string literals, quoted identifiers and
/// comments. Empty statements (such as the one after a doubled terminator)
/// are dropped, and each returned statement is trimmed and has no trailing
/// terminator.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();

        if in_line_comment {
            current.push(c);
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }

        if in_block_comment {
            current.push(c);
            if c == '*' && next == Some('/') {
                current.push('/');
                chars.next();
                in_block_comment = false;
            }
            continue;
        }

        if let Some(q) = quote {
            current.push(c);
            if c == q {
                // doubled quote is an escaped quote
                if next == Some(q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '-' if next == Some('-') => {
                in_line_comment = true;
                current.push(c);
            }
            '/' if next == Some('*') => {
                in_block_comment = true;
                current.push(c);
                current.push('*');
                chars.next();
            }
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &str) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// First `max_chars` characters of a statement, for log fields
pub fn sql_preview(sql: &str, max_chars: usize) -> String {
    sql.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_compound_update() {
        let sql = "UPDATE t SET x = :p0 WHERE id = :p1; UPDATE t SET x = :p2 WHERE id = :p3;";
        assert_eq!(
            split_statements(sql),
            vec![
                "UPDATE t SET x = :p0 WHERE id = :p1",
                "UPDATE t SET x = :p2 WHERE id = :p3",
            ]
        );
    }

    #[test]
    fn test_split_skips_empty_statements() {
        assert_eq!(split_statements("SELECT 1;;  ;"), vec!["SELECT 1"]);
        assert!(split_statements("  ").is_empty());
    }

    #[test]
    fn test_split_respects_quotes_and_comments() {
        let sql = "INSERT INTO t (a) VALUES ('x;y'); -- trailing; comment\nUPDATE \"odd;name\" SET a = 'it''s;' WHERE id = 1 /* ; */";
        let statements = split_statements(sql);

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "INSERT INTO t (a) VALUES ('x;y')");
        assert!(statements[1].ends_with("WHERE id = 1 /* ; */"));
        assert!(statements[1].contains("'it''s;'"));
    }

    #[test]
    fn test_sql_preview_truncates_on_chars() {
        assert_eq!(sql_preview("INSERT INTO t", 6), "INSERT");
        assert_eq!(sql_preview("é", 10), "é");
    }
}
