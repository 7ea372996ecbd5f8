//! SQL dump parsing and engine/charset rewriting.

use super::{DbEngine, is_default_charset};

/// A parsed dump ready to be restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlDump {
    pub statements: Vec<String>,
}

impl SqlDump {
    /// Split dump text into statements.
    ///
    /// Lines starting with `#` or `--` are comments. A statement ends at a
    /// line whose trimmed text ends with `;`.
    pub fn parse(text: &str) -> Self {
        let mut statements = Vec::new();
        let mut current = String::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("--") {
                continue;
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line.trim_end());
            if trimmed.ends_with(';') {
                statements.push(std::mem::take(&mut current));
            }
        }

        // Trailing statement without a terminator
        if !current.trim().is_empty() {
            statements.push(current);
        }

        Self { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Rewrite CREATE TABLE statements to the requested engine and charset.
    ///
    /// Returns whether any statement changed.
    pub fn rewrite(&mut self, engine: DbEngine, charset: &str) -> bool {
        let mut changed = false;
        for stmt in &mut self.statements {
            if !is_create_table(stmt) {
                continue;
            }
            let mut next = stmt.clone();
            if engine == DbEngine::InnoDb {
                next = replace_token(&next, "ENGINE=MyISAM", "ENGINE=InnoDB");
            }
            if !is_default_charset(charset) {
                next = replace_token(&next, "CHARSET=utf8", &format!("CHARSET={charset}"));
            }
            if next != *stmt {
                *stmt = next;
                changed = true;
            }
        }
        changed
    }

    /// Table names created by this dump, in order.
    pub fn created_tables(&self) -> Vec<String> {
        self.statements
            .iter()
            .filter(|s| is_create_table(s))
            .filter_map(|s| table_name_of(s))
            .collect()
    }
}

fn is_create_table(stmt: &str) -> bool {
    stmt.trim_start()
        .get(..12)
        .is_some_and(|head| head.eq_ignore_ascii_case("CREATE TABLE"))
}

fn table_name_of(stmt: &str) -> Option<String> {
    let rest = stmt.trim_start().get(12..)?.trim_start();
    let rest = strip_prefix_ignore_case(rest, "IF NOT EXISTS")
        .map(str::trim_start)
        .unwrap_or(rest);
    let name: String = if let Some(quoted) = rest.strip_prefix('`') {
        quoted.split('`').next()?.to_string()
    } else {
        rest.split(|c: char| c.is_whitespace() || c == '(')
            .next()?
            .to_string()
    };
    if name.is_empty() { None } else { Some(name) }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

/// Replace `token` where it is not followed by another identifier character,
/// so `CHARSET=utf8` never matches inside `CHARSET=utf8mb4`.
fn replace_token(text: &str, token: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(token) {
        let after = &rest[idx + token.len()..];
        let bounded = after
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        out.push_str(&rest[..idx]);
        out.push_str(if bounded { replacement } else { token });
        rest = after;
    }
    out.push_str(rest);
    out
}
