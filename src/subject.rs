//! Per-group subject lines.
//!
//! A [`SubjectTemplate`] is parsed once from text such as
//! `"{title} #{num} ({progress}/{total}) {size}"`. Placeholders:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{title}` | caller-supplied title |
//! | `{num}` | 1-based group index |
//! | `{progress}` | cumulative item range `start-end` across groups |
//! | `{total}` | item count across all groups |
//! | `{size}` | group byte total, human-readable |
//!
//! A placeholder may carry a padding spec after a colon,
//! `{name:[[fill]align][0][width]}`, with align one of `<`, `>`, `^`:
//! `{num:03}` gives `007`, `{title:*^9}` gives `****T****` for a
//! title of `T`. Numbers align right by default, everything else left.
//! Precision, sign and type letters are not supported.
//!
//! `{{` and `}}` produce literal braces. Anything else inside braces is
//! rejected at parse time.

use crate::group::Group;
use crate::report::format_size;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "{title} #{num} ({progress}/{total}) {size}";
pub const DEFAULT_TITLE: &str = "batch mailer";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{0}}} (expected title, num, progress, total or size)")]
    UnknownPlaceholder(String),
    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at byte {0} (use '}}}}' for a literal brace)")]
    UnmatchedClose(usize),
    #[error("invalid format spec {0:?} (expected [[fill]align][0][width])")]
    InvalidSpec(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Num,
    Progress,
    Total,
    Size,
}

impl FromStr for Field {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Field::Title),
            "num" => Ok(Field::Num),
            "progress" => Ok(Field::Progress),
            "total" => Ok(Field::Total),
            "size" => Ok(Field::Size),
            other => Err(TemplateError::UnknownPlaceholder(other.to_string())),
        }
    }
}

impl Field {
    fn default_align(self) -> Align {
        match self {
            Field::Num | Field::Total => Align::Right,
            Field::Title | Field::Progress | Field::Size => Align::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            _ => None,
        }
    }
}

/// Padding for one placeholder. The default pads nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Spec {
    fill: char,
    align: Option<Align>,
    width: usize,
}

impl Default for Spec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            width: 0,
        }
    }
}

impl FromStr for Spec {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TemplateError::InvalidSpec(s.to_string());
        let mut spec = Spec::default();
        let mut chars = s.chars();
        let first = chars.next();
        let second = chars.next();

        let rest = match (first, second.and_then(Align::from_char)) {
            (Some(fill), Some(align)) => {
                spec.fill = fill;
                spec.align = Some(align);
                &s[fill.len_utf8() + 1..]
            }
            _ => match first.and_then(Align::from_char) {
                Some(align) => {
                    spec.align = Some(align);
                    &s[1..]
                }
                None => s,
            },
        };

        let rest = match rest.strip_prefix('0') {
            Some(digits) if spec.align.is_none() => {
                spec.fill = '0';
                spec.align = Some(Align::Right);
                digits
            }
            _ => rest,
        };
        if !rest.is_empty() {
            if !rest.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            spec.width = rest.parse().map_err(|_| invalid())?;
        }
        Ok(spec)
    }
}

impl Spec {
    fn pad(&self, value: String, default_align: Align) -> String {
        let len = value.chars().count();
        if len >= self.width {
            return value;
        }
        let padding = self.width - len;
        let (left, right) = match self.align.unwrap_or(default_align) {
            Align::Left => (0, padding),
            Align::Right => (padding, 0),
            Align::Center => (padding / 2, padding - padding / 2),
        };
        let fill = |n: usize| std::iter::repeat_n(self.fill, n).collect::<String>();
        format!("{}{value}{}", fill(left), fill(right))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field(Field, Spec),
}

/// A parsed subject template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTemplate {
    source: String,
    pieces: Vec<Piece>,
}

impl Default for SubjectTemplate {
    fn default() -> Self {
        // Known-good constant; keep in sync with `parses_default_template`.
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            pieces: vec![
                Piece::Field(Field::Title, Spec::default()),
                Piece::Literal(" #".to_string()),
                Piece::Field(Field::Num, Spec::default()),
                Piece::Literal(" (".to_string()),
                Piece::Field(Field::Progress, Spec::default()),
                Piece::Literal("/".to_string()),
                Piece::Field(Field::Total, Spec::default()),
                Piece::Literal(") ".to_string()),
                Piece::Field(Field::Size, Spec::default()),
            ],
        }
    }
}

impl FromStr for SubjectTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = s.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let rest = &s[pos + 1..];
                    let end = rest.find('}').ok_or(TemplateError::Unclosed(pos))?;
                    let inner = &rest[..end];
                    let (name, spec) = match inner.split_once(':') {
                        Some((name, spec)) => (name, spec.parse()?),
                        None => (inner, Spec::default()),
                    };
                    let field: Field = name.parse()?;
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Field(field, spec));
                    // Skip the name and the closing brace.
                    for _ in 0..rest[..=end].chars().count() {
                        chars.next();
                    }
                }
                '}' => return Err(TemplateError::UnmatchedClose(pos)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Self {
            source: s.to_string(),
            pieces,
        })
    }
}

impl fmt::Display for SubjectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Values for one group's subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectContext<'a> {
    pub title: &'a str,
    pub num: usize,
    /// Inclusive 1-based item range; `end < start` for an empty group.
    pub progress: (usize, usize),
    pub total: usize,
    pub size: u64,
}

impl SubjectTemplate {
    pub fn render(&self, ctx: &SubjectContext<'_>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            let (field, spec) = match piece {
                Piece::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Piece::Field(field, spec) => (*field, spec),
            };
            let value = match field {
                Field::Title => ctx.title.to_string(),
                Field::Num => ctx.num.to_string(),
                Field::Progress => format!("{}-{}", ctx.progress.0, ctx.progress.1),
                Field::Total => ctx.total.to_string(),
                Field::Size => format_size(ctx.size),
            };
            out.push_str(&spec.pad(value, field.default_align()));
        }
        out
    }
}

/// One subject per group, in order. Progress ranges accumulate across groups.
pub fn subjects(groups: &[Group<'_>], title: &str, template: &SubjectTemplate) -> Vec<String> {
    let total = groups.iter().map(Group::len).sum();
    let mut done = 0;
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let ctx = SubjectContext {
                title,
                num: i + 1,
                progress: (done + 1, done + group.len()),
                total,
                size: group.total_size(),
            };
            done += group.len();
            template.render(&ctx)
        })
        .collect()
}
