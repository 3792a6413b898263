use crate::util::{str_width, to_lines};
use std::borrow::Cow;

const NESTED_INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Loglevel {
    Error,
    Warn,
    Info,
    Verbose,
    Debug,
    Silly,
}

pub trait ToLogPayload {
    fn to_log_payload(&self) -> LogPayload;
}

impl ToLogPayload for String {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::Text(self.to_owned().into())
    }
}

impl ToLogPayload for &'static str {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::Text((*self).into())
    }
}

/// Turns a (possibly nested) payload into a list of lines, ready for formatting
pub trait FlattenLog {
    fn flatten_log(&self) -> Vec<Cow<'static, str>>;
}

#[derive(Clone, Debug, Default)]
pub enum LogPayload {
    #[default]
    Empty,
    Text(LogPayloadText),
    Dict(LogPayloadDict),
}

impl LogPayload {
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl From<LogPayloadText> for LogPayload {
    fn from(text: LogPayloadText) -> Self {
        Self::Text(text)
    }
}

impl From<LogPayloadDict> for LogPayload {
    fn from(dict: LogPayloadDict) -> Self {
        Self::Dict(dict)
    }
}

impl FlattenLog for LogPayload {
    fn flatten_log(&self) -> Vec<Cow<'static, str>> {
        match self {
            LogPayload::Empty => Vec::new(),
            LogPayload::Text(text) => text.flatten_log(),
            LogPayload::Dict(dict) => dict.flatten_log(),
        }
    }
}

fn indent(lines: Vec<Cow<'static, str>>) -> impl Iterator<Item = Cow<'static, str>> {
    lines
        .into_iter()
        .map(|line| format!("{}{}", NESTED_INDENT, line).into())
}

#[derive(Clone, Debug)]
pub struct LogPayloadText {
    pub lines: Vec<Cow<'static, str>>,
    pub nested: Option<Box<LogPayload>>,
}

impl<T> From<T> for LogPayloadText
where
    T: Into<Cow<'static, str>>,
{
    fn from(text: T) -> Self {
        Self::new(text)
    }
}

impl LogPayloadText {
    pub fn new(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            lines: to_lines(text),
            nested: None,
        }
    }

    pub fn with_nested(mut self, nested: impl Into<LogPayload>) -> Self {
        self.nested = Some(Box::new(nested.into()));
        self
    }
}

impl FlattenLog for LogPayloadText {
    fn flatten_log(&self) -> Vec<Cow<'static, str>> {
        let mut ret = self.lines.clone();
        if let Some(nested) = &self.nested {
            ret.extend(indent(nested.flatten_log()));
        }
        ret
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogPayloadDict {
    pub entries: Vec<(Cow<'static, str>, Cow<'static, str>)>,
    pub nested: Option<Box<LogPayload>>,
}

impl LogPayloadDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn with_nested(mut self, nested: impl Into<LogPayload>) -> Self {
        self.nested = Some(Box::new(nested.into()));
        self
    }
}

impl FlattenLog for LogPayloadDict {
    fn flatten_log(&self) -> Vec<Cow<'static, str>> {
        // Values are aligned by the longest key
        let max_key_width = self
            .entries
            .iter()
            .map(|(key, _)| str_width(key))
            .max()
            .unwrap_or(0);

        let mut ret: Vec<Cow<'static, str>> = self
            .entries
            .iter()
            .map(|(key, value)| {
                format!(
                    "{:width$} {}",
                    format!("{}:", key),
                    value,
                    width = max_key_width + 1
                )
                .into()
            })
            .collect();

        if let Some(nested) = &self.nested {
            ret.extend(indent(nested.flatten_log()));
        }
        ret
    }
}
