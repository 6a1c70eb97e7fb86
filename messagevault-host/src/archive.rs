use std::path::{Path, PathBuf};

use messagevault_core::MessageType;
use serde::Serialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::warn;

const SNIPPET_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchivedMessage {
    pub prisoner: String,
    pub message_type: MessageType,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    pub content: String,
    pub path: PathBuf,
}

impl ArchivedMessage {
    pub fn snippet(&self) -> String {
        let flat = self.content.replace('\n', " ");
        let mut snippet: String = flat.chars().take(SNIPPET_CHARS).collect();
        if self.content.chars().count() > SNIPPET_CHARS {
            snippet.push_str("...");
        }
        snippet
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFilter {
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub keyword: Option<String>,
    /// `None` keeps both directions.
    pub message_type: Option<MessageType>,
}

impl ArchiveFilter {
    pub fn matches(&self, message: &ArchivedMessage) -> bool {
        let date = message.received_at.date();
        if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
            return false;
        }
        if self
            .message_type
            .is_some_and(|wanted| wanted != message.message_type)
        {
            return false;
        }
        match self.keyword.as_deref().map(str::to_lowercase) {
            Some(keyword) if !keyword.is_empty() => {
                message.content.to_lowercase().contains(&keyword)
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, messages: &'a [ArchivedMessage]) -> Vec<&'a ArchivedMessage> {
        messages.iter().filter(|m| self.matches(m)).collect()
    }
}

/// Walks `<name>/<sent|received>/<year>/<month>/*.txt` under `root`, newest
/// first. Entries that do not fit the layout are skipped.
pub fn load_messages(root: &Path) -> Vec<ArchivedMessage> {
    let mut messages = Vec::new();
    for prisoner_dir in subdirs(root) {
        let prisoner = file_name(&prisoner_dir);
        for type_dir in subdirs(&prisoner_dir) {
            let message_type = match file_name(&type_dir).as_str() {
                "sent" => MessageType::Sent,
                "received" => MessageType::Received,
                _ => continue,
            };
            for year_dir in subdirs(&type_dir).into_iter().filter(|d| is_numeric(d)) {
                for month_dir in subdirs(&year_dir).into_iter().filter(|d| is_numeric(d)) {
                    for file in text_files(&month_dir) {
                        match read_entry(&file) {
                            Ok((received_at, content)) => messages.push(ArchivedMessage {
                                prisoner: prisoner.clone(),
                                message_type,
                                received_at,
                                content,
                                path: file,
                            }),
                            Err(reason) => {
                                warn!(path = %file.display(), "skipping archive entry: {reason}")
                            }
                        }
                    }
                }
            }
        }
    }
    messages.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    messages
}

/// Reads the UTC time from a `YYYY-MM-DD_HH-MM-SS...` file stem.
pub fn parse_filename_time(stem: &str) -> Option<OffsetDateTime> {
    let prefix = stem.get(..19)?;
    PrimitiveDateTime::parse(
        prefix,
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]"),
    )
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

fn read_entry(file: &Path) -> Result<(OffsetDateTime, String), String> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "non-utf8 filename".to_string())?;
    let received_at =
        parse_filename_time(stem).ok_or_else(|| format!("invalid filename format: {stem}"))?;
    let content = std::fs::read_to_string(file).map_err(|err| err.to_string())?;
    Ok((received_at, content))
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    entries(dir).into_iter().filter(|p| p.is_dir()).collect()
}

fn text_files(dir: &Path) -> Vec<PathBuf> {
    entries(dir)
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .collect()
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(read) => read.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_numeric(path: &Path) -> bool {
    let name = file_name(path);
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}
