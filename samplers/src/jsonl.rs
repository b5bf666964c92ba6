//! JSON-lines sources

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use osbench_core::SourceItem;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};

/// A file holding one JSON object per line
///
/// Item ids come from the object's `_id` field (removed from the content,
/// since the service rejects it inside a document), then from `id`, and
/// otherwise from the running item number. Blank lines are ignored;
/// malformed lines are logged and skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    /// Check that `path` is a readable file
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&path).map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
        if !meta.is_file() {
            return Err(SourceError::NotAFile(path));
        }
        Ok(Self { path })
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One pass over the file
    pub fn iter(&self) -> SourceResult<JsonLines> {
        self.pass(0)
    }

    /// Number of items one pass yields
    pub fn count(&self) -> SourceResult<usize> {
        Ok(self.iter()?.count())
    }

    /// Yield exactly `total` items, reopening the file as often as needed
    ///
    /// Fails up front if the file holds no valid item. Ids that fall back to
    /// the item number keep counting across passes, so they stay unique.
    pub fn cycle(&self, total: usize) -> SourceResult<Cycle> {
        if self.iter()?.next().is_none() {
            return Err(SourceError::Empty(self.path.clone()));
        }
        Ok(Cycle {
            source: self.clone(),
            current: Some(self.pass(0)?),
            remaining: total,
            yielded_in_pass: 0,
            passes: 1,
        })
    }

    fn pass(&self, first_ordinal: usize) -> SourceResult<JsonLines> {
        let file = File::open(&self.path).map_err(|source| SourceError::Open {
            path: self.path.clone(),
            source,
        })?;
        Ok(JsonLines {
            lines: BufReader::new(file).lines(),
            path: self.path.clone(),
            line: 0,
            ordinal: first_ordinal,
            skipped: 0,
            done: false,
        })
    }
}

/// Iterator over one pass of a [`JsonLinesSource`]
#[derive(Debug)]
pub struct JsonLines {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line: usize,
    ordinal: usize,
    skipped: usize,
    done: bool,
}

impl JsonLines {
    /// Lines skipped so far as malformed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        warn!(
            path = %self.path.display(),
            line = self.line,
            reason,
            "Skipping source line"
        );
    }
}

impl Iterator for JsonLines {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        while !self.done {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!(
                        path = %self.path.display(),
                        line = self.line + 1,
                        error = %e,
                        "Read failed, ending source"
                    );
                    self.done = true;
                    break;
                }
                None => {
                    self.done = true;
                    break;
                }
            };
            self.line += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(trimmed) {
                Ok(Value::Object(mut map)) => {
                    let id = take_id(&mut map).unwrap_or_else(|| self.ordinal.to_string());
                    self.ordinal += 1;
                    return Some(SourceItem::new(id, Value::Object(map)));
                }
                Ok(_) => self.skip("not a JSON object"),
                Err(e) => self.skip(&e.to_string()),
            }
        }
        None
    }
}

fn take_id(map: &mut Map<String, Value>) -> Option<String> {
    if let Some(id) = map.remove("_id").and_then(id_string) {
        return Some(id);
    }
    map.get("id").cloned().and_then(id_string)
}

fn id_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A [`JsonLinesSource`] repeated until a fixed number of items is yielded
#[derive(Debug)]
pub struct Cycle {
    source: JsonLinesSource,
    current: Option<JsonLines>,
    remaining: usize,
    yielded_in_pass: usize,
    passes: usize,
}

impl Cycle {
    /// Passes started so far
    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl Iterator for Cycle {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        if self.remaining == 0 {
            return None;
        }

        loop {
            let pass = self.current.as_mut()?;
            if let Some(item) = pass.next() {
                self.remaining -= 1;
                self.yielded_in_pass += 1;
                return Some(item);
            }

            // the file changed under us and now holds nothing usable
            if self.yielded_in_pass == 0 {
                warn!(path = %self.source.path.display(), "Pass yielded no items, stopping");
                self.current = None;
                return None;
            }

            let next_ordinal = pass.ordinal;
            match self.source.pass(next_ordinal) {
                Ok(next) => {
                    self.current = Some(next);
                    self.yielded_in_pass = 0;
                    self.passes += 1;
                    debug!(pass = self.passes, remaining = self.remaining, "Restarting source");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to reopen source, stopping");
                    self.current = None;
                    return None;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
