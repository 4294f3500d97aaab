//! Directory-backed template expander.
//!
//! Templates live in a directory named by `templates_dir`, found by walking
//! up from the requesting declaration's file. A template is plain text
//! with placeholders:
//!
//! - `{{ ClassNode.name }}` inserts a value from the context bag
//! - `{{! note }}` is a comment
//! - `{{@extension g.cs}}` sets the extension of the output unit
//!
//! Compiled templates are cached and reloaded when the file's modification
//! time changes.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use graft_compose::{TemplateContext, TemplateError, TemplateExpander, TemplateOutput};
use graft_decl::TemplateRequest;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Value { path: String, line: usize },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    extension: Option<String>,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut extension = None;
        let mut rest = source;
        let mut line = 1;

        while let Some(open) = rest.find("{{") {
            let (text, after) = rest.split_at(open);
            if !text.is_empty() {
                segments.push(Segment::Text(text.to_string()));
            }
            line += text.matches('\n').count();
            let after = &after[2..];
            let Some(close) = after.find("}}") else {
                return Err(TemplateError::Render {
                    name: name.to_string(),
                    line,
                    message: "unterminated `{{`".to_string(),
                });
            };
            let inner = &after[..close];
            rest = &after[close + 2..];
            line += inner.matches('\n').count();

            if inner.starts_with('!') {
                continue;
            }
            if let Some(directive) = inner.strip_prefix('@') {
                let mut parts = directive.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some("extension"), Some(ext)) => {
                        extension = Some(ext.trim_start_matches('.').to_string());
                    }
                    _ => {
                        return Err(TemplateError::Render {
                            name: name.to_string(),
                            line,
                            message: format!("unknown directive `{}`", directive.trim()),
                        });
                    }
                }
                rest = rest.strip_prefix('\n').unwrap_or(rest);
                continue;
            }
            let path = inner.trim();
            if path.is_empty() {
                return Err(TemplateError::Render {
                    name: name.to_string(),
                    line,
                    message: "empty placeholder".to_string(),
                });
            }
            segments.push(Segment::Value {
                path: path.to_string(),
                line,
            });
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            extension,
            segments,
        })
    }

    pub fn render(&self, context: &TemplateContext) -> Result<TemplateOutput, TemplateError> {
        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(chunk) => text.push_str(chunk),
                Segment::Value { path, line } => {
                    let value = context.lookup_path(path).ok_or_else(|| TemplateError::Render {
                        name: self.name.clone(),
                        line: *line,
                        message: format!("no value for `{path}`"),
                    })?;
                    text.push_str(&display_value(value));
                }
            }
        }
        Ok(TemplateOutput {
            text,
            extension: self.extension.clone(),
        })
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[derive(Debug)]
struct CachedTemplate {
    modified: Option<SystemTime>,
    template: Template,
}

/// Expands templates from `<templates_dir>/<name>.<extension>` files.
#[derive(Debug)]
pub struct DirTemplateExpander {
    root: PathBuf,
    dir_name: String,
    extension: String,
    cache: HashMap<PathBuf, CachedTemplate>,
}

impl DirTemplateExpander {
    /// `root` anchors relative declaration file paths.
    pub fn new(root: impl Into<PathBuf>, dir_name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dir_name: dir_name.into(),
            extension: extension.into(),
            cache: HashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn locate_dir(&self, file_path: &str) -> Result<PathBuf, TemplateError> {
        let origin = if file_path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(file_path)
        };
        let start = if origin.is_dir() {
            origin.as_path()
        } else {
            origin.parent().unwrap_or(&self.root)
        };
        start
            .ancestors()
            .map(|dir| dir.join(&self.dir_name))
            .find(|candidate| candidate.is_dir())
            .ok_or_else(|| TemplateError::DirectoryMissing {
                dir: self.dir_name.clone(),
                from: origin.clone(),
            })
    }

    fn template_path(&self, dir: &Path, name: &str) -> Result<PathBuf, TemplateError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        let suffix = format!(".{}", self.extension);
        let file = if name.ends_with(&suffix) {
            dir.join(relative)
        } else {
            dir.join(format!("{name}{suffix}"))
        };
        if escapes || name.is_empty() {
            return Err(TemplateError::NotFound {
                name: name.to_string(),
                path: file,
            });
        }
        Ok(file)
    }

    fn load(&mut self, name: &str, path: &Path) -> Result<&Template, TemplateError> {
        let metadata = fs::metadata(path).map_err(|_| TemplateError::NotFound {
            name: name.to_string(),
            path: path.to_path_buf(),
        })?;
        let modified = metadata.modified().ok();
        let stale = self
            .cache
            .get(path)
            .is_none_or(|cached| cached.modified != modified || modified.is_none());
        if stale {
            let source = fs::read_to_string(path).map_err(|source| TemplateError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let template = Template::parse(name, &source)?;
            tracing::debug!(target: "graft::templates", path = %path.display(), "compiled template");
            self.cache
                .insert(path.to_path_buf(), CachedTemplate { modified, template });
        }
        self.cache
            .get(path)
            .map(|cached| &cached.template)
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
                path: path.to_path_buf(),
            })
    }
}

impl TemplateExpander for DirTemplateExpander {
    fn expand(
        &mut self,
        request: &TemplateRequest,
        context: &TemplateContext,
    ) -> Result<TemplateOutput, TemplateError> {
        let file_path = context
            .get(graft_compose::hooks::context_keys::FILE_PATH)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let dir = self.locate_dir(&file_path)?;
        let path = self.template_path(&dir, &request.name)?;
        self.load(&request.name, &path)?.render(context)
    }
}
