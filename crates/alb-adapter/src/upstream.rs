//! The nginx upstream file.
//!
//! The file is split into `upstream NAME { ... }` blocks and everything
//! else. Only blocks are ever replaced; other text and other groups'
//! blocks are written back exactly as they were read.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::WeightedServer;

static UPSTREAM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*upstream\s+([^\s{]+)\s*\{").expect("upstream header regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Lines outside any upstream block, newline-terminated.
    Text(String),
    /// A complete upstream block as text, newline-terminated.
    Upstream { name: String, text: String },
}

/// Parsed upstream file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamFile {
    segments: Vec<Segment>,
}

impl UpstreamFile {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut block: Option<(String, String, i32)> = None;

        for line in source.lines() {
            if let Some((name, mut body, depth)) = block.take() {
                body.push_str(line);
                body.push('\n');
                let depth = depth + brace_delta(line);
                if depth <= 0 {
                    segments.push(Segment::Upstream { name, text: body });
                } else {
                    block = Some((name, body, depth));
                }
                continue;
            }

            if let Some(caps) = UPSTREAM_HEADER.captures(line) {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                let name = caps[1].to_string();
                let body = format!("{line}\n");
                let depth = brace_delta(line);
                if depth <= 0 {
                    segments.push(Segment::Upstream { name, text: body });
                } else {
                    block = Some((name, body, depth));
                }
                continue;
            }

            text.push_str(line);
            text.push('\n');
        }

        // An unterminated block is kept verbatim as text.
        if let Some((_, body, _)) = block {
            text.push_str(&body);
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self { segments }
    }

    /// Names of all upstream blocks, in file order.
    pub fn upstreams(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Upstream { name, .. } => Some(name.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Raw text of the named block, if present.
    pub fn block(&self, name: &str) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            Segment::Upstream { name: n, text } if n == name => Some(text.as_str()),
            _ => None,
        })
    }

    /// Drop every block with this name. Absent names are a no-op.
    pub fn remove(&mut self, name: &str) {
        self.segments
            .retain(|s| !matches!(s, Segment::Upstream { name: n, .. } if n == name));
    }

    /// Replace the named block with one listing `servers` in order.
    ///
    /// An empty server list still produces a block, so the proxy sees an
    /// explicit "no backends" instead of whatever was there before.
    pub fn replace(&mut self, name: &str, servers: &[WeightedServer]) {
        self.remove(name);
        self.segments.push(Segment::Upstream {
            name: name.to_string(),
            text: render_block(name, servers),
        });
    }

    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Text(text) => text.as_str(),
                Segment::Upstream { text, .. } => text.as_str(),
            })
            .collect()
    }
}

fn render_block(name: &str, servers: &[WeightedServer]) -> String {
    let mut out = format!("upstream {name} {{\n");
    for server in servers {
        out.push_str("    ");
        out.push_str(&server.directive());
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}
