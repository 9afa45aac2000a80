//! Append-only, role-tagged transcript text.
//!
//! Rendering concatenates segment text in order; the role tag only drives
//! styling. Adjacent appends under the same role are merged so a streamed
//! reply stays one segment.

use agent_gateway::Role;

/// A run of text appended under one role tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    segments: Vec<Segment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, text: &str) {
        if text.is_empty() {
            return;
        }

        match self.segments.last_mut() {
            Some(last) if last.role == role => last.text.push_str(text),
            _ => self.segments.push(Segment {
                role,
                text: text.to_string(),
            }),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect()
    }

    /// Splits the transcript into display lines of role-tagged spans.
    ///
    /// A trailing newline opens an empty last line, which is where the next
    /// streamed text will land.
    pub fn lines(&self) -> Vec<Vec<Segment>> {
        let mut lines: Vec<Vec<Segment>> = vec![Vec::new()];

        for segment in &self.segments {
            for (index, piece) in segment.text.split('\n').enumerate() {
                if index > 0 {
                    lines.push(Vec::new());
                }
                if piece.is_empty() {
                    continue;
                }
                if let Some(line) = lines.last_mut() {
                    line.push(Segment {
                        role: segment.role,
                        text: piece.to_string(),
                    });
                }
            }
        }

        lines
    }
}
