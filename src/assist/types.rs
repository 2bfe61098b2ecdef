use serde::{Deserialize, Serialize};

use crate::inventory::scan::validate_image_ref;

pub const MAX_TRANSCRIPT_CHARS: usize = 4000;
/// Most recent turns forwarded to the model.
pub const MAX_HISTORY_TURNS: usize = 6;
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveAssistRequest {
    pub transcript: String,
    /// Current camera frame as an http(s) URL or image data URI.
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl LiveAssistRequest {
    /// Trims input, rejects empty or oversized transcripts and keeps only
    /// the last few non-empty history turns.
    pub fn normalize(&mut self) -> Result<(), String> {
        self.transcript = self.transcript.trim().to_string();
        if self.transcript.is_empty() {
            return Err("transcript must not be empty".into());
        }
        if self.transcript.chars().count() > MAX_TRANSCRIPT_CHARS {
            return Err(format!(
                "transcript must be at most {} characters",
                MAX_TRANSCRIPT_CHARS
            ));
        }

        if let Some(frame) = self.frame.take() {
            let frame = frame.trim().to_string();
            if !frame.is_empty() {
                validate_image_ref(&frame)?;
                self.frame = Some(frame);
            }
        }

        self.history.retain_mut(|t| {
            t.text = t.text.trim().to_string();
            !t.text.is_empty()
        });
        let excess = self.history.len().saturating_sub(MAX_HISTORY_TURNS);
        self.history.drain(..excess);
        Ok(())
    }

    pub fn prompt(&self) -> String {
        let mut out = String::new();
        if !self.history.is_empty() {
            out.push_str("Conversation so far:\n");
            for turn in &self.history {
                let who = match turn.role {
                    Speaker::User => "User",
                    Speaker::Assistant => "Coach",
                };
                out.push_str(&format!("{}: {}\n", who, turn.text));
            }
            out.push('\n');
        }
        if self.frame.is_some() {
            out.push_str("The attached image is the user's camera view right now.\n");
        }
        out.push_str(&format!("User just said: {}", self.transcript));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveAssistReply {
    pub reply: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl LiveAssistReply {
    pub fn tidy(mut self) -> Self {
        self.reply = self.reply.trim().to_string();
        self.suggestions.retain_mut(|s| {
            *s = s.trim().to_string();
            !s.is_empty()
        });
        self.suggestions.truncate(MAX_SUGGESTIONS);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub text: String,
}

/// Audio formats the transcription endpoint accepts.
pub fn audio_ext_from_mime(ct: &str) -> Option<&'static str> {
    let base = ct.split(';').next().unwrap_or(ct).trim();
    match base {
        "audio/webm" | "video/webm" => Some("webm"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/ogg" => Some("ogg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Speaker, text: &str) -> Turn {
        Turn {
            role,
            text: text.into(),
        }
    }

    #[test]
    fn history_is_trimmed_to_recent_turns() {
        let mut req = LiveAssistRequest {
            transcript: "  is this pan hot enough? ".into(),
            frame: Some(" ".into()),
            history: (0..10)
                .map(|i| turn(Speaker::User, &format!("turn {}", i)))
                .chain([turn(Speaker::Assistant, "   ")])
                .collect(),
        };
        req.normalize().unwrap();
        assert_eq!(req.transcript, "is this pan hot enough?");
        assert!(req.frame.is_none());
        assert_eq!(req.history.len(), MAX_HISTORY_TURNS);
        assert_eq!(req.history[0].text, "turn 4");
        assert_eq!(req.history.last().unwrap().text, "turn 9");
    }

    #[test]
    fn rejects_bad_input() {
        let mut empty = LiveAssistRequest {
            transcript: "   ".into(),
            frame: None,
            history: vec![],
        };
        assert!(empty.normalize().is_err());

        let mut bad_frame = LiveAssistRequest {
            transcript: "hi".into(),
            frame: Some("ftp://example.com/x.jpg".into()),
            history: vec![],
        };
        assert!(bad_frame.normalize().is_err());
    }

    #[test]
    fn prompt_mentions_frame_and_history() {
        let req = LiveAssistRequest {
            transcript: "what next?".into(),
            frame: Some("https://example.com/f.jpg".into()),
            history: vec![
                turn(Speaker::User, "I'm making risotto"),
                turn(Speaker::Assistant, "Toast the rice first."),
            ],
        };
        let prompt = req.prompt();
        assert!(prompt.contains("User: I'm making risotto\nCoach: Toast the rice first."));
        assert!(prompt.contains("camera view"));
        assert!(prompt.ends_with("User just said: what next?"));
    }

    #[test]
    fn reply_is_tidied() {
        let reply = LiveAssistReply {
            reply: " Stir now. ".into(),
            suggestions: vec!["a".into(), " ".into(), "b".into(), "c".into(), "d".into()],
        }
        .tidy();
        assert_eq!(reply.reply, "Stir now.");
        assert_eq!(reply.suggestions, vec!["a", "b", "c"]);
    }

    #[test]
    fn audio_types() {
        assert_eq!(audio_ext_from_mime("audio/webm;codecs=opus"), Some("webm"));
        assert_eq!(audio_ext_from_mime("audio/mpeg"), Some("mp3"));
        assert_eq!(audio_ext_from_mime("image/png"), None);
    }
}
