//! WebVTT subset parsing and subtitle text rendering.
//!
//! Caption files carry a `WEBVTT` header, optional numeric cue identifiers,
//! `start --> end` timing lines and one or more text lines per cue. Cue text
//! supports two formatting directives: `\strong <text>` emphasises the rest
//! of the line, and line breaks render as `<br>`.

/// A single subtitle cue
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start_ms: u32,
    pub end_ms: u32,
    /// Raw cue text; lines joined with '\n'. Render with [`render`].
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubtitleError {
    #[error("failed to read caption file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed timestamp '{0}'")]
    BadTimestamp(String),
    #[error("malformed cue timing '{text}' on line {line}")]
    BadCue { line: usize, text: String },
}

/// Parse a `HH:MM:SS.mmm` or `MM:SS.mmm` timestamp into seconds.
pub fn parse_timestamp(s: &str) -> Result<f64, SubtitleError> {
    let bad = || SubtitleError::BadTimestamp(s.to_string());
    let parts: Vec<&str> = s.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, sec] => (
            h.parse::<f64>().map_err(|_| bad())?,
            m.parse::<f64>().map_err(|_| bad())?,
            sec.parse::<f64>().map_err(|_| bad())?,
        ),
        [m, sec] => (
            0.0,
            m.parse::<f64>().map_err(|_| bad())?,
            sec.parse::<f64>().map_err(|_| bad())?,
        ),
        _ => return Err(bad()),
    };
    if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(bad());
    }
    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Parse a WebVTT-subset document into cues.
///
/// Header line, blank lines and bare cue identifiers are skipped; a line
/// containing `-->` starts a cue whose text runs until the next blank line.
pub fn parse_vtt(src: &str) -> Result<Vec<Cue>, SubtitleError> {
    let mut cues = Vec::new();
    let mut lines = src.lines().enumerate().peekable();

    while let Some((lineno, raw)) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("WEBVTT") || line.starts_with("NOTE") {
            continue;
        }
        let Some((start, end)) = line.split_once("-->") else {
            // Bare cue identifier — skipped
            continue;
        };
        let start_s = parse_timestamp(start.trim()).map_err(|_| SubtitleError::BadCue {
            line: lineno + 1,
            text: line.to_string(),
        })?;
        let end_s = parse_timestamp(end.trim()).map_err(|_| SubtitleError::BadCue {
            line: lineno + 1,
            text: line.to_string(),
        })?;

        let mut text_lines = Vec::new();
        while let Some((_, next)) = lines.peek() {
            if next.trim().is_empty() {
                lines.next();
                break;
            }
            text_lines.push(next.trim().to_string());
            lines.next();
        }

        cues.push(Cue {
            start_ms: (start_s * 1000.0).round() as u32,
            end_ms: (end_s * 1000.0).round() as u32,
            text: text_lines.join("\n"),
        });
    }
    Ok(cues)
}

/// Render cue text for display: `\strong <rest of line>` becomes
/// `<strong>…</strong>`, line breaks become `<br>`.
pub fn render(text: &str) -> String {
    let rendered: Vec<String> = text
        .split('\n')
        .map(|line| match line.find("\\strong") {
            Some(pos) => {
                let prefix = &line[..pos];
                let rest = line[pos + "\\strong".len()..].trim_start();
                format!("{prefix}<strong>{rest}</strong>")
            }
            None => line.to_string(),
        })
        .collect();
    rendered.join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_with_hours() {
        assert_eq!(parse_timestamp("00:01:02.500").unwrap(), 62.5);
    }

    #[test]
    fn timestamp_without_hours() {
        assert_eq!(parse_timestamp("01:02.500").unwrap(), 62.5);
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(parse_timestamp("abc").is_err());
        assert!(parse_timestamp("1:2:3:4").is_err());
        assert!(parse_timestamp("00:75.000").is_err());
    }

    #[test]
    fn parses_cues_with_identifiers() {
        let src = "WEBVTT\n\n1\n00:00.000 --> 00:02.500\nBonjour\n\n2\n00:03.000 --> 00:01:00.000\nDeuxième ligne\nsuite\n";
        let cues = parse_vtt(src).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_ms, 0);
        assert_eq!(cues[0].end_ms, 2500);
        assert_eq!(cues[0].text, "Bonjour");
        assert_eq!(cues[1].end_ms, 60_000);
        assert_eq!(cues[1].text, "Deuxième ligne\nsuite");
    }

    #[test]
    fn bad_timing_line_reports_line_number() {
        let src = "WEBVTT\n\nnot-a-time --> 00:02.000\nText\n";
        match parse_vtt(src) {
            Err(SubtitleError::BadCue { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected BadCue, got {other:?}"),
        }
    }

    #[test]
    fn render_strong_directive() {
        assert_eq!(
            render("Regarde \\strong les empreintes"),
            "Regarde <strong>les empreintes</strong>"
        );
    }

    #[test]
    fn render_line_breaks() {
        assert_eq!(render("une\ndeux"), "une<br>deux");
    }

    #[test]
    fn render_mixed() {
        assert_eq!(
            render("\\strong Attention\nau vison"),
            "<strong>Attention</strong><br>au vison"
        );
    }
}
