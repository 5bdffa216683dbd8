//! Classification of module output lines
//!
//! Every line read after a command has been acknowledged falls into exactly
//! one of these classes. Terminal markers end command processing, URCs are
//! either dispatched or captured, and everything else is an intermediate
//! response belonging to the command in flight.

/// A classified line of module output (terminator already stripped)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Terminal success marker: `OK`
    Ok,
    /// Terminal failure marker: a line beginning with `ERROR`
    Error(String),
    /// Unsolicited result code: a line beginning with `+`
    Urc(String),
    /// Blank line (acknowledgement padding between responses)
    Empty,
    /// Intermediate response code belonging to the command in flight
    Response(String),
}

impl Line {
    /// Classify a line of module output
    pub fn classify(line: &str) -> Self {
        if line.is_empty() {
            Line::Empty
        } else if line == "OK" {
            Line::Ok
        } else if line.starts_with("ERROR") {
            Line::Error(line.to_string())
        } else if line.starts_with('+') {
            Line::Urc(line.to_string())
        } else {
            Line::Response(line.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Line;

    #[test]
    fn test_classify_terminal_markers() {
        assert_eq!(Line::classify("OK"), Line::Ok);
        assert_eq!(Line::classify("ERROR"), Line::Error("ERROR".into()));
        assert_eq!(
            Line::classify("ERROR: 4"),
            Line::Error("ERROR: 4".into())
        );
    }

    #[test]
    fn test_classify_urc() {
        assert_eq!(
            Line::classify("+CEREG: 5"),
            Line::Urc("+CEREG: 5".into())
        );
    }

    #[test]
    fn test_classify_response() {
        assert_eq!(Line::classify("1"), Line::Response("1".into()));
        assert_eq!(
            Line::classify("NUESTATS: \"RADIO\",\"ECL\",0"),
            Line::Response("NUESTATS: \"RADIO\",\"ECL\",0".into())
        );
    }

    #[test]
    fn test_ok_prefix_is_not_terminal() {
        // Only an exact OK ends the exchange
        assert_eq!(Line::classify("OKAY"), Line::Response("OKAY".into()));
    }

    #[test]
    fn test_classify_empty() {
        assert_eq!(Line::classify(""), Line::Empty);
    }
}
