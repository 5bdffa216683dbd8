//! Radio statistics parsing
//!
//! SARA-N211 reports one statistic per line in response to
//! `AT+NUESTATS="RADIO"`:
//!
//! ```text
//! NUESTATS: "RADIO","Signal power",-682
//! NUESTATS: "RADIO","Total power",-624
//! ```
//!
//! SARA-R4 reports signal quality of the serving cell in two fixed-shape
//! lines of the `AT+UCGED?` reply once quality reporting is enabled:
//!
//! ```text
//! +RSRP: 162,6300,"-112.00",
//! +RSRQ: 162,6300,"-19.70",
//! ```

use crate::error::ParseError;

/// A single `(group, name, value)` statistic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioStatistic {
    /// Statistic group, e.g. `RADIO`
    pub group: String,
    /// Statistic name, e.g. `Signal power`
    pub name: String,
    /// Reported value in the module's native unit
    pub value: i64,
}

impl RadioStatistic {
    /// Parse a statistics line
    ///
    /// Returns `Ok(None)` for lines that are not statistics at all.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let Some((category, data)) = line.split_once(':') else {
            return Ok(None);
        };
        if category.trim() != "NUESTATS" {
            return Ok(None);
        }

        let invalid = || ParseError::InvalidStatistic(line.to_string());
        let data = data.trim().replace('"', "");
        let mut parts = data.splitn(3, ',');

        let group = parts.next().ok_or_else(invalid)?.trim();
        let name = parts.next().ok_or_else(invalid)?.trim();
        let value = parts
            .next()
            .ok_or_else(invalid)?
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid())?;

        Ok(Some(Self {
            group: group.to_string(),
            name: name.to_string(),
            value,
        }))
    }
}

/// Which quality measurement a line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQualityKind {
    /// Reference signal received power (dBm)
    Rsrp,
    /// Reference signal received quality (dB)
    Rsrq,
}

/// Serving cell quality measurement
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuality {
    /// Measurement kind
    pub kind: SignalQualityKind,
    /// Physical cell id
    pub pci: u16,
    /// E-UTRA absolute radio frequency channel number
    pub earfcn: u32,
    /// Measured value
    pub value: f64,
}

impl SignalQuality {
    /// Parse an `+RSRP:` or `+RSRQ:` line
    ///
    /// Returns `Ok(None)` for any other line. Only the first (serving) cell
    /// of a multi-cell line is taken.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let kind = if line.starts_with("+RSRP:") {
            SignalQualityKind::Rsrp
        } else if line.starts_with("+RSRQ:") {
            SignalQualityKind::Rsrq
        } else {
            return Ok(None);
        };

        let invalid = || ParseError::InvalidStatistic(line.to_string());
        let data = line[6..].trim();
        let fields: Vec<&str> = data.split(',').map(|f| f.trim().trim_matches('"')).collect();
        if fields.len() < 3 {
            return Err(invalid());
        }

        Ok(Some(Self {
            kind,
            pci: fields[0].parse().map_err(|_| invalid())?,
            earfcn: fields[1].parse().map_err(|_| invalid())?,
            value: fields[2].parse().map_err(|_| invalid())?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statistic() {
        let stat = RadioStatistic::parse("NUESTATS: \"RADIO\",\"Signal power\",-682")
            .unwrap()
            .unwrap();
        assert_eq!(stat.group, "RADIO");
        assert_eq!(stat.name, "Signal power");
        assert_eq!(stat.value, -682);
    }

    #[test]
    fn test_parse_statistic_unquoted() {
        let stat = RadioStatistic::parse("NUESTATS: RADIO,Cell ID,51792")
            .unwrap()
            .unwrap();
        assert_eq!(stat.name, "Cell ID");
        assert_eq!(stat.value, 51792);
    }

    #[test]
    fn test_non_statistic_line() {
        assert_eq!(RadioStatistic::parse("OK"), Ok(None));
        assert_eq!(RadioStatistic::parse("+CSCON: 1"), Ok(None));
    }

    #[test]
    fn test_malformed_statistic() {
        assert!(RadioStatistic::parse("NUESTATS: \"RADIO\",\"ECL\",high").is_err());
        assert!(RadioStatistic::parse("NUESTATS: \"RADIO\"").is_err());
    }

    #[test]
    fn test_parse_rsrp() {
        let q = SignalQuality::parse("+RSRP: 162,6300,\"-112.00\",")
            .unwrap()
            .unwrap();
        assert_eq!(q.kind, SignalQualityKind::Rsrp);
        assert_eq!(q.pci, 162);
        assert_eq!(q.earfcn, 6300);
        assert_eq!(q.value, -112.0);
    }

    #[test]
    fn test_parse_rsrq_takes_serving_cell() {
        let q = SignalQuality::parse("+RSRQ: 162,6300,\"-19.70\",187,6300,\"-8.00\",")
            .unwrap()
            .unwrap();
        assert_eq!(q.kind, SignalQualityKind::Rsrq);
        assert_eq!(q.value, -19.7);
    }

    #[test]
    fn test_malformed_quality() {
        assert!(SignalQuality::parse("+RSRP: 162").is_err());
        assert_eq!(SignalQuality::parse("+UCGED: 5"), Ok(None));
    }
}
