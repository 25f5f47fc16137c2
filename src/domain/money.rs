use std::fmt;

/// Dues are held as integer paise to avoid floating-point drift.
/// 1 rupee = 100 paise, so ₹50.00 = 5000 paise.
pub type Paise = i64;

/// Format paise as a rupee amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_paise(paise: Paise) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a rupee amount into paise.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_paise(input: &str) -> Result<Paise, ParsePaiseError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let (rupees, fraction) = match parts.as_slice() {
        [whole] => (*whole, ""),
        [whole, fraction] => (*whole, *fraction),
        _ => return Err(ParsePaiseError::InvalidFormat),
    };

    if rupees.is_empty() && fraction.is_empty() {
        return Err(ParsePaiseError::InvalidFormat);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParsePaiseError::InvalidFormat);
    }

    let rupees: i64 = if rupees.is_empty() {
        0
    } else {
        rupees.parse().map_err(|_| ParsePaiseError::InvalidFormat)?
    };

    let fraction_paise: i64 = match fraction.len() {
        0 => 0,
        // "5" means 50 paise
        1 => fraction.parse::<i64>().map_err(|_| ParsePaiseError::InvalidFormat)? * 10,
        // anything past two digits is truncated
        _ => fraction[..2]
            .parse()
            .map_err(|_| ParsePaiseError::InvalidFormat)?,
    };

    let paise = rupees
        .checked_mul(100)
        .and_then(|p| p.checked_add(fraction_paise))
        .ok_or(ParsePaiseError::InvalidFormat)?;
    Ok(if negative { -paise } else { paise })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePaiseError {
    InvalidFormat,
}

impl fmt::Display for ParsePaiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePaiseError::InvalidFormat => write!(f, "invalid amount format"),
        }
    }
}

impl std::error::Error for ParsePaiseError {}
