//! Token extraction from free-text plan order lines.

use super::{normalize_token, MatchTier, OrderKind};
use once_cell::sync::Lazy;
use regex::Regex;

static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(lab|imaging|referral|rx|prescription)\s*:\s*(.*)$")
        .expect("order keyword pattern is valid")
});

static CPT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CPT:\s*(\d+)").expect("cpt token pattern is valid"));

static CPT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\s*CPT:|\bCPT:").expect("cpt marker pattern is valid"));

static CPT_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*CPT:\s*(\d+)\s*\)").expect("cpt display pattern is valid")
});

/// Normalised identifying tokens of a classified order line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLine {
    pub kind: OrderKind,
    pub code: Option<String>,
    pub cpt: Option<String>,
    pub name: Option<String>,
}

impl OrderLine {
    /// Classify `line` by its leading keyword and extract tokens. Lines without a recognised
    /// keyword return `None` and can never match a canonical order.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = KEYWORD.captures(line.trim())?;
        let body = caps.get(2).map_or("", |m| m.as_str());

        let parsed = match caps[1].to_ascii_lowercase().as_str() {
            "lab" => parse_lab(body),
            "imaging" => parse_imaging(body),
            "referral" => Self {
                kind: OrderKind::Referral,
                code: None,
                cpt: None,
                name: normalize_token(body.split('-').next().unwrap_or_default()),
            },
            _ => Self {
                kind: OrderKind::Prescription,
                code: None,
                cpt: None,
                name: normalize_token(body),
            },
        };
        Some(parsed)
    }

    /// Token compared at `tier`, if the line carries one.
    pub fn key(&self, tier: MatchTier) -> Option<&str> {
        match tier {
            MatchTier::Code => self.code.as_deref(),
            MatchTier::Cpt => self.cpt.as_deref(),
            MatchTier::Name => self.name.as_deref(),
        }
    }
}

fn parse_lab(body: &str) -> OrderLine {
    let (name, bracket) = match body.split_once('[') {
        Some((name, rest)) => (name, rest.split(']').next().unwrap_or_default()),
        None => (body, ""),
    };

    let mut code = None;
    let mut cpt = None;
    for token in bracket.split(',') {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "quest" | "labcorp" | "code" => code = code.or_else(|| normalize_token(value)),
            "cpt" => cpt = cpt.or_else(|| normalize_token(value)),
            _ => {}
        }
    }

    OrderLine {
        kind: OrderKind::Lab,
        code,
        cpt,
        name: normalize_token(name),
    }
}

fn parse_imaging(body: &str) -> OrderLine {
    let bracket_at = body.find('[');
    let cpt_at = CPT_MARKER.find(body).map(|m| m.start());
    let name_end = match (bracket_at, cpt_at) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => body.len(),
    };

    OrderLine {
        kind: OrderKind::Imaging,
        code: None,
        cpt: CPT_TOKEN
            .captures(body)
            .and_then(|caps| normalize_token(&caps[1])),
        name: normalize_token(&body[..name_end]),
    }
}

/// Display label for a line rendered as plain text: the canonical spelling of its keyword,
/// or `Order` when the line has none.
pub fn fallback_label(line: &str) -> &'static str {
    let Some(caps) = KEYWORD.captures(line.trim()) else {
        return "Order";
    };
    match caps[1].to_ascii_lowercase().as_str() {
        "lab" => "Lab",
        "imaging" => "Imaging",
        "referral" => "Referral",
        "rx" => "Rx",
        _ => "Prescription",
    }
}

/// Text after the first colon, or the whole line when there is no colon.
pub fn fallback_body(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed
        .split_once(':')
        .map_or(trimmed, |(_, rest)| rest.trim())
}

/// CPT number from a `(CPT: n)` group, if present.
pub fn display_cpt(line: &str) -> Option<String> {
    CPT_PAREN.captures(line).map(|caps| caps[1].to_string())
}
