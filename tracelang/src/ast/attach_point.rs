//! Attach points: where a probe is hooked into the traced system.

use std::fmt::{self, Display, Formatter};

use crate::source::InputSpan;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProbeType {
    Special,
    Kprobe,
    Kretprobe,
    Uprobe,
    Uretprobe,
    Usdt,
    Tracepoint,
    RawTracepoint,
    Profile,
    Interval,
    Software,
    Hardware,
    Watchpoint,
    AsyncWatchpoint,
    Fentry,
    Fexit,
    Iter,
}

impl ProbeType {
    /// Resolves a provider name or its short alias.
    pub fn from_provider(provider: &str) -> Option<ProbeType> {
        let probe_type = match provider {
            "BEGIN" | "END" => ProbeType::Special,
            "kprobe" | "k" => ProbeType::Kprobe,
            "kretprobe" | "kr" => ProbeType::Kretprobe,
            "uprobe" | "u" => ProbeType::Uprobe,
            "uretprobe" | "ur" => ProbeType::Uretprobe,
            "usdt" | "U" => ProbeType::Usdt,
            "tracepoint" | "t" => ProbeType::Tracepoint,
            "rawtracepoint" | "rt" => ProbeType::RawTracepoint,
            "profile" | "p" => ProbeType::Profile,
            "interval" | "i" => ProbeType::Interval,
            "software" | "s" => ProbeType::Software,
            "hardware" | "h" => ProbeType::Hardware,
            "watchpoint" | "w" => ProbeType::Watchpoint,
            "asyncwatchpoint" | "aw" => ProbeType::AsyncWatchpoint,
            "fentry" | "f" => ProbeType::Fentry,
            "fexit" | "fr" => ProbeType::Fexit,
            "iter" | "it" => ProbeType::Iter,
            _ => return None,
        };
        Some(probe_type)
    }

    pub fn name(self) -> &'static str {
        match self {
            ProbeType::Special => "special",
            ProbeType::Kprobe => "kprobe",
            ProbeType::Kretprobe => "kretprobe",
            ProbeType::Uprobe => "uprobe",
            ProbeType::Uretprobe => "uretprobe",
            ProbeType::Usdt => "usdt",
            ProbeType::Tracepoint => "tracepoint",
            ProbeType::RawTracepoint => "rawtracepoint",
            ProbeType::Profile => "profile",
            ProbeType::Interval => "interval",
            ProbeType::Software => "software",
            ProbeType::Hardware => "hardware",
            ProbeType::Watchpoint => "watchpoint",
            ProbeType::AsyncWatchpoint => "asyncwatchpoint",
            ProbeType::Fentry => "fentry",
            ProbeType::Fexit => "fexit",
            ProbeType::Iter => "iter",
        }
    }

    /// Probes whose `args` come from a function signature.
    pub fn has_typed_args(self) -> bool {
        match self {
            ProbeType::Fentry | ProbeType::Fexit | ProbeType::Uprobe | ProbeType::Uretprobe => {
                true
            }
            _ => false,
        }
    }

    pub fn is_return(self) -> bool {
        match self {
            ProbeType::Kretprobe | ProbeType::Uretprobe | ProbeType::Fexit => true,
            _ => false,
        }
    }
}

impl Display for ProbeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachPoint {
    pub loc: InputSpan,
    pub raw_input: String,
    pub provider: String,
    pub target: String,
    pub lang: String,
    pub ns: String,
    pub func: String,
    pub freq: u64,
    pub len: u64,
    pub mode: String,
    pub address: u64,
    pub func_offset: u64,
    pub index: usize,
}

impl AttachPoint {
    /// Splits the raw text of an attach point into its parts.
    pub fn parse(raw_input: &str, loc: InputSpan) -> Result<AttachPoint, String> {
        let parts: Vec<&str> = raw_input.split(':').collect();
        let provider = parts[0];
        let probe_type = ProbeType::from_provider(provider)
            .ok_or_else(|| format!("unknown probe type `{}`", provider))?;

        let mut ap = AttachPoint {
            loc,
            raw_input: raw_input.to_string(),
            provider: probe_type_provider(probe_type, provider),
            ..AttachPoint::default()
        };
        let rest = &parts[1..];

        match probe_type {
            ProbeType::Special => {
                expect_parts(rest, 0, 0)?;
            }
            ProbeType::Kprobe | ProbeType::Kretprobe | ProbeType::Fentry | ProbeType::Fexit => {
                expect_parts(rest, 1, 2)?;
                let (module, func) = split_optional_prefix(rest);
                ap.target = module.to_string();
                let (func, offset) = split_offset(func)?;
                ap.func = func.to_string();
                ap.func_offset = offset;
            }
            ProbeType::Uprobe | ProbeType::Uretprobe => {
                expect_parts(rest, 2, 3)?;
                ap.target = rest[0].to_string();
                let func = if rest.len() == 3 {
                    ap.lang = rest[1].to_string();
                    rest[2]
                } else {
                    rest[1]
                };
                match parse_number(func) {
                    Some(address) => ap.address = address,
                    None => {
                        let (func, offset) = split_offset(func)?;
                        ap.func = func.to_string();
                        ap.func_offset = offset;
                    }
                }
            }
            ProbeType::Usdt => {
                expect_parts(rest, 2, 3)?;
                ap.target = rest[0].to_string();
                if rest.len() == 3 {
                    ap.ns = rest[1].to_string();
                }
                ap.func = rest[rest.len() - 1].to_string();
            }
            ProbeType::Tracepoint => {
                expect_parts(rest, 2, 2)?;
                ap.target = rest[0].to_string();
                ap.func = rest[1].to_string();
            }
            ProbeType::RawTracepoint => {
                expect_parts(rest, 1, 2)?;
                let (module, func) = split_optional_prefix(rest);
                ap.target = module.to_string();
                ap.func = func.to_string();
            }
            ProbeType::Profile | ProbeType::Interval => {
                expect_parts(rest, 1, 2)?;
                let (unit, rate) = match rest {
                    [rate] => ("hz", *rate),
                    [unit, rate] => (*unit, *rate),
                    _ => unreachable!(),
                };
                if !["hz", "s", "ms", "us"].contains(&unit) {
                    return Err(format!("invalid time unit `{}`", unit));
                }
                ap.target = unit.to_string();
                ap.freq = parse_number(rate)
                    .ok_or_else(|| format!("invalid rate `{}`", rate))?;
            }
            ProbeType::Software | ProbeType::Hardware => {
                expect_parts(rest, 1, 2)?;
                ap.target = rest[0].to_string();
                if let Some(count) = rest.get(1) {
                    ap.freq = parse_number(count)
                        .ok_or_else(|| format!("invalid count `{}`", count))?;
                }
            }
            ProbeType::Watchpoint | ProbeType::AsyncWatchpoint => {
                expect_parts(rest, 3, 3)?;
                ap.address = parse_number(rest[0])
                    .ok_or_else(|| format!("invalid address `{}`", rest[0]))?;
                ap.len = parse_number(rest[1])
                    .ok_or_else(|| format!("invalid length `{}`", rest[1]))?;
                if rest[2].is_empty() || !rest[2].chars().all(|c| "rwx".contains(c)) {
                    return Err(format!("invalid watchpoint mode `{}`", rest[2]));
                }
                ap.mode = rest[2].to_string();
            }
            ProbeType::Iter => {
                expect_parts(rest, 1, 2)?;
                ap.func = rest[0].to_string();
                if let Some(pin) = rest.get(1) {
                    ap.target = pin.to_string();
                }
            }
        }

        Ok(ap)
    }

    pub fn probe_type(&self) -> Option<ProbeType> {
        ProbeType::from_provider(&self.provider)
    }

    /// Canonical name: the non-empty parts joined with ':'.
    pub fn name(&self) -> String {
        let mut parts = vec![self.provider.clone()];
        for part in &[&self.target, &self.lang, &self.ns] {
            if !part.is_empty() {
                parts.push(part.to_string());
            }
        }
        if !self.func.is_empty() {
            if self.func_offset != 0 {
                parts.push(format!("{}+{}", self.func, self.func_offset));
            } else {
                parts.push(self.func.clone());
            }
        }
        if self.address != 0 {
            parts.push(self.address.to_string());
        }
        if self.freq != 0 {
            parts.push(self.freq.to_string());
        }
        if self.len != 0 {
            parts.push(self.len.to_string());
        }
        if !self.mode.is_empty() {
            parts.push(self.mode.clone());
        }
        parts.join(":")
    }
}

fn probe_type_provider(probe_type: ProbeType, provider: &str) -> String {
    match probe_type {
        ProbeType::Special => provider.to_string(),
        other => other.name().to_string(),
    }
}

fn expect_parts(parts: &[&str], min: usize, max: usize) -> Result<(), String> {
    if parts.len() < min || parts.len() > max {
        return Err(if min == max {
            format!("expected {} parts after the probe type", min)
        } else {
            format!("expected {} to {} parts after the probe type", min, max)
        });
    }
    Ok(())
}

fn split_optional_prefix<'a>(parts: &[&'a str]) -> (&'a str, &'a str) {
    match parts {
        [func] => ("", *func),
        [prefix, func] => (*prefix, *func),
        _ => ("", ""),
    }
}

fn split_offset(func: &str) -> Result<(&str, u64), String> {
    match func.find('+') {
        Some(pos) => {
            let offset = &func[pos + 1..];
            let offset =
                parse_number(offset).ok_or_else(|| format!("invalid offset `{}`", offset))?;
            Ok((&func[..pos], offset))
        }
        None => Ok((func, 0)),
    }
}

fn parse_number(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
