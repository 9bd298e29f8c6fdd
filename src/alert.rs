/// PM10 index at which air becomes unhealthy (US-EPA 2016 scale).
pub const UNHEALTHY_THRESHOLD: i64 = 100;
/// PM10 index at which air becomes hazardous.
pub const HAZARDOUS_THRESHOLD: i64 = 300;

/// Tag of a threshold crossing between two consecutive readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Unhealthy,
    Hazardous,
    Good,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Unhealthy => write!(f, "unhealthy"),
            AlertLevel::Hazardous => write!(f, "hazardous"),
            AlertLevel::Good => write!(f, "good"),
        }
    }
}

/// Compare the previous PM10 index with the new one.
///
/// The first matching rule wins. A reading that reaches the hazardous
/// threshold from below reports `Hazardous` even when it also crossed
/// the unhealthy threshold on the way (90 -> 350), and a drop from 350
/// to 50 only reports `Good`. Without a previous value nothing is
/// reported.
pub fn evaluate(previous: Option<i64>, current: i64) -> Option<AlertLevel> {
    let previous = previous?;

    let crossed_up = |threshold| previous < threshold && current >= threshold;

    if crossed_up(HAZARDOUS_THRESHOLD) && previous < UNHEALTHY_THRESHOLD {
        // skipped the unhealthy band entirely
        Some(AlertLevel::Hazardous)
    } else if crossed_up(UNHEALTHY_THRESHOLD) {
        Some(AlertLevel::Unhealthy)
    } else if crossed_up(HAZARDOUS_THRESHOLD) {
        Some(AlertLevel::Hazardous)
    } else if previous >= UNHEALTHY_THRESHOLD && current < UNHEALTHY_THRESHOLD {
        Some(AlertLevel::Good)
    } else {
        None
    }
}

/// US-EPA 2016 AQI band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiBand {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiBand {
    pub fn from_index(index: i64) -> Self {
        match index {
            i64::MIN..=50 => AqiBand::Good,
            51..=100 => AqiBand::Moderate,
            101..=150 => AqiBand::UnhealthyForSensitiveGroups,
            151..=200 => AqiBand::Unhealthy,
            201..=300 => AqiBand::VeryUnhealthy,
            _ => AqiBand::Hazardous,
        }
    }
}

impl std::fmt::Display for AqiBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AqiBand::Good => "good",
            AqiBand::Moderate => "moderate",
            AqiBand::UnhealthyForSensitiveGroups => "unhealthy for sensitive groups",
            AqiBand::Unhealthy => "unhealthy",
            AqiBand::VeryUnhealthy => "very unhealthy",
            AqiBand::Hazardous => "hazardous",
        };
        write!(f, "{}", name)
    }
}
