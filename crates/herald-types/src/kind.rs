use serde::{Deserialize, Serialize};

/// Reminder kinds, ordered from coarsest lead time to finest.
///
/// The order matters: when a finer reminder fires, notifications delivered
/// for strictly coarser kinds of the same subject are superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    TwentyFourHours,
    TwoHours,
    OneHour,
    Starting,
}

impl ReminderKind {
    /// All kinds, coarsest first.
    pub const ALL: [ReminderKind; 4] = [
        ReminderKind::TwentyFourHours,
        ReminderKind::TwoHours,
        ReminderKind::OneHour,
        ReminderKind::Starting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::TwentyFourHours => "24h",
            ReminderKind::TwoHours => "2h",
            ReminderKind::OneHour => "1h",
            ReminderKind::Starting => "starting",
        }
    }

    /// Lead time before the subject's trigger instant at which this
    /// reminder fires. Zero for `Starting`.
    pub fn offset(&self) -> chrono::Duration {
        match self {
            ReminderKind::TwentyFourHours => chrono::Duration::hours(24),
            ReminderKind::TwoHours => chrono::Duration::hours(2),
            ReminderKind::OneHour => chrono::Duration::hours(1),
            ReminderKind::Starting => chrono::Duration::zero(),
        }
    }

    /// Position in the coarsest-to-finest order.
    pub fn rank(&self) -> u8 {
        match self {
            ReminderKind::TwentyFourHours => 0,
            ReminderKind::TwoHours => 1,
            ReminderKind::OneHour => 2,
            ReminderKind::Starting => 3,
        }
    }

    /// Kinds strictly coarser than this one, coarsest first.
    pub fn coarser(&self) -> &'static [ReminderKind] {
        match self {
            ReminderKind::TwentyFourHours => &[],
            ReminderKind::TwoHours => &[ReminderKind::TwentyFourHours],
            ReminderKind::OneHour => &[ReminderKind::TwentyFourHours, ReminderKind::TwoHours],
            ReminderKind::Starting => &[
                ReminderKind::TwentyFourHours,
                ReminderKind::TwoHours,
                ReminderKind::OneHour,
            ],
        }
    }
}

impl PartialOrd for ReminderKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReminderKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReminderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "24h" => Ok(ReminderKind::TwentyFourHours),
            "2h" => Ok(ReminderKind::TwoHours),
            "1h" => Ok(ReminderKind::OneHour),
            "starting" | "now" => Ok(ReminderKind::Starting),
            _ => Err(()),
        }
    }
}
