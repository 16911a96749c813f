pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const INFO: &str = "ℹ️";
    pub const DEBTOR: &str = "🏦";
    pub const COMPANY: &str = "🏢";
    pub const PERSON: &str = "👤";
    pub const TAG: &str = "🏷️";
    pub const CLOCK: &str = "⏱️";
    pub const PLUG: &str = "🔌";
}
