pub struct Icons;

impl Icons {
    pub const BALL: &str = "⚾";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const PACKAGE: &str = "📦";
    pub const CLOCK: &str = "⏱️";
    pub const CALENDAR: &str = "📅";
}
